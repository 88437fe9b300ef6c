//! Model trainer: candidate selection over the catalog and persistence of the winner

use super::catalog::{default_catalog, Algorithm, CandidateSpec};
use super::cross_validation::KFold;
use super::evaluation::{evaluate_candidate, EvaluationData, EvaluationEntry, EvaluationReport};
use super::models::{Regressor, TrainedModel};
use super::search::ParamSet;
use crate::artifact::{self, Artifact};
use crate::config::{ArtifactConfig, TrainerConfig};
use crate::error::{ErrorContext, Result, ScorecastError};
use crate::logging::PipelineLogger;
use chrono::Utc;
use ndarray::{s, Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// The persisted best model with its provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Catalog name of the winning candidate
    pub name: String,
    pub algorithm: Algorithm,
    pub params: ParamSet,
    pub model: TrainedModel,
    /// Held-out R² that won the selection
    pub test_r2: f64,
    /// Width of the feature rows the model expects
    pub n_features: usize,
    /// RFC 3339 timestamp of the training run
    pub trained_at: String,
}

impl Artifact for ModelArtifact {
    const KIND: &'static str = "best-model";
}

impl ModelArtifact {
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.model.predict(x)
    }
}

/// Result of a successful training run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub best_name: String,
    pub best_score: f64,
    pub report: EvaluationReport,
    pub model_path: PathBuf,
}

/// Split a matrix whose last column is the target
pub fn split_features_target(matrix: &Array2<f64>) -> Result<(Array2<f64>, Array1<f64>)> {
    let n_cols = matrix.ncols();
    if n_cols < 2 {
        return Err(ScorecastError::TrainingError(format!(
            "matrix needs at least one feature column and a target column, got {} columns",
            n_cols
        )));
    }
    Ok((
        matrix.slice(s![.., ..n_cols - 1]).to_owned(),
        matrix.column(n_cols - 1).to_owned(),
    ))
}

/// Selects the best catalog candidate by held-out R² and persists it
#[derive(Debug, Clone)]
pub struct ModelTrainer {
    artifacts: ArtifactConfig,
    config: TrainerConfig,
    catalog: Vec<CandidateSpec>,
    logger: PipelineLogger,
}

impl ModelTrainer {
    pub fn new(artifacts: ArtifactConfig, config: TrainerConfig, logger: PipelineLogger) -> Self {
        Self {
            artifacts,
            config,
            catalog: default_catalog(),
            logger,
        }
    }

    /// Replace the candidate catalog
    pub fn with_catalog(mut self, catalog: Vec<CandidateSpec>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn catalog(&self) -> &[CandidateSpec] {
        &self.catalog
    }

    /// Train every candidate, persist the winner and return its held-out R²
    pub fn train(&self, train: &Array2<f64>, test: &Array2<f64>) -> Result<f64> {
        self.train_with_report(train, test).map(|outcome| outcome.best_score)
    }

    /// Like [`ModelTrainer::train`], also returning the evaluation report
    pub fn train_with_report(&self, train: &Array2<f64>, test: &Array2<f64>) -> Result<TrainingOutcome> {
        self.logger
            .in_scope(|| self.run(train, test))
            .context("model training")
    }

    fn run(&self, train: &Array2<f64>, test: &Array2<f64>) -> Result<TrainingOutcome> {
        if train.ncols() != test.ncols() {
            return Err(ScorecastError::TrainingError(format!(
                "train matrix has {} columns but test matrix has {}",
                train.ncols(),
                test.ncols()
            )));
        }
        if self.catalog.is_empty() {
            return Err(ScorecastError::TrainingError("candidate catalog is empty".to_string()));
        }

        info!("Split training and test input data");
        let (x_train, y_train) = split_features_target(train)?;
        let (x_test, y_test) = split_features_target(test)?;
        let data = EvaluationData {
            x_train: &x_train,
            y_train: &y_train,
            x_test: &x_test,
            y_test: &y_test,
            folds: KFold::new(self.config.cv_folds),
            seed: self.config.random_seed,
        };

        let mut report = EvaluationReport::default();
        let mut best: Option<(EvaluationEntry, Algorithm, TrainedModel)> = None;
        for spec in &self.catalog {
            let (entry, model) = evaluate_candidate(spec, &data)?;
            info!(
                model = %entry.name,
                params = %entry.params,
                cv_r2 = entry.cv_score,
                train_r2 = entry.train_r2,
                test_r2 = entry.test_r2,
                "Evaluated candidate"
            );

            let improves = best
                .as_ref()
                .map_or(!entry.test_r2.is_nan(), |(b, _, _)| entry.test_r2 > b.test_r2);
            report.entries.push(entry.clone());
            if improves {
                best = Some((entry, spec.algorithm, model));
            }
        }

        let threshold = self.config.acceptance_threshold;
        let (entry, algorithm, model) = match best {
            Some(found) if found.0.test_r2 >= threshold => found,
            found => {
                return Err(ScorecastError::NoAcceptableModel {
                    best_score: found.map_or(f64::NAN, |(e, _, _)| e.test_r2),
                    threshold,
                })
            }
        };
        info!(model = %entry.name, test_r2 = entry.test_r2, "Best found model on both training and testing dataset");

        let model_path = self.artifacts.model_path();
        let artifact = ModelArtifact {
            name: entry.name.clone(),
            algorithm,
            params: entry.params.clone(),
            model,
            test_r2: entry.test_r2,
            n_features: x_train.ncols(),
            trained_at: Utc::now().to_rfc3339(),
        };
        artifact::save(&model_path, &artifact).context("save best model")?;
        info!(path = %model_path.display(), "Saved best model");

        Ok(TrainingOutcome {
            best_name: entry.name,
            best_score: entry.test_r2,
            report,
            model_path,
        })
    }
}
