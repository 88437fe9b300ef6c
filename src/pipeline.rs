//! End-to-end training pipeline: ingest, transform, train

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::ingestion::{DataIngestion, IngestionArtifacts};
use crate::logging::PipelineLogger;
use crate::training::{CandidateSpec, EvaluationReport, ModelTrainer};
use crate::transformation::DataTransformation;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// What a successful training run produced
#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub ingestion: IngestionArtifacts,
    pub transformer_path: PathBuf,
    pub model_path: PathBuf,
    pub best_model: String,
    pub best_score: f64,
    pub report: EvaluationReport,
    pub elapsed_secs: f64,
}

/// Runs the three training stages in order; any failure aborts the run
#[derive(Debug, Clone)]
pub struct TrainingPipeline {
    config: PipelineConfig,
    logger: PipelineLogger,
    catalog: Option<Vec<CandidateSpec>>,
}

impl TrainingPipeline {
    pub fn new(config: PipelineConfig, logger: PipelineLogger) -> Self {
        Self {
            config,
            logger,
            catalog: None,
        }
    }

    /// Train a custom candidate list instead of the default catalog
    pub fn with_catalog(mut self, catalog: Vec<CandidateSpec>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self) -> Result<TrainingSummary> {
        self.config.validate()?;
        let start = Instant::now();

        let ingestion = DataIngestion::new(
            self.config.artifacts.clone(),
            self.config.ingestion.clone(),
            self.logger.clone(),
        )
        .ingest()?;

        let transformed = DataTransformation::new(self.config.artifacts.clone(), self.logger.clone())
            .transform_fit(&ingestion.train_path, &ingestion.test_path)?;

        let mut trainer = ModelTrainer::new(
            self.config.artifacts.clone(),
            self.config.training.clone(),
            self.logger.clone(),
        );
        if let Some(catalog) = &self.catalog {
            trainer = trainer.with_catalog(catalog.clone());
        }
        let outcome = trainer.train_with_report(&transformed.train, &transformed.test)?;

        let elapsed_secs = start.elapsed().as_secs_f64();
        self.logger.in_scope(|| {
            info!(
                model = %outcome.best_name,
                r2 = outcome.best_score,
                elapsed_secs,
                "Training pipeline completed"
            )
        });

        Ok(TrainingSummary {
            ingestion,
            transformer_path: transformed.transformer_path,
            model_path: outcome.model_path,
            best_model: outcome.best_name,
            best_score: outcome.best_score,
            report: outcome.report,
            elapsed_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_invalid_config_fails_before_ingestion() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PipelineConfig::new().with_artifact_root(dir.path().join("artifacts"));
        config.training.cv_folds = 1;
        let err = TrainingPipeline::new(config, PipelineLogger::disabled()).run().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(!dir.path().join("artifacts").exists());
    }

    #[test]
    fn test_missing_source_is_ingestion_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::new()
            .with_artifact_root(dir.path().join("artifacts"))
            .with_source(dir.path().join("absent.csv"));
        let err = TrainingPipeline::new(config, PipelineLogger::disabled()).run().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Ingestion);
    }
}
