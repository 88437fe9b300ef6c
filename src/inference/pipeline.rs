//! Prediction pipeline with a shared artifact cache

use crate::artifact;
use crate::config::ArtifactConfig;
use crate::error::{ErrorContext, Result, ScorecastError};
use crate::logging::PipelineLogger;
use crate::preprocessing::FeatureTransformer;
use crate::schema::StudentFeatures;
use crate::training::ModelArtifact;
use ndarray::Array2;
use parking_lot::RwLock;
use polars::prelude::DataFrame;
use std::sync::Arc;
use tracing::{debug, info};

/// A loaded transformer and model pair
#[derive(Debug)]
pub struct Predictor {
    transformer: FeatureTransformer,
    model: ModelArtifact,
}

impl Predictor {
    /// Pair a transformer with a model, checking that their widths agree
    pub fn new(transformer: FeatureTransformer, model: ModelArtifact) -> Result<Self> {
        if transformer.n_features() != model.n_features {
            return Err(ScorecastError::PredictionError(format!(
                "transformer produces {} features but model '{}' expects {}",
                transformer.n_features(),
                model.name,
                model.n_features
            )));
        }
        Ok(Self { transformer, model })
    }

    fn load(artifacts: &ArtifactConfig) -> Result<Self> {
        let transformer_path = artifacts.transformer_path();
        let model_path = artifacts.model_path();
        let transformer: FeatureTransformer = artifact::load(&transformer_path)
            .map_err(|e| unavailable("transformer", &e))?;
        let model: ModelArtifact =
            artifact::load(&model_path).map_err(|e| unavailable("model", &e))?;
        info!(
            model = %model.name,
            transformer = %transformer_path.display(),
            path = %model_path.display(),
            "Loaded prediction artifacts"
        );
        Self::new(transformer, model)
    }

    pub fn model(&self) -> &ModelArtifact {
        &self.model
    }

    pub fn transformer(&self) -> &FeatureTransformer {
        &self.transformer
    }

    fn score(&self, features: &Array2<f64>) -> Result<Vec<f64>> {
        let predictions = self
            .model
            .predict(features)
            .map_err(|e| ScorecastError::PredictionError(e.to_string()))?;
        Ok(predictions.to_vec())
    }

    pub fn predict(&self, rows: &[StudentFeatures]) -> Result<Vec<f64>> {
        self.score(&self.transformer.transform(rows))
    }

    pub fn predict_frame(&self, df: &DataFrame) -> Result<Vec<f64>> {
        let features = self
            .transformer
            .transform_frame(df)
            .map_err(|e| ScorecastError::PredictionError(e.to_string()))?;
        self.score(&features)
    }
}

fn unavailable(what: &str, err: &ScorecastError) -> ScorecastError {
    ScorecastError::PredictionError(format!("{} artifact unavailable: {}", what, err))
}

/// Scores feature rows with the persisted transformer and best model
///
/// Artifacts are loaded on first use and shared by every caller until
/// [`PredictPipeline::reload`] drops them.
#[derive(Debug)]
pub struct PredictPipeline {
    artifacts: ArtifactConfig,
    logger: PipelineLogger,
    cache: RwLock<Option<Arc<Predictor>>>,
}

impl PredictPipeline {
    pub fn new(artifacts: ArtifactConfig, logger: PipelineLogger) -> Self {
        Self {
            artifacts,
            logger,
            cache: RwLock::new(None),
        }
    }

    /// A pipeline serving an already loaded predictor
    pub fn from_predictor(artifacts: ArtifactConfig, predictor: Predictor) -> Self {
        Self {
            artifacts,
            logger: PipelineLogger::disabled(),
            cache: RwLock::new(Some(Arc::new(predictor))),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.cache.read().is_some()
    }

    /// Cached predictor, loading it on first use
    pub fn predictor(&self) -> Result<Arc<Predictor>> {
        if let Some(predictor) = self.cache.read().as_ref() {
            return Ok(Arc::clone(predictor));
        }

        let mut slot = self.cache.write();
        // another caller may have loaded it while we waited for the write lock
        if let Some(predictor) = slot.as_ref() {
            return Ok(Arc::clone(predictor));
        }
        let predictor = Arc::new(self.logger.in_scope(|| Predictor::load(&self.artifacts))?);
        *slot = Some(Arc::clone(&predictor));
        Ok(predictor)
    }

    /// Drop the cached artifacts; the next prediction reloads them
    pub fn reload(&self) {
        *self.cache.write() = None;
        self.logger.in_scope(|| debug!("Prediction artifact cache cleared"));
    }

    /// One prediction per input row
    pub fn predict(&self, rows: &[StudentFeatures]) -> Result<Vec<f64>> {
        self.predictor()
            .and_then(|p| p.predict(rows))
            .context("predict")
    }

    /// One prediction per row of a frame holding the feature columns
    pub fn predict_frame(&self, df: &DataFrame) -> Result<Vec<f64>> {
        self.predictor()
            .and_then(|p| p.predict_frame(df))
            .context("predict")
    }
}
