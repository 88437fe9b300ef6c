//! Application state management

use crate::config::ArtifactConfig;
use crate::inference::PredictPipeline;
use crate::logging::PipelineLogger;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Debug, Clone)]
pub struct AppState {
    pub pipeline: Arc<PredictPipeline>,
    pub logger: PipelineLogger,
}

impl AppState {
    /// State whose pipeline loads artifacts lazily from `artifacts`
    pub fn new(artifacts: ArtifactConfig, logger: PipelineLogger) -> Self {
        Self {
            pipeline: Arc::new(PredictPipeline::new(artifacts, logger.clone())),
            logger,
        }
    }

    pub fn with_pipeline(pipeline: PredictPipeline, logger: PipelineLogger) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            logger,
        }
    }
}
