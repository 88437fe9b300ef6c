//! scorecast - student math score regression pipeline
//!
//! Trains several regression algorithms on a fixed student-performance schema,
//! selects the best by held-out R², persists it and serves predictions.
//!
//! # Modules
//!
//! ## Pipeline stages
//! - [`ingestion`] - Raw dataset to reproducible train/test partitions
//! - [`transformation`] - Feature transformer fitting and feature matrices
//! - [`training`] - Regression algorithms, grid search and model selection
//! - [`inference`] - Cached prediction pipeline and request validation
//! - [`pipeline`] - End-to-end training run
//!
//! ## Foundations
//! - [`schema`] - Column names and typed records
//! - [`preprocessing`] - Imputation, scaling and one-hot encoding
//! - [`artifact`] - Checksummed artifact persistence
//! - [`config`], [`logging`], [`error`]
//!
//! ## Services
//! - [`server`] - HTTP prediction API
//! - [`cli`] - Command-line interface

pub mod error;
pub mod config;
pub mod logging;

pub mod schema;
pub mod artifact;
pub mod preprocessing;
pub mod utils;

pub mod ingestion;
pub mod transformation;
pub mod training;
pub mod inference;
pub mod pipeline;

pub mod server;
pub mod cli;

pub use error::{ErrorKind, Result, ScorecastError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::artifact::{self, Artifact};
    pub use crate::config::{ArtifactConfig, IngestionConfig, PipelineConfig, TrainerConfig};
    pub use crate::error::{ErrorContext, ErrorKind, Result, ScorecastError};
    pub use crate::inference::{PredictPipeline, Predictor, RequestRecord};
    pub use crate::ingestion::DataIngestion;
    pub use crate::logging::PipelineLogger;
    pub use crate::pipeline::{TrainingPipeline, TrainingSummary};
    pub use crate::preprocessing::FeatureTransformer;
    pub use crate::schema::{StudentFeatures, StudentRecord};
    pub use crate::training::{ModelArtifact, ModelTrainer, Regressor, TrainedModel};
    pub use crate::transformation::DataTransformation;
}
