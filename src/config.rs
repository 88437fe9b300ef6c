//! Pipeline configuration
//!
//! All paths and constants used by ingestion, training, inference and serving
//! live here. Values come from [`Default`], optionally overridden by a JSON
//! file and then by environment variables.

use crate::error::{ErrorContext, Result, ScorecastError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Locations of the persisted artifacts, relative to a common root
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Directory holding every artifact of a training run
    pub root: PathBuf,
    /// Unmodified copy of the ingested dataset
    pub raw_data_file: String,
    /// Train partition
    pub train_file: String,
    /// Test partition
    pub test_file: String,
    /// Fitted feature transformer
    pub transformer_file: String,
    /// Best model
    pub model_file: String,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("artifacts"),
            raw_data_file: "data.csv".to_string(),
            train_file: "train.csv".to_string(),
            test_file: "test.csv".to_string(),
            transformer_file: "preprocessor.bin".to_string(),
            model_file: "model.bin".to_string(),
        }
    }
}

impl ArtifactConfig {
    /// Artifacts rooted at `root` with the default file names
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    pub fn raw_data_path(&self) -> PathBuf {
        self.root.join(&self.raw_data_file)
    }

    pub fn train_path(&self) -> PathBuf {
        self.root.join(&self.train_file)
    }

    pub fn test_path(&self) -> PathBuf {
        self.root.join(&self.test_file)
    }

    pub fn transformer_path(&self) -> PathBuf {
        self.root.join(&self.transformer_file)
    }

    pub fn model_path(&self) -> PathBuf {
        self.root.join(&self.model_file)
    }
}

/// Configuration for data ingestion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IngestionConfig {
    /// Raw CSV dataset to ingest
    pub source_path: PathBuf,
    /// Fraction of rows assigned to the test partition
    pub test_ratio: f64,
    /// Seed of the split shuffle
    pub random_seed: u64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from("notebook/data/stud.csv"),
            test_ratio: 0.2,
            random_seed: 42,
        }
    }
}

/// Configuration for the model trainer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrainerConfig {
    /// Folds used by the cross-validated grid search
    pub cv_folds: usize,
    /// Minimum held-out R² a model needs to be persisted
    pub acceptance_threshold: f64,
    /// Seed of every stochastic estimator
    pub random_seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            cv_folds: 3,
            acceptance_threshold: 0.6,
            random_seed: 42,
        }
    }
}

impl TrainerConfig {
    pub fn with_acceptance_threshold(mut self, threshold: f64) -> Self {
        self.acceptance_threshold = threshold;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }
}

/// Configuration for the process logger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory receiving one log file per process start
    pub log_dir: PathBuf,
    /// Write the append-only log file
    pub file_logging: bool,
    /// Filter directive for the stderr layer, overridden by `RUST_LOG`
    pub stderr_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            file_logging: true,
            stderr_filter: "scorecast=info".to_string(),
        }
    }
}

/// HTTP façade configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

/// Top-level configuration shared by every command
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub artifacts: ArtifactConfig,
    pub ingestion: IngestionConfig,
    pub training: TrainerConfig,
    pub logging: LoggingConfig,
    pub server: ServerConfig,
}

impl PipelineConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file; missing fields keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .context(format!("read config {}", path.display()))?;
        serde_json::from_str(&json)
            .map_err(|e| ScorecastError::ConfigError(format!("{}: {}", path.display(), e)))
    }

    /// Apply `SCORECAST_*`, `API_HOST` and `API_PORT` environment overrides
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var("SCORECAST_ARTIFACT_DIR") {
            self.artifacts.root = PathBuf::from(dir);
        }
        if let Ok(path) = std::env::var("SCORECAST_DATA_PATH") {
            self.ingestion.source_path = PathBuf::from(path);
        }
        if let Ok(dir) = std::env::var("SCORECAST_LOG_DIR") {
            self.logging.log_dir = PathBuf::from(dir);
        }
        if let Ok(host) = std::env::var("API_HOST") {
            self.server.host = host;
        }
        if let Some(port) = std::env::var("API_PORT").ok().and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        self
    }

    /// Builder method to set the artifact root
    pub fn with_artifact_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.artifacts.root = root.into();
        self
    }

    /// Builder method to set the raw dataset path
    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.ingestion.source_path = path.into();
        self
    }

    /// Builder method to set the logs directory
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.logging.log_dir = dir.into();
        self
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let ratio = self.ingestion.test_ratio;
        if !(ratio > 0.0 && ratio < 1.0) {
            return Err(ScorecastError::ConfigError(format!(
                "test_ratio must be in (0, 1), got {}",
                ratio
            )));
        }
        if self.training.cv_folds < 2 {
            return Err(ScorecastError::ConfigError(format!(
                "cv_folds must be at least 2, got {}",
                self.training.cv_folds
            )));
        }
        if !self.training.acceptance_threshold.is_finite() {
            return Err(ScorecastError::ConfigError(
                "acceptance_threshold must be finite".to_string(),
            ));
        }
        Ok(())
    }
}
