//! Error types for the scorecast pipeline
//!
//! Every failure is an explicit [`ScorecastError`] value. Wrap points add a
//! [`ScorecastError::Context`] frame carrying the operation name and the caller
//! location, so the final error reads as a chain from the outermost operation
//! down to the root cause.

use std::fmt;
use std::panic::Location;
use thiserror::Error;

/// Result type alias for scorecast operations
pub type Result<T> = std::result::Result<T, ScorecastError>;

/// Coarse classification of a failure, independent of its context chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Ingestion,
    Transformation,
    Training,
    NoAcceptableModel,
    Serialization,
    Prediction,
    RequestValidation,
    Config,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Ingestion => "ingestion",
            ErrorKind::Transformation => "transformation",
            ErrorKind::Training => "training",
            ErrorKind::NoAcceptableModel => "no acceptable model",
            ErrorKind::Serialization => "serialization",
            ErrorKind::Prediction => "prediction",
            ErrorKind::RequestValidation => "request validation",
            ErrorKind::Config => "configuration",
            ErrorKind::Io => "io",
        };
        f.write_str(name)
    }
}

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum ScorecastError {
    #[error("Ingestion error: {0}")]
    IngestionError(String),

    #[error("Transformation error: {0}")]
    TransformationError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("No acceptable model: best R² {best_score:.4} is below the acceptance threshold {threshold}")]
    NoAcceptableModel { best_score: f64, threshold: f64 },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Prediction error: {0}")]
    PredictionError(String),

    #[error("Invalid request: {0}")]
    RequestValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("{operation} [{location}]: {cause}")]
    Context {
        operation: String,
        location: String,
        cause: Box<ScorecastError>,
    },
}

impl ScorecastError {
    /// Wrap this error in a context frame recording `operation` and the caller location
    #[track_caller]
    pub fn context(self, operation: impl Into<String>) -> Self {
        let caller = Location::caller();
        ScorecastError::Context {
            operation: operation.into(),
            location: format!("{}:{}", caller.file(), caller.line()),
            cause: Box::new(self),
        }
    }

    /// Kind of the innermost (root) error
    pub fn kind(&self) -> ErrorKind {
        match self.root_cause() {
            ScorecastError::IngestionError(_) => ErrorKind::Ingestion,
            ScorecastError::TransformationError(_) => ErrorKind::Transformation,
            ScorecastError::TrainingError(_) => ErrorKind::Training,
            ScorecastError::NoAcceptableModel { .. } => ErrorKind::NoAcceptableModel,
            ScorecastError::SerializationError(_) => ErrorKind::Serialization,
            ScorecastError::PredictionError(_) => ErrorKind::Prediction,
            ScorecastError::RequestValidationError(_) => ErrorKind::RequestValidation,
            ScorecastError::ConfigError(_) => ErrorKind::Config,
            ScorecastError::IoError(_) => ErrorKind::Io,
            ScorecastError::Context { .. } => unreachable!("root cause is never a context frame"),
        }
    }

    /// Innermost error of the chain
    pub fn root_cause(&self) -> &ScorecastError {
        let mut current = self;
        while let ScorecastError::Context { cause, .. } = current {
            current = cause;
        }
        current
    }

    /// Operation names from the outermost frame inwards
    pub fn operations(&self) -> Vec<&str> {
        let mut ops = Vec::new();
        let mut current = self;
        while let ScorecastError::Context { operation, cause, .. } = current {
            ops.push(operation.as_str());
            current = cause;
        }
        ops
    }
}

impl From<bincode::Error> for ScorecastError {
    fn from(err: bincode::Error) -> Self {
        ScorecastError::SerializationError(err.to_string())
    }
}

/// Attach an operation frame to any fallible result
pub trait ErrorContext<T> {
    fn context(self, operation: impl Into<String>) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<ScorecastError>,
{
    #[track_caller]
    fn context(self, operation: impl Into<String>) -> Result<T> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(err.into().context(operation)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ScorecastError::IngestionError("missing column".to_string());
        assert_eq!(err.to_string(), "Ingestion error: missing column");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ScorecastError = io_err.into();
        assert!(matches!(err, ScorecastError::IoError(_)));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_context_chain_keeps_root_kind() {
        let result: Result<()> = Err(ScorecastError::TrainingError("singular".to_string()));
        let err = result
            .context("fit candidate")
            .context("train")
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Training);
        assert_eq!(err.operations(), vec!["train", "fit candidate"]);
        let rendered = err.to_string();
        assert!(rendered.starts_with("train ["));
        assert!(rendered.contains("error.rs"));
        assert!(rendered.ends_with("Training error: singular"));
    }

    #[test]
    fn test_no_acceptable_model_message() {
        let err = ScorecastError::NoAcceptableModel { best_score: 0.4213, threshold: 0.6 };
        assert_eq!(err.kind(), ErrorKind::NoAcceptableModel);
        assert!(err.to_string().contains("0.4213"));
    }
}
