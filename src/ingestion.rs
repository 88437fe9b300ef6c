//! Data ingestion: raw dataset to persisted train/test partitions

use crate::config::{ArtifactConfig, IngestionConfig};
use crate::error::{ErrorContext, Result, ScorecastError};
use crate::logging::PipelineLogger;
use crate::schema;
use crate::utils::{DataLoader, DataSaver};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};
use tracing::info;

/// Paths and sizes of the persisted partitions
#[derive(Debug, Clone, PartialEq)]
pub struct IngestionArtifacts {
    pub raw_data_path: PathBuf,
    pub train_path: PathBuf,
    pub test_path: PathBuf,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Row indices of a train/test split
#[derive(Debug, Clone, PartialEq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n_rows` under `seed` and cut off `ceil(test_ratio * n_rows)` test rows
pub fn split_indices(n_rows: usize, test_ratio: f64, seed: u64) -> Result<SplitIndices> {
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(ScorecastError::IngestionError(format!(
            "test ratio must be in (0, 1), got {}",
            test_ratio
        )));
    }
    let n_test = (test_ratio * n_rows as f64).ceil() as usize;
    if n_test == 0 || n_test >= n_rows {
        return Err(ScorecastError::IngestionError(format!(
            "cannot split {} rows with test ratio {}: one partition would be empty",
            n_rows, test_ratio
        )));
    }

    let mut indices: Vec<usize> = (0..n_rows).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_test);
    Ok(SplitIndices {
        train,
        test: indices,
    })
}

fn take_rows(df: &DataFrame, rows: &[usize]) -> PolarsResult<DataFrame> {
    let idx = IdxCa::from_vec(
        "idx".into(),
        rows.iter().map(|&i| i as IdxSize).collect(),
    );
    df.take(&idx)
}

/// Loads the raw dataset, keeps a copy and persists a reproducible split
#[derive(Debug, Clone)]
pub struct DataIngestion {
    artifacts: ArtifactConfig,
    config: IngestionConfig,
    logger: PipelineLogger,
}

impl DataIngestion {
    pub fn new(artifacts: ArtifactConfig, config: IngestionConfig, logger: PipelineLogger) -> Self {
        Self {
            artifacts,
            config,
            logger,
        }
    }

    /// Ingest the configured source dataset
    pub fn ingest(&self) -> Result<IngestionArtifacts> {
        let source = self.config.source_path.clone();
        self.ingest_from(&source)
    }

    /// Ingest an explicit source dataset
    pub fn ingest_from(&self, source: &Path) -> Result<IngestionArtifacts> {
        self.logger
            .in_scope(|| self.run(source))
            .context("data ingestion")
    }

    fn run(&self, source: &Path) -> Result<IngestionArtifacts> {
        info!("Entered the data ingestion method");

        let mut df = DataLoader::new()
            .with_float_columns(&schema::SCORE_COLUMNS)
            .load_csv(source)
            .map_err(|e| {
                ScorecastError::IngestionError(format!("cannot read {}: {}", source.display(), e))
            })?;
        Self::check_schema(&df)?;
        info!(rows = df.height(), source = %source.display(), "Read the dataset as dataframe");

        let raw_data_path = self.artifacts.raw_data_path();
        DataSaver::save_csv(&mut df, &raw_data_path).map_err(|e| {
            ScorecastError::IngestionError(format!(
                "cannot write raw copy {}: {}",
                raw_data_path.display(),
                e
            ))
        })?;
        info!(path = %raw_data_path.display(), "Saved raw data copy");

        info!("Train test split initiated");
        let split = split_indices(df.height(), self.config.test_ratio, self.config.random_seed)?;
        let mut train = take_rows(&df, &split.train)
            .map_err(|e| ScorecastError::IngestionError(e.to_string()))?;
        let mut test = take_rows(&df, &split.test)
            .map_err(|e| ScorecastError::IngestionError(e.to_string()))?;

        let train_path = self.artifacts.train_path();
        let test_path = self.artifacts.test_path();
        for (frame, path) in [(&mut train, &train_path), (&mut test, &test_path)] {
            DataSaver::save_csv(frame, path).map_err(|e| {
                ScorecastError::IngestionError(format!("cannot write {}: {}", path.display(), e))
            })?;
        }

        info!(
            train_rows = split.train.len(),
            test_rows = split.test.len(),
            "Ingestion of the data is completed"
        );

        Ok(IngestionArtifacts {
            raw_data_path,
            train_path,
            test_path,
            train_rows: split.train.len(),
            test_rows: split.test.len(),
        })
    }

    /// Every schema column present, numeric columns readable and the target complete
    fn check_schema(df: &DataFrame) -> Result<()> {
        let invalid = |e: schema::SchemaError| ScorecastError::IngestionError(e.to_string());

        schema::validate_columns(df, true).map_err(invalid)?;
        for column in schema::NUMERIC_COLUMNS {
            schema::numeric_values(df, column).map_err(invalid)?;
        }
        let targets = schema::numeric_values(df, schema::TARGET_COLUMN).map_err(invalid)?;
        if let Some(row) = targets.iter().position(Option::is_none) {
            return Err(ScorecastError::IngestionError(format!(
                "target column '{}' is missing a value in row {}",
                schema::TARGET_COLUMN,
                row
            )));
        }
        Ok(())
    }
}
