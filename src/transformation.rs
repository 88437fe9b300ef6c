//! Data transformation: train/test partitions to numeric matrices

use crate::artifact;
use crate::config::ArtifactConfig;
use crate::error::{ErrorContext, Result, ScorecastError};
use crate::logging::PipelineLogger;
use crate::preprocessing::FeatureTransformer;
use crate::schema::{self, StudentRecord};
use crate::utils::DataLoader;
use ndarray::{s, Array2};
use std::path::{Path, PathBuf};
use tracing::info;

/// Matrices produced by [`DataTransformation::transform_fit`]
///
/// Columns `0..k` hold the transformed features, column `k` the target.
#[derive(Debug, Clone)]
pub struct TransformationOutput {
    pub train: Array2<f64>,
    pub test: Array2<f64>,
    pub transformer_path: PathBuf,
}

/// Fits the feature transformer on the train partition and applies it to both partitions
#[derive(Debug, Clone)]
pub struct DataTransformation {
    artifacts: ArtifactConfig,
    logger: PipelineLogger,
}

impl DataTransformation {
    pub fn new(artifacts: ArtifactConfig, logger: PipelineLogger) -> Self {
        Self { artifacts, logger }
    }

    /// Fit on `train_path`, transform both partitions and persist the transformer
    pub fn transform_fit(&self, train_path: &Path, test_path: &Path) -> Result<TransformationOutput> {
        self.logger
            .in_scope(|| self.run(train_path, test_path))
            .context("data transformation")
    }

    fn run(&self, train_path: &Path, test_path: &Path) -> Result<TransformationOutput> {
        let train_records = read_records(train_path)?;
        let test_records = read_records(test_path)?;
        info!(
            train_rows = train_records.len(),
            test_rows = test_records.len(),
            "Read train and test data completed"
        );

        let train_features: Vec<_> = train_records.iter().map(|r| r.features.clone()).collect();
        let transformer = FeatureTransformer::fit(&train_features)?;
        info!(
            n_features = transformer.n_features(),
            "Applying preprocessing object on training and testing dataframes"
        );

        let train = with_target(&transformer, &train_records, train_path)?;
        let test = with_target(&transformer, &test_records, test_path)?;

        let transformer_path = self.artifacts.transformer_path();
        artifact::save(&transformer_path, &transformer).context("save feature transformer")?;
        info!(path = %transformer_path.display(), "Saved preprocessing object");

        Ok(TransformationOutput {
            train,
            test,
            transformer_path,
        })
    }
}

fn read_records(path: &Path) -> Result<Vec<StudentRecord>> {
    let df = DataLoader::new()
        .with_float_columns(&schema::SCORE_COLUMNS)
        .load_csv(path)
        .map_err(|e| {
            ScorecastError::TransformationError(format!("cannot read {}: {}", path.display(), e))
        })?;
    schema::records_from_frame(&df).map_err(|e| {
        ScorecastError::TransformationError(format!("{}: {}", path.display(), e))
    })
}

/// Transformed features with the target appended as the last column
fn with_target(
    transformer: &FeatureTransformer,
    records: &[StudentRecord],
    source: &Path,
) -> Result<Array2<f64>> {
    let features: Vec<_> = records.iter().map(|r| r.features.clone()).collect();
    let encoded = transformer.transform(&features);
    let k = encoded.ncols();

    let mut matrix = Array2::zeros((records.len(), k + 1));
    matrix.slice_mut(s![.., ..k]).assign(&encoded);
    for (i, record) in records.iter().enumerate() {
        matrix[[i, k]] = record.math_score.ok_or_else(|| {
            ScorecastError::TransformationError(format!(
                "{}: row {} has no {}",
                source.display(),
                i,
                schema::TARGET_COLUMN
            ))
        })?;
    }
    Ok(matrix)
}
