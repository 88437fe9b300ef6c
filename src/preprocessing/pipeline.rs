//! Fitted feature transformer for the student schema

use super::encoder::OneHotEncoder;
use super::imputer::median;
use super::scaler::StandardScaler;
use crate::artifact::Artifact;
use crate::error::{Result, ScorecastError};
use crate::schema::{self, StudentFeatures};
use ndarray::Array2;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

/// Median imputation followed by standard scaling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericColumn {
    pub column: String,
    pub median: f64,
    pub scaler: StandardScaler,
}

impl NumericColumn {
    fn fit(column: &str, values: &[Option<f64>]) -> Result<Self> {
        let median = median(values).ok_or_else(|| {
            ScorecastError::TransformationError(format!("column '{}' has no values", column))
        })?;
        let imputed: Vec<f64> = values.iter().map(|v| v.unwrap_or(median)).collect();
        Ok(Self {
            column: column.to_string(),
            median,
            scaler: StandardScaler::fit(&imputed, true),
        })
    }

    #[inline]
    fn encode(&self, value: Option<f64>) -> f64 {
        self.scaler.apply(value.unwrap_or(self.median))
    }
}

/// Transformer fit once on the train partition and reused for test and inference rows
///
/// Output layout: scaled numeric columns in schema order, then the one-hot
/// block of each categorical column in schema order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTransformer {
    numeric: Vec<NumericColumn>,
    categorical: Vec<OneHotEncoder>,
}

impl Artifact for FeatureTransformer {
    const KIND: &'static str = "feature-transformer";
}

impl FeatureTransformer {
    /// Fit on training rows
    pub fn fit(rows: &[StudentFeatures]) -> Result<Self> {
        if rows.is_empty() {
            return Err(ScorecastError::TransformationError(
                "cannot fit the transformer on an empty partition".to_string(),
            ));
        }

        let numeric = schema::NUMERIC_COLUMNS
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let values: Vec<Option<f64>> = rows.iter().map(|r| r.numeric()[i]).collect();
                NumericColumn::fit(name, &values)
            })
            .collect::<Result<Vec<_>>>()?;

        let categorical = schema::CATEGORICAL_COLUMNS
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let values: Vec<Option<&str>> = rows.iter().map(|r| r.categorical()[i]).collect();
                OneHotEncoder::fit(name, &values).ok_or_else(|| {
                    ScorecastError::TransformationError(format!("column '{}' has no values", name))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            numeric,
            categorical,
        })
    }

    /// Number of output feature columns
    pub fn n_features(&self) -> usize {
        self.numeric.len() + self.categorical.iter().map(OneHotEncoder::width).sum::<usize>()
    }

    /// Output column names in layout order
    pub fn feature_names(&self) -> Vec<String> {
        self.numeric
            .iter()
            .map(|n| n.column.clone())
            .chain(self.categorical.iter().flat_map(|c| c.feature_names()))
            .collect()
    }

    /// Encode typed rows into a `rows × n_features` matrix
    pub fn transform(&self, rows: &[StudentFeatures]) -> Array2<f64> {
        let mut out = Array2::zeros((rows.len(), self.n_features()));
        for (row, mut target) in rows.iter().zip(out.rows_mut()) {
            let Some(slots) = target.as_slice_mut() else {
                continue;
            };
            let numeric = row.numeric();
            for (i, column) in self.numeric.iter().enumerate() {
                slots[i] = column.encode(numeric[i]);
            }

            let categorical = row.categorical();
            let mut offset = self.numeric.len();
            for (i, encoder) in self.categorical.iter().enumerate() {
                let width = encoder.width();
                encoder.encode_into(categorical[i], &mut slots[offset..offset + width]);
                offset += width;
            }
        }
        out
    }

    /// Encode a frame holding the feature columns
    pub fn transform_frame(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let rows = schema::features_from_frame(df)
            .map_err(|e| ScorecastError::TransformationError(e.to_string()))?;
        Ok(self.transform(&rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<StudentFeatures> {
        vec![
            StudentFeatures::new("female", "group B", "bachelor's degree", "standard", "none", 72.0, 74.0),
            StudentFeatures::new("male", "group C", "some college", "free/reduced", "completed", 90.0, 88.0),
            StudentFeatures::new("female", "group B", "master's degree", "standard", "none", 60.0, 61.0),
            StudentFeatures {
                reading_score: None,
                lunch: None,
                ..StudentFeatures::new("male", "group A", "high school", "standard", "none", 0.0, 50.0)
            },
        ]
    }

    #[test]
    fn test_layout_numeric_first_then_sorted_categories() {
        let transformer = FeatureTransformer::fit(&rows()).unwrap();
        let names = transformer.feature_names();
        // 2 numeric + gender(2) + race(3) + education(4) + lunch(2) + prep(2)
        assert_eq!(transformer.n_features(), 15);
        assert_eq!(names.len(), 15);
        assert_eq!(&names[..4], &["reading_score", "writing_score", "gender_female", "gender_male"]);
        assert_eq!(names[4], "race_ethnicity_group A");
    }

    #[test]
    fn test_missing_values_use_train_statistics() {
        let transformer = FeatureTransformer::fit(&rows()).unwrap();
        let matrix = transformer.transform(&rows());

        // reading median over {60, 72, 90} is 72, so the imputed row matches row 0
        assert_eq!(matrix[[3, 0]], matrix[[0, 0]]);
        // lunch imputes to "standard"
        let lunch_standard = transformer
            .feature_names()
            .iter()
            .position(|n| n == "lunch_standard")
            .unwrap();
        assert!(matrix[[3, lunch_standard]] > 0.0);
    }

    #[test]
    fn test_transform_is_deterministic() {
        let transformer = FeatureTransformer::fit(&rows()).unwrap();
        let single = transformer.transform(&rows()[1..2]);
        let batch = transformer.transform(&rows());
        assert_eq!(single.row(0), batch.row(1));
    }

    #[test]
    fn test_empty_fit_rejected() {
        assert!(matches!(
            FeatureTransformer::fit(&[]),
            Err(ScorecastError::TransformationError(_))
        ));
    }
}
