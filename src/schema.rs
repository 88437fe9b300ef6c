//! Fixed student-performance schema
//!
//! Column names, the typed row representation and conversions between polars
//! frames and typed rows. The canonical column order is the order of
//! [`FEATURE_COLUMNS`] followed by [`TARGET_COLUMN`]; the feature transformer
//! depends on it.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const GENDER: &str = "gender";
pub const RACE_ETHNICITY: &str = "race_ethnicity";
pub const PARENTAL_EDUCATION: &str = "parental_level_of_education";
pub const LUNCH: &str = "lunch";
pub const TEST_PREPARATION: &str = "test_preparation_course";
pub const READING_SCORE: &str = "reading_score";
pub const WRITING_SCORE: &str = "writing_score";
pub const TARGET_COLUMN: &str = "math_score";

/// Categorical feature columns, in schema order
pub const CATEGORICAL_COLUMNS: [&str; 5] = [
    GENDER,
    RACE_ETHNICITY,
    PARENTAL_EDUCATION,
    LUNCH,
    TEST_PREPARATION,
];

/// Numeric feature columns, in schema order
pub const NUMERIC_COLUMNS: [&str; 2] = [READING_SCORE, WRITING_SCORE];

/// Numeric columns of the raw dataset, target included
pub const SCORE_COLUMNS: [&str; 3] = [READING_SCORE, WRITING_SCORE, TARGET_COLUMN];

/// Every feature column in canonical order
pub const FEATURE_COLUMNS: [&str; 7] = [
    GENDER,
    RACE_ETHNICITY,
    PARENTAL_EDUCATION,
    LUNCH,
    TEST_PREPARATION,
    READING_SCORE,
    WRITING_SCORE,
];

/// Errors raised while reading schema columns out of a frame
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("column '{column}': {reason}")]
    InvalidColumn { column: String, reason: String },

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

/// Feature values of one student; `None` marks a missing cell
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentFeatures {
    pub gender: Option<String>,
    pub race_ethnicity: Option<String>,
    pub parental_level_of_education: Option<String>,
    pub lunch: Option<String>,
    pub test_preparation_course: Option<String>,
    pub reading_score: Option<f64>,
    pub writing_score: Option<f64>,
}

impl StudentFeatures {
    /// Fully populated feature row
    pub fn new(
        gender: impl Into<String>,
        race_ethnicity: impl Into<String>,
        parental_level_of_education: impl Into<String>,
        lunch: impl Into<String>,
        test_preparation_course: impl Into<String>,
        reading_score: f64,
        writing_score: f64,
    ) -> Self {
        Self {
            gender: Some(gender.into()),
            race_ethnicity: Some(race_ethnicity.into()),
            parental_level_of_education: Some(parental_level_of_education.into()),
            lunch: Some(lunch.into()),
            test_preparation_course: Some(test_preparation_course.into()),
            reading_score: Some(reading_score),
            writing_score: Some(writing_score),
        }
    }

    /// Categorical values in [`CATEGORICAL_COLUMNS`] order
    pub fn categorical(&self) -> [Option<&str>; 5] {
        [
            self.gender.as_deref(),
            self.race_ethnicity.as_deref(),
            self.parental_level_of_education.as_deref(),
            self.lunch.as_deref(),
            self.test_preparation_course.as_deref(),
        ]
    }

    /// Numeric values in [`NUMERIC_COLUMNS`] order
    pub fn numeric(&self) -> [Option<f64>; 2] {
        [self.reading_score, self.writing_score]
    }
}

/// One raw dataset row: features plus the target score
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub features: StudentFeatures,
    pub math_score: Option<f64>,
}

/// Check that every feature column (and the target when required) is present
pub fn validate_columns(df: &DataFrame, require_target: bool) -> Result<(), SchemaError> {
    let mut missing: Vec<String> = FEATURE_COLUMNS
        .iter()
        .filter(|name| df.column(name).is_err())
        .map(|name| name.to_string())
        .collect();
    if require_target && df.column(TARGET_COLUMN).is_err() {
        missing.push(TARGET_COLUMN.to_string());
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::MissingColumns(missing))
    }
}

fn text_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, SchemaError> {
    let column = df.column(name)?.cast(&DataType::String)?;
    let values = column
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
        .collect();
    Ok(values)
}

fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float64
            | DataType::Float32
            | DataType::Int64
            | DataType::Int32
            | DataType::Int16
            | DataType::Int8
            | DataType::UInt64
            | DataType::UInt32
            | DataType::UInt16
            | DataType::UInt8
            | DataType::Null
    )
}

/// Read a numeric column, accepting numeric dtypes or strings that parse as numbers
pub fn numeric_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, SchemaError> {
    let column = df.column(name)?;
    match column.dtype() {
        DataType::String => column
            .str()?
            .into_iter()
            .map(|v| match v.map(str::trim) {
                None | Some("") => Ok(None),
                Some(s) => s.parse::<f64>().map(Some).map_err(|_| SchemaError::InvalidColumn {
                    column: name.to_string(),
                    reason: format!("'{}' is not a number", s),
                }),
            })
            .collect(),
        dtype if is_numeric_dtype(dtype) => {
            let casted = column.cast(&DataType::Float64)?;
            Ok(casted.f64()?.into_iter().collect())
        }
        other => Err(SchemaError::InvalidColumn {
            column: name.to_string(),
            reason: format!("expected a numeric column, found {}", other),
        }),
    }
}

/// Typed feature rows of a frame holding at least the feature columns
pub fn features_from_frame(df: &DataFrame) -> Result<Vec<StudentFeatures>, SchemaError> {
    validate_columns(df, false)?;

    let mut gender = text_values(df, GENDER)?.into_iter();
    let mut race = text_values(df, RACE_ETHNICITY)?.into_iter();
    let mut parental = text_values(df, PARENTAL_EDUCATION)?.into_iter();
    let mut lunch = text_values(df, LUNCH)?.into_iter();
    let mut preparation = text_values(df, TEST_PREPARATION)?.into_iter();
    let reading = numeric_values(df, READING_SCORE)?;
    let writing = numeric_values(df, WRITING_SCORE)?;

    let rows = reading
        .into_iter()
        .zip(writing)
        .map(|(reading_score, writing_score)| StudentFeatures {
            gender: gender.next().flatten(),
            race_ethnicity: race.next().flatten(),
            parental_level_of_education: parental.next().flatten(),
            lunch: lunch.next().flatten(),
            test_preparation_course: preparation.next().flatten(),
            reading_score,
            writing_score,
        })
        .collect();
    Ok(rows)
}

/// Typed records of a frame holding the feature columns and the target
pub fn records_from_frame(df: &DataFrame) -> Result<Vec<StudentRecord>, SchemaError> {
    validate_columns(df, true)?;
    let features = features_from_frame(df)?;
    let targets = numeric_values(df, TARGET_COLUMN)?;
    Ok(features
        .into_iter()
        .zip(targets)
        .map(|(features, math_score)| StudentRecord { features, math_score })
        .collect())
}

/// Frame with the feature columns in canonical order
pub fn features_to_frame(rows: &[StudentFeatures]) -> PolarsResult<DataFrame> {
    let text = |pick: fn(&StudentFeatures) -> Option<&str>| -> Vec<Option<String>> {
        rows.iter().map(|r| pick(r).map(str::to_string)).collect()
    };
    let reading: Vec<Option<f64>> = rows.iter().map(|r| r.reading_score).collect();
    let writing: Vec<Option<f64>> = rows.iter().map(|r| r.writing_score).collect();

    df!(
        GENDER => text(|r| r.gender.as_deref()),
        RACE_ETHNICITY => text(|r| r.race_ethnicity.as_deref()),
        PARENTAL_EDUCATION => text(|r| r.parental_level_of_education.as_deref()),
        LUNCH => text(|r| r.lunch.as_deref()),
        TEST_PREPARATION => text(|r| r.test_preparation_course.as_deref()),
        READING_SCORE => reading,
        WRITING_SCORE => writing
    )
}

/// Frame with the feature columns followed by the target
pub fn records_to_frame(records: &[StudentRecord]) -> PolarsResult<DataFrame> {
    let features: Vec<StudentFeatures> = records.iter().map(|r| r.features.clone()).collect();
    let targets: Vec<Option<f64>> = records.iter().map(|r| r.math_score).collect();
    let mut df = features_to_frame(&features)?;
    df.with_column(Column::new(TARGET_COLUMN.into(), targets))?;
    Ok(df)
}
