//! Request record builder
//!
//! Turns raw named fields (form or JSON) into a typed feature row. Field names
//! follow the schema; `ethnicity` is accepted for `race_ethnicity`.

use crate::error::{Result, ScorecastError};
use crate::schema::{self, StudentFeatures};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Alternative field names accepted for schema columns
const FIELD_ALIASES: [(&str, &str); 1] = [("ethnicity", schema::RACE_ETHNICITY)];

/// A validated prediction request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    features: StudentFeatures,
}

impl RequestRecord {
    /// Validate raw fields; every feature column is required
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self> {
        let lookup = |column: &str| -> Option<&str> {
            fields
                .get(column)
                .or_else(|| {
                    FIELD_ALIASES
                        .iter()
                        .filter(|(_, target)| *target == column)
                        .find_map(|(alias, _)| fields.get(*alias))
                })
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };

        let missing: Vec<&str> = schema::FEATURE_COLUMNS
            .iter()
            .copied()
            .filter(|column| lookup(column).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ScorecastError::RequestValidationError(format!(
                "missing fields: {}",
                missing.join(", ")
            )));
        }

        let text = |column: &str| lookup(column).map(str::to_string);
        let number = |column: &str| -> Result<Option<f64>> {
            match lookup(column) {
                None => Ok(None),
                Some(raw) => match raw.parse::<f64>() {
                    Ok(value) if value.is_finite() => Ok(Some(value)),
                    _ => Err(ScorecastError::RequestValidationError(format!(
                        "field '{}' must be a number, got '{}'",
                        column, raw
                    ))),
                },
            }
        };

        Ok(Self {
            features: StudentFeatures {
                gender: text(schema::GENDER),
                race_ethnicity: text(schema::RACE_ETHNICITY),
                parental_level_of_education: text(schema::PARENTAL_EDUCATION),
                lunch: text(schema::LUNCH),
                test_preparation_course: text(schema::TEST_PREPARATION),
                reading_score: number(schema::READING_SCORE)?,
                writing_score: number(schema::WRITING_SCORE)?,
            },
        })
    }

    pub fn features(&self) -> &StudentFeatures {
        &self.features
    }

    /// Single-row frame in the canonical training column order
    pub fn to_frame(&self) -> Result<DataFrame> {
        schema::features_to_frame(std::slice::from_ref(&self.features))
            .map_err(|e| ScorecastError::RequestValidationError(e.to_string()))
    }
}

impl From<StudentFeatures> for RequestRecord {
    fn from(features: StudentFeatures) -> Self {
        Self { features }
    }
}
