//! Hyperparameter grids and cross-validated grid search

use super::cross_validation::{CVResults, KFold};
use super::metrics::r2_score;
use super::models::Regressor;
use crate::error::{Result, ScorecastError};
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// A single hyperparameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterValue {
    Float(f64),
    Int(i64),
    String(String),
}

impl ParameterValue {
    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParameterValue::Float(v) => Some(*v),
            ParameterValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Get as a non-negative integer
    pub fn as_usize(&self) -> Option<usize> {
        match self {
            ParameterValue::Int(v) => usize::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParameterValue::String(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Float(v) => write!(f, "{}", v),
            ParameterValue::Int(v) => write!(f, "{}", v),
            ParameterValue::String(v) => write!(f, "'{}'", v),
        }
    }
}

/// One configuration: ordered `(name, value)` pairs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamSet {
    values: Vec<(String, ParameterValue)>,
}

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method adding or replacing a value
    pub fn with(mut self, name: impl Into<String>, value: ParameterValue) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: ParameterValue) {
        let name = name.into();
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Float value of `name`, `default` when absent
    pub fn float_or(&self, name: &str, default: f64) -> Result<f64> {
        match self.get(name) {
            None => Ok(default),
            Some(value) => value.as_float().ok_or_else(|| invalid(name, value, "a number")),
        }
    }

    /// Integer value of `name`, `default` when absent
    pub fn usize_or(&self, name: &str, default: usize) -> Result<usize> {
        match self.get(name) {
            None => Ok(default),
            Some(value) => value
                .as_usize()
                .ok_or_else(|| invalid(name, value, "a non-negative integer")),
        }
    }

    /// String value of `name`, `default` when absent
    pub fn str_or<'a>(&'a self, name: &str, default: &'a str) -> Result<&'a str> {
        match self.get(name) {
            None => Ok(default),
            Some(value) => value.as_str().ok_or_else(|| invalid(name, value, "a string")),
        }
    }

    /// Fail on any parameter not in `known`
    pub fn ensure_known(&self, algorithm: &str, known: &[&str]) -> Result<()> {
        match self.values.iter().find(|(n, _)| !known.contains(&n.as_str())) {
            Some((name, _)) => Err(ScorecastError::TrainingError(format!(
                "unknown parameter '{}' for {}",
                name, algorithm
            ))),
            None => Ok(()),
        }
    }
}

fn invalid(name: &str, value: &ParameterValue, expected: &str) -> ScorecastError {
    ScorecastError::TrainingError(format!(
        "parameter '{}' must be {}, got {}",
        name, expected, value
    ))
}

impl fmt::Display for ParamSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", name, value)?;
        }
        f.write_str("}")
    }
}

/// Ordered hyperparameter axes
///
/// Configurations are the cartesian product of the axes in declaration order
/// with the last axis varying fastest. A grid without axes has exactly one
/// configuration, the empty [`ParamSet`], meaning "all defaults".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    axes: Vec<(String, Vec<ParameterValue>)>,
}

impl ParamGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an axis of arbitrary values
    pub fn axis(mut self, name: impl Into<String>, values: Vec<ParameterValue>) -> Self {
        self.axes.push((name.into(), values));
        self
    }

    pub fn int_axis(self, name: impl Into<String>, values: &[i64]) -> Self {
        self.axis(name, values.iter().map(|&v| ParameterValue::Int(v)).collect())
    }

    pub fn float_axis(self, name: impl Into<String>, values: &[f64]) -> Self {
        self.axis(name, values.iter().map(|&v| ParameterValue::Float(v)).collect())
    }

    pub fn str_axis(self, name: impl Into<String>, values: &[&str]) -> Self {
        self.axis(
            name,
            values.iter().map(|v| ParameterValue::String(v.to_string())).collect(),
        )
    }

    /// True when the grid has no axes
    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    /// Number of configurations
    pub fn len(&self) -> usize {
        self.axes.iter().map(|(_, values)| values.len()).product()
    }

    /// Every configuration, in enumeration order
    pub fn configurations(&self) -> Vec<ParamSet> {
        let mut configs = vec![ParamSet::new()];
        for (name, values) in &self.axes {
            configs = configs
                .into_iter()
                .flat_map(|base| {
                    values
                        .iter()
                        .map(move |value| base.clone().with(name.clone(), value.clone()))
                })
                .collect();
        }
        configs
    }
}

/// Outcome of a grid search
#[derive(Debug, Clone)]
pub struct GridSearchResult {
    pub best_params: ParamSet,
    pub best_score: f64,
    /// Per-configuration fold scores, in enumeration order
    pub cv_results: Vec<(ParamSet, CVResults)>,
}

/// Cross-validated exhaustive search over `grid`
///
/// `build` must return a fresh unfitted estimator for every call. The highest
/// mean fold R² wins; ties go to the earliest configuration. Configurations are
/// scored in parallel. A configuration that fails on any fold scores NaN and is
/// skipped; the search only fails when no configuration produces a finite score.
pub fn grid_search<M, F>(
    grid: &ParamGrid,
    x: &Array2<f64>,
    y: &Array1<f64>,
    folds: &KFold,
    build: F,
) -> Result<GridSearchResult>
where
    M: Regressor,
    F: Fn(&ParamSet) -> Result<M> + Sync,
{
    let splits = folds.split(x.nrows())?;
    let fold_data: Vec<_> = splits
        .iter()
        .map(|split| {
            (
                x.select(Axis(0), &split.train_indices),
                y.select(Axis(0), &split.train_indices),
                x.select(Axis(0), &split.test_indices),
                y.select(Axis(0), &split.test_indices),
            )
        })
        .collect();

    let configurations = grid.configurations();
    let outcomes: Vec<Result<CVResults>> = configurations
        .par_iter()
        .map(|params| {
            let scores = fold_data
                .iter()
                .map(|(x_train, y_train, x_val, y_val)| {
                    let mut model = build(params)?;
                    model.fit(x_train, y_train)?;
                    let predictions = model.predict(x_val)?;
                    Ok(r2_score(y_val.view(), predictions.view()))
                })
                .collect::<Result<Vec<f64>>>()?;
            Ok(CVResults::from_scores(scores))
        })
        .collect();

    let mut first_failure: Option<ScorecastError> = None;
    let cv_results: Vec<(ParamSet, CVResults)> = configurations
        .into_iter()
        .zip(outcomes)
        .map(|(params, outcome)| match outcome {
            Ok(cv) => (params, cv),
            Err(err) => {
                warn!(params = %params, error = %err, "Configuration failed, scored as NaN");
                first_failure.get_or_insert(err);
                (params, CVResults::failed())
            }
        })
        .collect();

    let mut best: Option<(usize, f64)> = None;
    for (i, (_, cv)) in cv_results.iter().enumerate() {
        let score = cv.mean_score;
        if score.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, b)| score > b) {
            best = Some((i, score));
        }
    }

    let (best_idx, best_score) = best.ok_or_else(|| {
        ScorecastError::TrainingError(match first_failure {
            Some(err) => format!("every configuration failed, first error: {}", err),
            None => "no configuration produced a finite score".to_string(),
        })
    })?;

    Ok(GridSearchResult {
        best_params: cv_results[best_idx].0.clone(),
        best_score,
        cv_results,
    })
}
