//! Gradient boosting on squared error
//!
//! Each round fits a shallow regression tree to the current residuals, on a
//! row subsample drawn without replacement, and adds it with shrinkage.

use super::decision_tree::{Criterion, DecisionTree};
use super::models::{check_fit_input, check_predict_input, Regressor};
use crate::error::{Result, ScorecastError};
use ndarray::{Array1, Array2, Axis};
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

/// Gradient Boosting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingConfig {
    /// Number of boosting rounds (trees)
    pub n_estimators: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
    /// Fraction of rows drawn for each tree
    pub subsample: f64,
    /// Random seed
    pub random_state: u64,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
            subsample: 1.0,
            random_state: 42,
        }
    }
}

/// Gradient Boosting Regressor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    config: GradientBoostingConfig,
    trees: Vec<DecisionTree>,
    initial_prediction: f64,
    n_features: usize,
}

impl GradientBoostingRegressor {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            initial_prediction: 0.0,
            n_features: 0,
        }
    }

    pub fn config(&self) -> &GradientBoostingConfig {
        &self.config
    }

    fn validate(&self) -> Result<()> {
        let c = &self.config;
        if c.n_estimators == 0 {
            return Err(ScorecastError::TrainingError("n_estimators must be at least 1".to_string()));
        }
        if !(c.learning_rate > 0.0) {
            return Err(ScorecastError::TrainingError("learning_rate must be positive".to_string()));
        }
        if !(c.subsample > 0.0 && c.subsample <= 1.0) {
            return Err(ScorecastError::TrainingError("subsample must be in (0, 1]".to_string()));
        }
        Ok(())
    }

    /// Fit the gradient boosting model
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        self.validate()?;

        let n_samples = x.nrows();
        self.n_features = x.ncols();
        self.trees.clear();
        self.initial_prediction = y.mean().unwrap_or(0.0);

        let mut predictions = Array1::from_elem(n_samples, self.initial_prediction);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);
        let n_sub = ((n_samples as f64 * self.config.subsample).round() as usize).clamp(1, n_samples);

        for _ in 0..self.config.n_estimators {
            let residuals = y - &predictions;

            let mut tree = DecisionTree::new_regressor()
                .with_criterion(Criterion::FriedmanMse)
                .with_max_depth(self.config.max_depth)
                .with_min_samples_leaf(self.config.min_samples_leaf);

            if n_sub < n_samples {
                let mut rows = sample(&mut rng, n_samples, n_sub).into_vec();
                rows.sort_unstable();
                tree.fit(&x.select(Axis(0), &rows), &residuals.select(Axis(0), &rows))?;
            } else {
                tree.fit(x, &residuals)?;
            }

            predictions.scaled_add(self.config.learning_rate, &tree.predict(x)?);
            self.trees.push(tree);
        }

        Ok(())
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(ScorecastError::PredictionError(
                "GradientBoostingRegressor is not fitted".to_string(),
            ));
        }
        check_predict_input(x, self.n_features)?;

        let mut predictions = Array1::from_elem(x.nrows(), self.initial_prediction);
        for tree in &self.trees {
            predictions.scaled_add(self.config.learning_rate, &tree.predict(x)?);
        }
        Ok(predictions)
    }
}

impl Regressor for GradientBoostingRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        GradientBoostingRegressor::fit(self, x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        GradientBoostingRegressor::predict(self, x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::metrics::r2_score;

    fn data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((80, 2), |(i, j)| ((i * (j + 3)) % 17) as f64);
        let y = x.column(0).mapv(|v| 2.0 * v) + x.column(1);
        (x, y)
    }

    #[test]
    fn test_boosting_reduces_error() {
        let (x, y) = data();
        let mut few = GradientBoostingRegressor::new(GradientBoostingConfig {
            n_estimators: 5,
            ..Default::default()
        });
        let mut many = GradientBoostingRegressor::new(GradientBoostingConfig {
            n_estimators: 100,
            ..Default::default()
        });
        few.fit(&x, &y).unwrap();
        many.fit(&x, &y).unwrap();

        let r2_few = r2_score(y.view(), few.predict(&x).unwrap().view());
        let r2_many = r2_score(y.view(), many.predict(&x).unwrap().view());
        assert!(r2_many > r2_few);
        assert!(r2_many > 0.95);
    }

    #[test]
    fn test_subsample_is_seeded() {
        let (x, y) = data();
        let config = GradientBoostingConfig {
            n_estimators: 20,
            subsample: 0.7,
            ..Default::default()
        };
        let mut a = GradientBoostingRegressor::new(config.clone());
        let mut b = GradientBoostingRegressor::new(config);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_invalid_subsample_rejected() {
        let (x, y) = data();
        let mut model = GradientBoostingRegressor::new(GradientBoostingConfig {
            subsample: 0.0,
            ..Default::default()
        });
        assert!(matches!(model.fit(&x, &y), Err(ScorecastError::TrainingError(_))));
    }
}
