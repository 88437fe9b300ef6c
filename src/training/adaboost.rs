//! AdaBoost.R2 regression
//!
//! Each round fits a shallow regression tree on a weighted bootstrap of the
//! training rows, scores it with a linear loss normalized by the largest
//! error and reweights rows towards the ones it got wrong. Predictions are
//! the weighted median of the member predictions.

use super::decision_tree::DecisionTree;
use super::models::{check_fit_input, check_predict_input, Regressor};
use crate::error::{Result, ScorecastError};
use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// AdaBoost regressor over depth-limited trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaBoostRegressor {
    pub n_estimators: usize,
    pub learning_rate: f64,
    /// Depth of every member tree
    pub max_depth: usize,
    pub random_state: u64,
    estimators: Vec<DecisionTree>,
    /// ln(1 / beta) of every member
    estimator_weights: Vec<f64>,
    n_features: usize,
}

impl Default for AdaBoostRegressor {
    fn default() -> Self {
        Self::new(50, 1.0)
    }
}

impl AdaBoostRegressor {
    pub fn new(n_estimators: usize, learning_rate: f64) -> Self {
        Self {
            n_estimators,
            learning_rate,
            max_depth: 3,
            random_state: 42,
            estimators: Vec::new(),
            estimator_weights: Vec::new(),
            n_features: 0,
        }
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Number of members kept after early stopping
    pub fn n_fitted(&self) -> usize {
        self.estimators.len()
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_fit_input(x, y)?;
        if self.n_estimators == 0 || !(self.learning_rate > 0.0) {
            return Err(ScorecastError::TrainingError(
                "AdaBoost needs n_estimators >= 1 and a positive learning_rate".to_string(),
            ));
        }

        let n_samples = x.nrows();
        self.n_features = x.ncols();
        self.estimators.clear();
        self.estimator_weights.clear();

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let mut weights = Array1::from_elem(n_samples, 1.0 / n_samples as f64);

        for round in 0..self.n_estimators {
            let rows = weighted_bootstrap(&mut rng, &weights);
            let mut tree = DecisionTree::new_regressor()
                .with_max_depth(self.max_depth)
                .with_random_state(self.random_state.wrapping_add(round as u64));
            tree.fit(&x.select(Axis(0), &rows), &y.select(Axis(0), &rows))?;

            let predictions = tree.predict(x)?;
            let errors: Array1<f64> = (&predictions - y).mapv(f64::abs);
            let max_error = errors.fold(0.0f64, |m, &e| m.max(e));

            // perfect fit: keep it with full weight and stop
            if max_error == 0.0 {
                self.estimators.push(tree);
                self.estimator_weights.push(1.0);
                break;
            }

            let loss = errors / max_error;
            let estimator_error = (&weights * &loss).sum();

            if estimator_error <= 0.0 {
                self.estimators.push(tree);
                self.estimator_weights.push(1.0);
                break;
            }
            if estimator_error >= 0.5 {
                // a first member is kept so the ensemble can still predict
                if self.estimators.is_empty() {
                    self.estimators.push(tree);
                    self.estimator_weights.push(1.0);
                }
                break;
            }

            let beta = estimator_error / (1.0 - estimator_error);
            let estimator_weight = self.learning_rate * (1.0 / beta).ln();

            if round + 1 < self.n_estimators {
                weights.zip_mut_with(&loss, |w, &l| {
                    *w *= beta.powf((1.0 - l) * self.learning_rate);
                });
                let total = weights.sum();
                if !(total > 0.0) {
                    self.estimators.push(tree);
                    self.estimator_weights.push(estimator_weight);
                    break;
                }
                weights /= total;
            }

            self.estimators.push(tree);
            self.estimator_weights.push(estimator_weight);
        }

        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.estimators.is_empty() {
            return Err(ScorecastError::PredictionError(
                "AdaBoostRegressor is not fitted".to_string(),
            ));
        }
        check_predict_input(x, self.n_features)?;

        let member_predictions = self
            .estimators
            .iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<Vec<_>>>()?;

        Ok((0..x.nrows())
            .map(|i| {
                let values: Vec<f64> = member_predictions.iter().map(|p| p[i]).collect();
                weighted_median(&values, &self.estimator_weights)
            })
            .collect())
    }
}

impl Regressor for AdaBoostRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        AdaBoostRegressor::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        AdaBoostRegressor::predict(self, x)
    }
}

/// Draw `weights.len()` rows with replacement, proportionally to `weights`
fn weighted_bootstrap(rng: &mut ChaCha8Rng, weights: &Array1<f64>) -> Vec<usize> {
    let mut cumulative = Vec::with_capacity(weights.len());
    let mut total = 0.0;
    for &w in weights {
        total += w;
        cumulative.push(total);
    }
    let last = weights.len() - 1;
    (0..weights.len())
        .map(|_| {
            let u = rng.gen::<f64>() * total;
            cumulative.partition_point(|&c| c <= u).min(last)
        })
        .collect()
}

/// Smallest value whose cumulative weight reaches half of the total
fn weighted_median(values: &[f64], weights: &[f64]) -> f64 {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let total: f64 = weights.iter().sum();
    let mut cumulative = 0.0;
    for &i in &order {
        cumulative += weights[i];
        if cumulative >= 0.5 * total {
            return values[i];
        }
    }
    order.last().map_or(0.0, |&i| values[i])
}
