//! CatBoost-style gradient boosting on symmetric (oblivious) trees
//!
//! Every level of a tree applies one shared split (feature, threshold) to all
//! of its nodes, so a tree of depth `d` is `d` splits plus `2^d` leaf values.
//! Leaf values are Newton steps with L2 regularization: `-G / (H + λ)`.

use super::models::{check_fit_input, check_predict_input, Regressor};
use crate::error::{Result, ScorecastError};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Upper bound on candidate thresholds scanned per feature and level
const MAX_THRESHOLDS: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatBoostConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub reg_lambda: f64,
    pub subsample: f64,
    pub random_state: u64,
}

impl Default for CatBoostConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 6,
            reg_lambda: 3.0,
            subsample: 1.0,
            random_state: 42,
        }
    }
}

/// Symmetric (oblivious) tree: each level uses the same split feature + threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SymmetricTree {
    splits: Vec<(usize, f64)>,
    leaf_values: Vec<f64>,
}

impl SymmetricTree {
    fn leaf_index(&self, sample: ArrayView1<f64>) -> usize {
        self.splits.iter().fold(0usize, |idx, &(feature, threshold)| {
            idx * 2 + usize::from(sample[feature] > threshold)
        })
    }

    fn predict(&self, sample: ArrayView1<f64>) -> f64 {
        self.leaf_values
            .get(self.leaf_index(sample))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Best shared threshold for one feature across all current buckets
fn best_level_split(
    x: &Array2<f64>,
    gradients: &[f64],
    buckets: &[Vec<usize>],
    feature: usize,
    reg_lambda: f64,
) -> Option<(f64, f64)> {
    let mut values: Vec<f64> = buckets
        .iter()
        .flat_map(|b| b.iter().map(|&i| x[[i, feature]]))
        .collect();
    values.sort_by(f64::total_cmp);
    values.dedup();
    if values.len() < 2 {
        return None;
    }

    let step = (values.len() / MAX_THRESHOLDS).max(1);
    let mut best: Option<(f64, f64)> = None;
    for i in (0..values.len() - 1).step_by(step) {
        let threshold = (values[i] + values[i + 1]) / 2.0;
        let gain: f64 = buckets
            .iter()
            .map(|bucket| {
                // hessians are all one under squared error
                let (lg, lh, rg, rh) =
                    bucket.iter().fold((0.0, 0.0, 0.0, 0.0), |(lg, lh, rg, rh), &idx| {
                        if x[[idx, feature]] <= threshold {
                            (lg + gradients[idx], lh + 1.0, rg, rh)
                        } else {
                            (lg, lh, rg + gradients[idx], rh + 1.0)
                        }
                    });
                let (pg, ph) = (lg + rg, lh + rh);
                lg * lg / (lh + reg_lambda) + rg * rg / (rh + reg_lambda) - pg * pg / (ph + reg_lambda)
            })
            .sum();

        if best.map_or(true, |(_, g)| gain > g) {
            best = Some((threshold, gain));
        }
    }
    best.filter(|&(_, gain)| gain > 0.0)
}

fn build_symmetric_tree(
    x: &Array2<f64>,
    gradients: &[f64],
    indices: &[usize],
    max_depth: usize,
    reg_lambda: f64,
) -> SymmetricTree {
    let mut splits = Vec::with_capacity(max_depth);
    let mut buckets: Vec<Vec<usize>> = vec![indices.to_vec()];

    for _ in 0..max_depth {
        let candidates: Vec<Option<(f64, f64)>> = (0..x.ncols())
            .into_par_iter()
            .map(|feature| best_level_split(x, gradients, &buckets, feature, reg_lambda))
            .collect();
        // earliest feature wins ties
        let best = candidates
            .into_iter()
            .enumerate()
            .filter_map(|(feature, c)| c.map(|(threshold, gain)| (feature, threshold, gain)))
            .fold(None, |best: Option<(usize, f64, f64)>, c| match best {
                Some(b) if b.2 >= c.2 => Some(b),
                _ => Some(c),
            });

        let Some((feature, threshold, _)) = best else {
            break;
        };
        splits.push((feature, threshold));
        buckets = buckets
            .iter()
            .flat_map(|bucket| {
                let (left, right): (Vec<usize>, Vec<usize>) =
                    bucket.iter().partition(|&&i| x[[i, feature]] <= threshold);
                [left, right]
            })
            .collect();
    }

    let leaf_values = buckets
        .iter()
        .map(|bucket| {
            let g: f64 = bucket.iter().map(|&i| gradients[i]).sum();
            -g / (bucket.len() as f64 + reg_lambda)
        })
        .collect();

    SymmetricTree { splits, leaf_values }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatBoostRegressor {
    config: CatBoostConfig,
    trees: Vec<SymmetricTree>,
    base_prediction: f64,
    n_features: usize,
}

impl CatBoostRegressor {
    pub fn new(config: CatBoostConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            base_prediction: 0.0,
            n_features: 0,
        }
    }

    pub fn config(&self) -> &CatBoostConfig {
        &self.config
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        if self.config.n_estimators == 0 || !(self.config.learning_rate > 0.0) {
            return Err(ScorecastError::TrainingError(
                "CatBoost needs n_estimators >= 1 and a positive learning_rate".to_string(),
            ));
        }
        let n = x.nrows();
        self.n_features = x.ncols();

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);
        self.base_prediction = y.mean().unwrap_or(0.0);
        let mut predictions = Array1::from_elem(n, self.base_prediction);

        self.trees.clear();
        for _ in 0..self.config.n_estimators {
            let gradients: Vec<f64> = predictions.iter().zip(y.iter()).map(|(&p, &yi)| p - yi).collect();

            let indices: Vec<usize> = if self.config.subsample < 1.0 {
                let k = ((n as f64 * self.config.subsample).ceil() as usize).clamp(1, n);
                rand::seq::index::sample(&mut rng, n, k).into_vec()
            } else {
                (0..n).collect()
            };

            let tree = build_symmetric_tree(
                x,
                &gradients,
                &indices,
                self.config.max_depth,
                self.config.reg_lambda,
            );

            for (pred, row) in predictions.iter_mut().zip(x.rows()) {
                *pred += self.config.learning_rate * tree.predict(row);
            }
            self.trees.push(tree);
        }
        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(ScorecastError::PredictionError(
                "CatBoostRegressor is not fitted".to_string(),
            ));
        }
        check_predict_input(x, self.n_features)?;
        Ok(x
            .rows()
            .into_iter()
            .map(|row| {
                self.base_prediction
                    + self
                        .trees
                        .iter()
                        .map(|t| self.config.learning_rate * t.predict(row))
                        .sum::<f64>()
            })
            .collect())
    }
}

impl Regressor for CatBoostRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        CatBoostRegressor::fit(self, x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        CatBoostRegressor::predict(self, x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::metrics::r2_score;

    fn make_regression_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((100, 3), |(i, j)| ((i * (j + 2) * 11) % 37) as f64 / 37.0);
        let y = x.column(0).mapv(|v| 2.0 * v) + x.column(2).mapv(|v| v * v) + 0.1;
        (x, y)
    }

    #[test]
    fn test_catboost_regressor() {
        let (x, y) = make_regression_data();
        let config = CatBoostConfig { n_estimators: 50, max_depth: 4, ..Default::default() };
        let mut model = CatBoostRegressor::new(config);
        model.fit(&x, &y).unwrap();
        let preds = model.predict(&x).unwrap();
        assert_eq!(preds.len(), 100);
        assert!(r2_score(y.view(), preds.view()) > 0.8);
    }

    #[test]
    fn test_catboost_symmetric_tree() {
        let (x, y) = make_regression_data();
        let config = CatBoostConfig { n_estimators: 5, max_depth: 3, ..Default::default() };
        let mut model = CatBoostRegressor::new(config);
        model.fit(&x, &y).unwrap();
        for tree in &model.trees {
            assert!(tree.splits.len() <= 3);
            assert_eq!(tree.leaf_values.len(), 1 << tree.splits.len());
        }
    }

    #[test]
    fn test_catboost_is_deterministic() {
        let (x, y) = make_regression_data();
        let config = CatBoostConfig { n_estimators: 10, subsample: 0.8, ..Default::default() };
        let mut a = CatBoostRegressor::new(config.clone());
        let mut b = CatBoostRegressor::new(config);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_unfitted_predict_fails() {
        let model = CatBoostRegressor::new(CatBoostConfig::default());
        assert!(matches!(
            model.predict(&Array2::zeros((1, 3))),
            Err(ScorecastError::PredictionError(_))
        ));
    }
}
