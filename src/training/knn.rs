//! K-Nearest Neighbors regressor

use super::models::{check_fit_input, check_predict_input, Regressor};
use crate::error::{Result, ScorecastError};
use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Distance metric for KNN
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Euclidean distance (L2)
    #[default]
    Euclidean,
    /// Manhattan distance (L1)
    Manhattan,
}

impl DistanceMetric {
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "euclidean" => Ok(DistanceMetric::Euclidean),
            "manhattan" => Ok(DistanceMetric::Manhattan),
            other => Err(ScorecastError::TrainingError(format!(
                "unknown distance metric '{}'",
                other
            ))),
        }
    }
}

/// Weighting scheme for neighbors
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum WeightScheme {
    /// All neighbors have equal weight
    #[default]
    Uniform,
    /// Closer neighbors have more weight (inverse distance)
    Distance,
}

impl WeightScheme {
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "uniform" => Ok(WeightScheme::Uniform),
            "distance" => Ok(WeightScheme::Distance),
            other => Err(ScorecastError::TrainingError(format!(
                "unknown weight scheme '{}'",
                other
            ))),
        }
    }
}

/// KNN configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KNNConfig {
    /// Number of neighbors
    pub n_neighbors: usize,
    /// Distance metric
    pub metric: DistanceMetric,
    /// Weighting scheme
    pub weights: WeightScheme,
}

impl Default for KNNConfig {
    fn default() -> Self {
        Self {
            n_neighbors: 5,
            metric: DistanceMetric::Euclidean,
            weights: WeightScheme::Uniform,
        }
    }
}

/// K-Nearest Neighbors Regressor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KNNRegressor {
    config: KNNConfig,
    x_train: Option<Array2<f64>>,
    y_train: Option<Array1<f64>>,
}

impl KNNRegressor {
    pub fn new(config: KNNConfig) -> Self {
        Self {
            config,
            x_train: None,
            y_train: None,
        }
    }

    pub fn config(&self) -> &KNNConfig {
        &self.config
    }

    /// Create with default config and specified k
    pub fn with_k(k: usize) -> Self {
        Self::new(KNNConfig {
            n_neighbors: k,
            ..Default::default()
        })
    }

    /// Fit the regressor (stores training data)
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        if self.config.n_neighbors == 0 {
            return Err(ScorecastError::TrainingError("n_neighbors must be at least 1".to_string()));
        }
        if self.config.n_neighbors > x.nrows() {
            return Err(ScorecastError::TrainingError(format!(
                "n_neighbors ({}) exceeds the number of training samples ({})",
                self.config.n_neighbors,
                x.nrows()
            )));
        }
        self.x_train = Some(x.clone());
        self.y_train = Some(y.clone());
        Ok(())
    }

    /// Predict target values (parallelized over query rows)
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (x_train, y_train) = match (&self.x_train, &self.y_train) {
            (Some(x_train), Some(y_train)) => (x_train, y_train),
            _ => {
                return Err(ScorecastError::PredictionError(
                    "KNNRegressor is not fitted".to_string(),
                ))
            }
        };
        check_predict_input(x, x_train.ncols())?;

        let predictions: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let neighbors = find_k_nearest(
                    x.row(i),
                    x_train,
                    y_train,
                    self.config.n_neighbors,
                    self.config.metric,
                );
                weighted_mean_from(&neighbors, self.config.weights)
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }
}

impl Regressor for KNNRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        KNNRegressor::fit(self, x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        KNNRegressor::predict(self, x)
    }
}

/// Max-heap entry: distance, training row (breaks ties), target
#[derive(PartialEq)]
struct Neighbor(f64, usize, f64);

impl Eq for Neighbor {}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0).then(self.1.cmp(&other.1))
    }
}

fn compute_distance(a: ArrayView1<f64>, b: ArrayView1<f64>, metric: DistanceMetric) -> f64 {
    match metric {
        DistanceMetric::Euclidean => a
            .iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y).powi(2))
            .sum::<f64>()
            .sqrt(),
        DistanceMetric::Manhattan => a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum(),
    }
}

/// The k nearest training rows as `(distance, target)`; earlier rows win distance ties
fn find_k_nearest(
    point: ArrayView1<f64>,
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    k: usize,
    metric: DistanceMetric,
) -> Vec<(f64, f64)> {
    let mut heap = BinaryHeap::with_capacity(k + 1);

    for (i, row) in x_train.rows().into_iter().enumerate() {
        let candidate = Neighbor(compute_distance(point, row, metric), i, y_train[i]);
        if heap.len() < k {
            heap.push(candidate);
        } else if heap.peek().map_or(false, |top| candidate < *top) {
            heap.pop();
            heap.push(candidate);
        }
    }

    heap.into_iter().map(|Neighbor(d, _, y)| (d, y)).collect()
}

fn weighted_mean_from(neighbors: &[(f64, f64)], weights: WeightScheme) -> f64 {
    if neighbors.is_empty() {
        return 0.0;
    }
    match weights {
        WeightScheme::Uniform => {
            neighbors.iter().map(|(_, y)| y).sum::<f64>() / neighbors.len() as f64
        }
        WeightScheme::Distance => {
            // exact matches take all the weight
            let exact: Vec<f64> = neighbors
                .iter()
                .filter(|(d, _)| *d == 0.0)
                .map(|(_, y)| *y)
                .collect();
            if !exact.is_empty() {
                return exact.iter().sum::<f64>() / exact.len() as f64;
            }
            let (weighted, total) = neighbors
                .iter()
                .fold((0.0, 0.0), |(s, w), (d, y)| (s + y / d, w + 1.0 / d));
            weighted / total
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_uniform_average_of_neighbors() {
        let x = array![[0.0], [1.0], [2.0], [10.0], [11.0]];
        let y = array![1.0, 2.0, 3.0, 50.0, 60.0];

        let mut knn = KNNRegressor::with_k(3);
        knn.fit(&x, &y).unwrap();
        let predictions = knn.predict(&array![[1.0], [10.5]]).unwrap();
        assert!((predictions[0] - 2.0).abs() < 1e-12);
        // neighbours of 10.5: 10, 11 and 2
        assert!((predictions[1] - (50.0 + 60.0 + 3.0) / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_distance_weights_prefer_exact_match() {
        let x = array![[0.0], [1.0], [2.0]];
        let y = array![1.0, 2.0, 3.0];
        let mut knn = KNNRegressor::new(KNNConfig {
            n_neighbors: 2,
            weights: WeightScheme::Distance,
            ..Default::default()
        });
        knn.fit(&x, &y).unwrap();
        assert_eq!(knn.predict(&array![[2.0]]).unwrap()[0], 3.0);
    }

    #[test]
    fn test_k_larger_than_training_set() {
        let mut knn = KNNRegressor::with_k(5);
        assert!(knn.fit(&array![[0.0], [1.0]], &array![0.0, 1.0]).is_err());
    }

    #[test]
    fn test_unfitted_predict_fails() {
        assert!(KNNRegressor::with_k(1).predict(&array![[0.0]]).is_err());
    }
}
