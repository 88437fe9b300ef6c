//! Regression tree (CART)

use super::models::{check_fit_input, check_predict_input, Regressor};
use crate::error::{Result, ScorecastError};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Decision tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf { value: f64, n_samples: usize },
    /// Internal node; rows with `x[feature_idx] <= threshold` go left
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

impl TreeNode {
    fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if row[*feature_idx] <= *threshold { left } else { right };
                }
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    fn n_leaves(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }
}

/// Split quality criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Criterion {
    /// Reduction of the sum of squared errors; leaves predict the mean
    SquaredError,
    /// Friedman's improvement score `n_l·n_r/n · (mean_l − mean_r)²`; leaves predict the mean
    FriedmanMse,
    /// Reduction of the sum of absolute deviations; leaves predict the median
    AbsoluteError,
}

impl Criterion {
    /// Parse the parameter spelling (`squared_error`, `friedman_mse`, `absolute_error`)
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "squared_error" => Ok(Criterion::SquaredError),
            "friedman_mse" => Ok(Criterion::FriedmanMse),
            "absolute_error" => Ok(Criterion::AbsoluteError),
            other => Err(ScorecastError::TrainingError(format!(
                "unknown split criterion '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct OrdF64(f64);

impl Eq for OrdF64 {}

impl PartialOrd for OrdF64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrdF64 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Running median and sum of absolute deviations from it
#[derive(Default)]
struct MedianTracker {
    lower: BinaryHeap<OrdF64>,
    upper: BinaryHeap<Reverse<OrdF64>>,
    lower_sum: f64,
    upper_sum: f64,
}

impl MedianTracker {
    fn push(&mut self, value: f64) {
        if self.lower.peek().map_or(true, |top| value <= top.0) {
            self.lower.push(OrdF64(value));
            self.lower_sum += value;
        } else {
            self.upper.push(Reverse(OrdF64(value)));
            self.upper_sum += value;
        }

        if self.lower.len() > self.upper.len() + 1 {
            if let Some(OrdF64(v)) = self.lower.pop() {
                self.lower_sum -= v;
                self.upper.push(Reverse(OrdF64(v)));
                self.upper_sum += v;
            }
        } else if self.upper.len() > self.lower.len() {
            if let Some(Reverse(OrdF64(v))) = self.upper.pop() {
                self.upper_sum -= v;
                self.lower.push(OrdF64(v));
                self.lower_sum += v;
            }
        }
    }

    fn median(&self) -> f64 {
        match (self.lower.peek(), self.upper.peek()) {
            (Some(lo), Some(Reverse(hi))) if self.lower.len() == self.upper.len() => {
                (lo.0 + hi.0) / 2.0
            }
            (Some(lo), _) => lo.0,
            _ => 0.0,
        }
    }

    fn abs_deviation(&self) -> f64 {
        let m = self.median();
        (m * self.lower.len() as f64 - self.lower_sum) + (self.upper_sum - m * self.upper.len() as f64)
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn median(values: &[f64]) -> f64 {
    let mut tracker = MedianTracker::default();
    values.iter().for_each(|&v| tracker.push(v));
    tracker.median()
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    improvement: f64,
}

/// Regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Tree root
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features drawn at every node; all features when `None`
    pub max_features: Option<usize>,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Seed of the per-node feature draw
    pub random_state: u64,
    /// Number of features
    n_features: usize,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new_regressor()
    }
}

impl DecisionTree {
    /// Create a new regressor tree
    pub fn new_regressor() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion: Criterion::SquaredError,
            random_state: 0,
            n_features: 0,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    /// Set number of features considered per split
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    /// Set criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Fit the tree to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_fit_input(x, y)?;
        self.n_features = x.ncols();

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let indices: Vec<usize> = (0..x.nrows()).collect();
        self.root = Some(self.build_tree(x, y, indices, 0, &mut rng));
        Ok(self)
    }

    fn leaf_value(&self, y_subset: &[f64]) -> f64 {
        match self.criterion {
            Criterion::AbsoluteError => median(y_subset),
            Criterion::SquaredError | Criterion::FriedmanMse => mean(y_subset),
        }
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: Vec<usize>,
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n_samples = indices.len();
        let y_subset: Vec<f64> = indices.iter().map(|&i| y[i]).collect();
        let min_leaf = self.min_samples_leaf.max(1);

        let is_pure = y_subset.windows(2).all(|w| w[0] == w[1]);
        let should_stop = n_samples < self.min_samples_split.max(2)
            || n_samples < 2 * min_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || is_pure;

        let split = if should_stop {
            None
        } else {
            self.find_best_split(x, y, &indices, rng)
        };

        match split {
            None => TreeNode::Leaf {
                value: self.leaf_value(&y_subset),
                n_samples,
            },
            Some(best) => {
                let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
                    .into_iter()
                    .partition(|&i| x[[i, best.feature]] <= best.threshold);

                let left = Box::new(self.build_tree(x, y, left_indices, depth + 1, rng));
                let right = Box::new(self.build_tree(x, y, right_indices, depth + 1, rng));

                TreeNode::Split {
                    feature_idx: best.feature,
                    threshold: best.threshold,
                    left,
                    right,
                    n_samples,
                }
            }
        }
    }

    fn candidate_features(&self, rng: &mut ChaCha8Rng) -> Vec<usize> {
        match self.max_features {
            Some(k) if k > 0 && k < self.n_features => {
                let mut features = sample(rng, self.n_features, k).into_vec();
                features.sort_unstable();
                features
            }
            _ => (0..self.n_features).collect(),
        }
    }

    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        rng: &mut ChaCha8Rng,
    ) -> Option<SplitCandidate> {
        let features = self.candidate_features(rng);

        // each feature independently finds its best split
        let per_feature: Vec<Option<SplitCandidate>> = features
            .par_iter()
            .map(|&feature| self.best_split_for_feature(x, y, indices, feature))
            .collect();

        // earliest feature wins ties
        per_feature.into_iter().flatten().fold(None, |best, candidate| match best {
            Some(b) if b.improvement >= candidate.improvement => Some(b),
            _ => Some(candidate),
        })
    }

    fn best_split_for_feature(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        feature: usize,
    ) -> Option<SplitCandidate> {
        let mut order: Vec<(f64, f64)> = indices.iter().map(|&i| (x[[i, feature]], y[i])).collect();
        order.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n = order.len();
        let min_leaf = self.min_samples_leaf.max(1);

        // prefix statistics; `gains[pos]` scores the split after sorted row `pos`
        let gains: Vec<f64> = match self.criterion {
            Criterion::SquaredError | Criterion::FriedmanMse => {
                let total: f64 = order.iter().map(|(_, yi)| yi).sum();
                let mut left_sum = 0.0;
                order[..n - 1]
                    .iter()
                    .enumerate()
                    .map(|(pos, &(_, yi))| {
                        left_sum += yi;
                        let n_left = (pos + 1) as f64;
                        let n_right = (n - pos - 1) as f64;
                        let right_sum = total - left_sum;
                        match self.criterion {
                            Criterion::FriedmanMse => {
                                let diff = left_sum / n_left - right_sum / n_right;
                                n_left * n_right / n as f64 * diff * diff
                            }
                            _ => {
                                left_sum * left_sum / n_left + right_sum * right_sum / n_right
                                    - total * total / n as f64
                            }
                        }
                    })
                    .collect()
            }
            Criterion::AbsoluteError => {
                let mut forward = MedianTracker::default();
                let left_dev: Vec<f64> = order[..n - 1]
                    .iter()
                    .map(|&(_, yi)| {
                        forward.push(yi);
                        forward.abs_deviation()
                    })
                    .collect();
                forward.push(order[n - 1].1);
                let parent_dev = forward.abs_deviation();

                let mut backward = MedianTracker::default();
                let mut right_dev = vec![0.0; n - 1];
                for pos in (0..n - 1).rev() {
                    backward.push(order[pos + 1].1);
                    right_dev[pos] = backward.abs_deviation();
                }

                left_dev
                    .iter()
                    .zip(right_dev.iter())
                    .map(|(l, r)| parent_dev - l - r)
                    .collect()
            }
        };

        let mut best: Option<SplitCandidate> = None;
        for (pos, &gain) in gains.iter().enumerate() {
            let n_left = pos + 1;
            let (lo, hi) = (order[pos].0, order[pos + 1].0);
            if lo == hi || n_left < min_leaf || n - n_left < min_leaf {
                continue;
            }
            if gain > 1e-12 && best.map_or(true, |b| gain > b.improvement) {
                let mid = lo + (hi - lo) / 2.0;
                let threshold = if mid >= hi { lo } else { mid };
                best = Some(SplitCandidate {
                    feature,
                    threshold,
                    improvement: gain,
                });
            }
        }
        best
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or_else(|| {
            ScorecastError::PredictionError("DecisionTree is not fitted".to_string())
        })?;
        check_predict_input(x, self.n_features)?;

        Ok(x.rows().into_iter().map(|row| root.predict_row(row)).collect())
    }

    /// Get tree depth
    pub fn get_depth(&self) -> usize {
        self.root.as_ref().map_or(0, TreeNode::depth)
    }

    /// Get number of leaves
    pub fn get_n_leaves(&self) -> usize {
        self.root.as_ref().map_or(0, TreeNode::n_leaves)
    }
}

impl Regressor for DecisionTree {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        DecisionTree::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        DecisionTree::predict(self, x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_regressor_fits_training_data() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0];

        let mut tree = DecisionTree::new_regressor();
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_max_depth() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]];
        let y = array![0.0, 1.0, 2.0, 3.0];

        let mut tree = DecisionTree::new_regressor().with_max_depth(1);
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.get_depth(), 2);
        assert_eq!(tree.get_n_leaves(), 2);
        // one split: means of the two halves
        assert_eq!(tree.predict(&x).unwrap(), array![0.5, 0.5, 2.5, 2.5]);
    }

    #[test]
    fn test_picks_informative_feature() {
        let x = array![[0.0, 5.0], [0.0, 1.0], [1.0, 4.0], [1.0, 2.0]];
        let y = array![10.0, 10.0, 20.0, 20.0];

        let mut tree = DecisionTree::new_regressor().with_max_depth(1);
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_absolute_error_uses_median_leaves() {
        let x = array![[1.0], [1.0], [1.0]];
        let y = array![1.0, 2.0, 10.0];

        let mut tree = DecisionTree::new_regressor().with_criterion(Criterion::AbsoluteError);
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.predict(&array![[1.0]]).unwrap()[0], 2.0);
    }

    #[test]
    fn test_criteria_agree_on_clean_step() {
        let x = array![[1.0], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let y = array![1.0, 1.0, 1.0, 5.0, 5.0, 5.0];
        for criterion in [Criterion::SquaredError, Criterion::FriedmanMse, Criterion::AbsoluteError] {
            let mut tree = DecisionTree::new_regressor().with_criterion(criterion);
            tree.fit(&x, &y).unwrap();
            assert_eq!(tree.predict(&array![[2.5], [9.0]]).unwrap(), array![1.0, 5.0]);
        }
    }

    #[test]
    fn test_median_tracker() {
        let mut tracker = MedianTracker::default();
        for v in [5.0, 1.0, 3.0] {
            tracker.push(v);
        }
        assert_eq!(tracker.median(), 3.0);
        assert_eq!(tracker.abs_deviation(), 4.0);
        tracker.push(7.0);
        assert_eq!(tracker.median(), 4.0);
        assert_eq!(tracker.abs_deviation(), 8.0);
    }

    #[test]
    fn test_parse_criterion() {
        assert_eq!(Criterion::parse("friedman_mse").unwrap(), Criterion::FriedmanMse);
        assert!(Criterion::parse("poisson").is_err());
    }

    #[test]
    fn test_predict_wrong_width() {
        let mut tree = DecisionTree::new_regressor();
        tree.fit(&array![[1.0], [2.0]], &array![1.0, 2.0]).unwrap();
        assert!(tree.predict(&array![[1.0, 2.0]]).is_err());
    }
}
