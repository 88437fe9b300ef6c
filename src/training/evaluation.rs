//! Candidate evaluation: grid search, refit and held-out scoring

use super::catalog::CandidateSpec;
use super::cross_validation::KFold;
use super::metrics::r2_score;
use super::models::{Regressor, TrainedModel};
use super::search::{grid_search, ParamSet};
use crate::error::{ErrorContext, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Scores of one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationEntry {
    pub name: String,
    /// Configuration chosen by the grid search
    pub params: ParamSet,
    /// Mean cross-validated R² of `params`
    pub cv_score: f64,
    pub train_r2: f64,
    pub test_r2: f64,
}

/// Per-candidate scores in catalog order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub entries: Vec<EvaluationEntry>,
}

impl EvaluationReport {
    pub fn get(&self, name: &str) -> Option<&EvaluationEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Earliest entry with the highest test R²
    pub fn best(&self) -> Option<&EvaluationEntry> {
        self.entries.iter().fold(None, |best: Option<&EvaluationEntry>, entry| match best {
            Some(b) if !(entry.test_r2 > b.test_r2) => Some(b),
            _ if entry.test_r2.is_nan() => best,
            _ => Some(entry),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Held-out data and search settings shared by every candidate
pub struct EvaluationData<'a> {
    pub x_train: &'a Array2<f64>,
    pub y_train: &'a Array1<f64>,
    pub x_test: &'a Array2<f64>,
    pub y_test: &'a Array1<f64>,
    pub folds: KFold,
    pub seed: u64,
}

/// Search, refit on the full train set and score one candidate
pub fn evaluate_candidate(
    spec: &CandidateSpec,
    data: &EvaluationData<'_>,
) -> Result<(EvaluationEntry, TrainedModel)> {
    let search = grid_search(&spec.grid, data.x_train, data.y_train, &data.folds, |params| {
        spec.algorithm.build(params, data.seed)
    })
    .context(format!("grid search for {}", spec.name))?;

    let mut model = spec.algorithm.build(&search.best_params, data.seed)?;
    model
        .fit(data.x_train, data.y_train)
        .context(format!("fit {}", spec.name))?;

    let train_pred = model.predict(data.x_train)?;
    let test_pred = model.predict(data.x_test)?;

    let entry = EvaluationEntry {
        name: spec.name.clone(),
        params: search.best_params,
        cv_score: search.best_score,
        train_r2: r2_score(data.y_train.view(), train_pred.view()),
        test_r2: r2_score(data.y_test.view(), test_pred.view()),
    };
    Ok((entry, model))
}

/// Evaluate every candidate in order; the first failure aborts
pub fn evaluate_models(
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    x_test: &Array2<f64>,
    y_test: &Array1<f64>,
    candidates: &[CandidateSpec],
    cv_folds: usize,
    seed: u64,
) -> Result<EvaluationReport> {
    let data = EvaluationData {
        x_train,
        y_train,
        x_test,
        y_test,
        folds: KFold::new(cv_folds),
        seed,
    };
    let entries = candidates
        .iter()
        .map(|spec| evaluate_candidate(spec, &data).map(|(entry, _)| entry))
        .collect::<Result<Vec<_>>>()?;
    Ok(EvaluationReport { entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::training::catalog::Algorithm;
    use crate::training::search::ParamGrid;

    fn linear_data(n: usize, offset: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 2), |(i, j)| (((i + offset) * (j + 3) * 7) % 19) as f64);
        let y = x.column(0).mapv(|v| 2.0 * v) + x.column(1).mapv(|v| 3.0 * v);
        (x, y)
    }

    #[test]
    fn test_report_keeps_catalog_order() {
        let (x_train, y_train) = linear_data(30, 0);
        let (x_test, y_test) = linear_data(10, 5);
        let candidates = vec![
            CandidateSpec::new(
                "Decision Tree",
                Algorithm::DecisionTree,
                ParamGrid::new().str_axis("criterion", &["squared_error", "friedman_mse"]),
            ),
            CandidateSpec::new("Linear Regression", Algorithm::LinearRegression, ParamGrid::new()),
        ];

        let report =
            evaluate_models(&x_train, &y_train, &x_test, &y_test, &candidates, 3, 42).unwrap();
        assert_eq!(report.len(), 2);
        assert_eq!(report.entries[0].name, "Decision Tree");
        assert_eq!(report.entries[1].name, "Linear Regression");

        let linear = report.get("Linear Regression").unwrap();
        assert!(linear.test_r2 > 0.999);
        assert!(linear.train_r2 > 0.999);
        assert!(linear.params.is_empty());
        assert_eq!(report.best().unwrap().name, "Linear Regression");
    }

    #[test]
    fn test_best_prefers_earliest_on_ties() {
        let entry = |name: &str, score: f64| EvaluationEntry {
            name: name.to_string(),
            params: ParamSet::new(),
            cv_score: score,
            train_r2: score,
            test_r2: score,
        };
        let report = EvaluationReport {
            entries: vec![entry("a", 0.5), entry("b", 0.8), entry("c", 0.8), entry("d", f64::NAN)],
        };
        assert_eq!(report.best().unwrap().name, "b");
    }

    #[test]
    fn test_oversized_neighbourhood_is_skipped() {
        let (x_train, y_train) = linear_data(9, 0);
        let (x_test, y_test) = linear_data(3, 1);
        // 6 rows per training fold cannot serve 11 neighbours; 3 still can
        let candidates = vec![CandidateSpec::new(
            "K Neighbors Regressor",
            Algorithm::KNeighbors,
            ParamGrid::new().int_axis("n_neighbors", &[11, 3]),
        )];
        let report =
            evaluate_models(&x_train, &y_train, &x_test, &y_test, &candidates, 3, 42).unwrap();
        let entry = report.get("K Neighbors Regressor").unwrap();
        assert_eq!(entry.params.usize_or("n_neighbors", 0).unwrap(), 3);
        assert!(entry.cv_score.is_finite());
    }

    #[test]
    fn test_candidate_without_working_configuration_aborts() {
        let (x_train, y_train) = linear_data(9, 0);
        let (x_test, y_test) = linear_data(3, 1);
        let candidates = vec![
            CandidateSpec::new("Linear Regression", Algorithm::LinearRegression, ParamGrid::new()),
            CandidateSpec::new(
                "K Neighbors Regressor",
                Algorithm::KNeighbors,
                ParamGrid::new().int_axis("n_neighbors", &[11]),
            ),
        ];
        let err = evaluate_models(&x_train, &y_train, &x_test, &y_test, &candidates, 3, 42)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Training);
        assert_eq!(err.operations(), vec!["grid search for K Neighbors Regressor"]);
    }
}
