//! Candidate catalog: algorithm tags, their grids and estimator construction

use super::adaboost::AdaBoostRegressor;
use super::catboost::{CatBoostConfig, CatBoostRegressor};
use super::decision_tree::{Criterion, DecisionTree};
use super::gradient_boosting::{GradientBoostingConfig, GradientBoostingRegressor};
use super::knn::{DistanceMetric, KNNConfig, KNNRegressor, WeightScheme};
use super::linear_models::LinearRegression;
use super::models::TrainedModel;
use super::random_forest::RandomForest;
use super::search::{ParamGrid, ParamSet};
use super::xgboost::{XGBoostConfig, XGBoostRegressor};
use crate::error::{Result, ScorecastError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported regression algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    RandomForest,
    DecisionTree,
    GradientBoosting,
    LinearRegression,
    KNeighbors,
    XGBoost,
    CatBoost,
    AdaBoost,
}

impl Algorithm {
    /// Parameters understood by [`Algorithm::build`]
    pub fn parameters(&self) -> &'static [&'static str] {
        match self {
            Algorithm::RandomForest => &["n_estimators", "max_depth", "criterion"],
            Algorithm::DecisionTree => &["criterion", "max_depth", "min_samples_leaf"],
            Algorithm::GradientBoosting => &["n_estimators", "learning_rate", "subsample", "max_depth"],
            Algorithm::LinearRegression => &["fit_intercept"],
            Algorithm::KNeighbors => &["n_neighbors", "weights", "metric"],
            Algorithm::XGBoost => &["n_estimators", "learning_rate", "max_depth", "reg_lambda", "subsample"],
            Algorithm::CatBoost => &["iterations", "learning_rate", "depth", "l2_leaf_reg"],
            Algorithm::AdaBoost => &["n_estimators", "learning_rate"],
        }
    }

    /// Fresh unfitted estimator for one configuration
    ///
    /// Missing parameters take the estimator defaults; unknown parameters and
    /// values of the wrong type fail with a training error.
    pub fn build(&self, params: &ParamSet, seed: u64) -> Result<TrainedModel> {
        params.ensure_known(&self.to_string(), self.parameters())?;

        let model = match self {
            Algorithm::RandomForest => {
                let criterion = Criterion::parse(params.str_or("criterion", "squared_error")?)?;
                let mut forest = RandomForest::new_regressor(params.usize_or("n_estimators", 100)?)
                    .with_criterion(criterion)
                    .with_random_state(seed);
                if params.get("max_depth").is_some() {
                    forest = forest.with_max_depth(params.usize_or("max_depth", 0)?);
                }
                TrainedModel::RandomForest(forest)
            }
            Algorithm::DecisionTree => {
                let criterion = Criterion::parse(params.str_or("criterion", "squared_error")?)?;
                let mut tree = DecisionTree::new_regressor()
                    .with_criterion(criterion)
                    .with_min_samples_leaf(params.usize_or("min_samples_leaf", 1)?)
                    .with_random_state(seed);
                if params.get("max_depth").is_some() {
                    tree = tree.with_max_depth(params.usize_or("max_depth", 0)?);
                }
                TrainedModel::DecisionTree(tree)
            }
            Algorithm::GradientBoosting => {
                let defaults = GradientBoostingConfig::default();
                TrainedModel::GradientBoosting(GradientBoostingRegressor::new(GradientBoostingConfig {
                    n_estimators: params.usize_or("n_estimators", defaults.n_estimators)?,
                    learning_rate: params.float_or("learning_rate", defaults.learning_rate)?,
                    subsample: params.float_or("subsample", defaults.subsample)?,
                    max_depth: params.usize_or("max_depth", defaults.max_depth)?,
                    random_state: seed,
                    ..defaults
                }))
            }
            Algorithm::LinearRegression => {
                let fit_intercept = match params.str_or("fit_intercept", "true")? {
                    "true" => true,
                    "false" => false,
                    other => {
                        return Err(ScorecastError::TrainingError(format!(
                            "fit_intercept must be 'true' or 'false', got '{}'",
                            other
                        )))
                    }
                };
                TrainedModel::LinearRegression(LinearRegression::new().with_fit_intercept(fit_intercept))
            }
            Algorithm::KNeighbors => {
                TrainedModel::KNeighbors(KNNRegressor::new(KNNConfig {
                    n_neighbors: params.usize_or("n_neighbors", 5)?,
                    metric: DistanceMetric::parse(params.str_or("metric", "euclidean")?)?,
                    weights: WeightScheme::parse(params.str_or("weights", "uniform")?)?,
                }))
            }
            Algorithm::XGBoost => {
                let defaults = XGBoostConfig::default();
                TrainedModel::XGBoost(XGBoostRegressor::new(XGBoostConfig {
                    n_estimators: params.usize_or("n_estimators", defaults.n_estimators)?,
                    learning_rate: params.float_or("learning_rate", defaults.learning_rate)?,
                    max_depth: params.usize_or("max_depth", defaults.max_depth)?,
                    reg_lambda: params.float_or("reg_lambda", defaults.reg_lambda)?,
                    subsample: params.float_or("subsample", defaults.subsample)?,
                    random_state: seed,
                    ..defaults
                }))
            }
            Algorithm::CatBoost => {
                let defaults = CatBoostConfig::default();
                TrainedModel::CatBoost(CatBoostRegressor::new(CatBoostConfig {
                    n_estimators: params.usize_or("iterations", defaults.n_estimators)?,
                    learning_rate: params.float_or("learning_rate", defaults.learning_rate)?,
                    max_depth: params.usize_or("depth", defaults.max_depth)?,
                    reg_lambda: params.float_or("l2_leaf_reg", defaults.reg_lambda)?,
                    random_state: seed,
                    ..defaults
                }))
            }
            Algorithm::AdaBoost => TrainedModel::AdaBoost(
                AdaBoostRegressor::default()
                    .with_n_estimators(params.usize_or("n_estimators", 50)?)
                    .with_learning_rate(params.float_or("learning_rate", 1.0)?)
                    .with_random_state(seed),
            ),
        };
        Ok(model)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Algorithm::RandomForest => "RandomForest",
            Algorithm::DecisionTree => "DecisionTree",
            Algorithm::GradientBoosting => "GradientBoosting",
            Algorithm::LinearRegression => "LinearRegression",
            Algorithm::KNeighbors => "KNeighbors",
            Algorithm::XGBoost => "XGBoost",
            Algorithm::CatBoost => "CatBoost",
            Algorithm::AdaBoost => "AdaBoost",
        };
        f.write_str(name)
    }
}

/// One catalog entry
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSpec {
    pub name: String,
    pub algorithm: Algorithm,
    pub grid: ParamGrid,
}

impl CandidateSpec {
    pub fn new(name: impl Into<String>, algorithm: Algorithm, grid: ParamGrid) -> Self {
        Self {
            name: name.into(),
            algorithm,
            grid,
        }
    }
}

/// The fixed candidate list, in tie-break precedence order
pub fn default_catalog() -> Vec<CandidateSpec> {
    vec![
        CandidateSpec::new(
            "Random Forest",
            Algorithm::RandomForest,
            ParamGrid::new().int_axis("n_estimators", &[8, 16, 32, 64, 128]),
        ),
        CandidateSpec::new(
            "Decision Tree",
            Algorithm::DecisionTree,
            ParamGrid::new().str_axis("criterion", &["squared_error", "friedman_mse", "absolute_error"]),
        ),
        CandidateSpec::new(
            "Gradient Boosting",
            Algorithm::GradientBoosting,
            ParamGrid::new()
                .float_axis("learning_rate", &[0.1, 0.05, 0.01])
                .float_axis("subsample", &[0.7, 0.8, 0.9])
                .int_axis("n_estimators", &[32, 64, 128]),
        ),
        CandidateSpec::new("Linear Regression", Algorithm::LinearRegression, ParamGrid::new()),
        CandidateSpec::new(
            "K Neighbors Regressor",
            Algorithm::KNeighbors,
            ParamGrid::new().int_axis("n_neighbors", &[5, 7, 9, 11]),
        ),
        CandidateSpec::new(
            "XGBoost Regressor",
            Algorithm::XGBoost,
            ParamGrid::new()
                .float_axis("learning_rate", &[0.1, 0.05, 0.01])
                .int_axis("n_estimators", &[32, 64, 128]),
        ),
        CandidateSpec::new(
            "CatBoost Regressor",
            Algorithm::CatBoost,
            ParamGrid::new()
                .int_axis("depth", &[4, 6])
                .float_axis("learning_rate", &[0.05, 0.1])
                .int_axis("iterations", &[30, 50, 100]),
        ),
        CandidateSpec::new(
            "AdaBoost Regressor",
            Algorithm::AdaBoost,
            ParamGrid::new()
                .float_axis("learning_rate", &[0.1, 0.5, 1.0])
                .int_axis("n_estimators", &[16, 32, 64]),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::search::ParameterValue;

    #[test]
    fn test_catalog_order_and_grids() {
        let catalog = default_catalog();
        let names: Vec<&str> = catalog.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Random Forest",
                "Decision Tree",
                "Gradient Boosting",
                "Linear Regression",
                "K Neighbors Regressor",
                "XGBoost Regressor",
                "CatBoost Regressor",
                "AdaBoost Regressor",
            ]
        );
        assert!(catalog[3].grid.is_empty());
        assert_eq!(catalog[2].grid.len(), 27);
    }

    #[test]
    fn test_every_grid_configuration_builds() {
        for spec in default_catalog() {
            for params in spec.grid.configurations() {
                let model = spec.algorithm.build(&params, 42).unwrap();
                assert_eq!(model.type_name(), spec.algorithm.to_string());
            }
        }
    }

    #[test]
    fn test_unknown_parameter_rejected() {
        let params = ParamSet::new().with("alpha", ParameterValue::Float(0.1));
        assert!(matches!(
            Algorithm::LinearRegression.build(&params, 0),
            Err(ScorecastError::TrainingError(_))
        ));
    }

    #[test]
    fn test_wrong_type_rejected() {
        let params = ParamSet::new().with("n_estimators", ParameterValue::String("many".to_string()));
        assert!(Algorithm::RandomForest.build(&params, 0).is_err());
    }

    #[test]
    fn test_unknown_criterion_rejected() {
        let params = ParamSet::new().with("criterion", ParameterValue::String("poisson".to_string()));
        assert!(Algorithm::DecisionTree.build(&params, 0).is_err());
    }

    #[test]
    fn test_unknown_string_options_rejected() {
        let cases = [
            (Algorithm::KNeighbors, "weights", "gaussian"),
            (Algorithm::KNeighbors, "metric", "cosine"),
            (Algorithm::LinearRegression, "fit_intercept", "yes"),
        ];
        for (algorithm, name, value) in cases {
            let params = ParamSet::new().with(name, ParameterValue::String(value.to_string()));
            assert!(
                matches!(algorithm.build(&params, 0), Err(ScorecastError::TrainingError(_))),
                "{}={} accepted",
                name,
                value
            );
        }
    }

    #[test]
    fn test_known_string_options_build() {
        let params = ParamSet::new()
            .with("weights", ParameterValue::String("distance".to_string()))
            .with("metric", ParameterValue::String("manhattan".to_string()));
        match Algorithm::KNeighbors.build(&params, 0).unwrap() {
            TrainedModel::KNeighbors(knn) => {
                assert_eq!(knn.config().weights, WeightScheme::Distance);
                assert_eq!(knn.config().metric, DistanceMetric::Manhattan);
            }
            other => panic!("unexpected model: {}", other.type_name()),
        }
        let params = ParamSet::new().with("fit_intercept", ParameterValue::String("false".to_string()));
        assert!(Algorithm::LinearRegression.build(&params, 0).is_ok());
    }
}
