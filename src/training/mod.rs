//! Model training
//!
//! Regression estimators implemented on `ndarray`, the candidate catalog,
//! cross-validated grid search and the [`ModelTrainer`] that selects and
//! persists the best model:
//! - Linear regression (normal equations)
//! - Decision trees and Random Forests
//! - Gradient boosting, XGBoost-style and CatBoost-style boosting
//! - K-Nearest Neighbors
//! - AdaBoost.R2

mod models;
pub mod adaboost;
pub mod catalog;
pub mod catboost;
pub mod cross_validation;
pub mod decision_tree;
pub mod evaluation;
pub mod gradient_boosting;
pub mod knn;
pub mod linear_models;
pub mod metrics;
pub mod random_forest;
pub mod search;
pub mod trainer;
pub mod xgboost;

pub use adaboost::AdaBoostRegressor;
pub use catalog::{default_catalog, Algorithm, CandidateSpec};
pub use catboost::{CatBoostConfig, CatBoostRegressor};
pub use cross_validation::{CVResults, CVSplit, KFold};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use evaluation::{evaluate_models, EvaluationEntry, EvaluationReport};
pub use gradient_boosting::{GradientBoostingConfig, GradientBoostingRegressor};
pub use knn::{DistanceMetric, KNNConfig, KNNRegressor, WeightScheme};
pub use linear_models::LinearRegression;
pub use metrics::r2_score;
pub use models::{check_fit_input, check_predict_input, Regressor, TrainedModel};
pub use random_forest::{MaxFeatures, RandomForest};
pub use search::{grid_search, GridSearchResult, ParamGrid, ParamSet, ParameterValue};
pub use trainer::{split_features_target, ModelArtifact, ModelTrainer, TrainingOutcome};
pub use xgboost::{XGBoostConfig, XGBoostRegressor};
