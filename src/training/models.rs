//! Estimator trait and the serializable union of fitted models

use super::adaboost::AdaBoostRegressor;
use super::catboost::CatBoostRegressor;
use super::decision_tree::DecisionTree;
use super::gradient_boosting::GradientBoostingRegressor;
use super::knn::KNNRegressor;
use super::linear_models::LinearRegression;
use super::random_forest::RandomForest;
use super::xgboost::XGBoostRegressor;
use crate::error::{Result, ScorecastError};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Trait for regression estimators
pub trait Regressor: Send + Sync {
    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Make predictions
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;
}

/// Reject empty inputs and row-count mismatches before fitting
pub fn check_fit_input(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(ScorecastError::TrainingError(format!(
            "cannot fit on an empty matrix ({}x{})",
            x.nrows(),
            x.ncols()
        )));
    }
    if x.nrows() != y.len() {
        return Err(ScorecastError::TrainingError(format!(
            "x has {} rows but y has {} values",
            x.nrows(),
            y.len()
        )));
    }
    Ok(())
}

/// Reject prediction inputs whose width differs from the fitted width
pub fn check_predict_input(x: &Array2<f64>, n_features: usize) -> Result<()> {
    if x.ncols() != n_features {
        return Err(ScorecastError::PredictionError(format!(
            "expected {} features, got {}",
            n_features,
            x.ncols()
        )));
    }
    Ok(())
}

/// Any fitted catalog estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrainedModel {
    RandomForest(RandomForest),
    DecisionTree(DecisionTree),
    GradientBoosting(GradientBoostingRegressor),
    LinearRegression(LinearRegression),
    KNeighbors(KNNRegressor),
    XGBoost(XGBoostRegressor),
    CatBoost(CatBoostRegressor),
    AdaBoost(AdaBoostRegressor),
}

impl TrainedModel {
    fn as_regressor(&self) -> &dyn Regressor {
        match self {
            TrainedModel::RandomForest(m) => m,
            TrainedModel::DecisionTree(m) => m,
            TrainedModel::GradientBoosting(m) => m,
            TrainedModel::LinearRegression(m) => m,
            TrainedModel::KNeighbors(m) => m,
            TrainedModel::XGBoost(m) => m,
            TrainedModel::CatBoost(m) => m,
            TrainedModel::AdaBoost(m) => m,
        }
    }

    fn as_regressor_mut(&mut self) -> &mut dyn Regressor {
        match self {
            TrainedModel::RandomForest(m) => m,
            TrainedModel::DecisionTree(m) => m,
            TrainedModel::GradientBoosting(m) => m,
            TrainedModel::LinearRegression(m) => m,
            TrainedModel::KNeighbors(m) => m,
            TrainedModel::XGBoost(m) => m,
            TrainedModel::CatBoost(m) => m,
            TrainedModel::AdaBoost(m) => m,
        }
    }

    /// Short name of the estimator type
    pub fn type_name(&self) -> &'static str {
        match self {
            TrainedModel::RandomForest(_) => "RandomForest",
            TrainedModel::DecisionTree(_) => "DecisionTree",
            TrainedModel::GradientBoosting(_) => "GradientBoosting",
            TrainedModel::LinearRegression(_) => "LinearRegression",
            TrainedModel::KNeighbors(_) => "KNeighbors",
            TrainedModel::XGBoost(_) => "XGBoost",
            TrainedModel::CatBoost(_) => "CatBoost",
            TrainedModel::AdaBoost(_) => "AdaBoost",
        }
    }
}

impl Regressor for TrainedModel {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.as_regressor_mut().fit(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.as_regressor().predict(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fit_input_checks() {
        let x = Array2::<f64>::zeros((3, 2));
        assert!(check_fit_input(&x, &Array1::zeros(3)).is_ok());
        assert!(matches!(
            check_fit_input(&x, &Array1::zeros(2)),
            Err(ScorecastError::TrainingError(_))
        ));
        assert!(check_fit_input(&Array2::zeros((0, 2)), &Array1::zeros(0)).is_err());
    }

    #[test]
    fn test_predict_input_checks() {
        let x = Array2::<f64>::zeros((1, 4));
        assert!(check_predict_input(&x, 4).is_ok());
        assert!(matches!(
            check_predict_input(&x, 3),
            Err(ScorecastError::PredictionError(_))
        ));
    }

    #[test]
    fn test_trained_model_dispatch() {
        let x = array![[1.0, 0.0], [2.0, 1.0], [3.0, 0.0], [4.0, 1.0]];
        let y = array![2.0, 7.0, 6.0, 11.0];
        let mut model = TrainedModel::LinearRegression(LinearRegression::new());
        model.fit(&x, &y).unwrap();
        let preds = model.predict(&x).unwrap();
        for (p, t) in preds.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-6);
        }
        assert_eq!(model.type_name(), "LinearRegression");

        let bytes = bincode::serialize(&model).unwrap();
        let back: TrainedModel = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, model);
    }
}
