//! Feature preprocessing
//!
//! Building blocks of the fitted feature transformer:
//! - Missing value imputation (median, most frequent)
//! - Standard scaling, with or without centering
//! - One-hot encoding of categorical columns

mod encoder;
mod imputer;
mod pipeline;
mod scaler;

pub use encoder::OneHotEncoder;
pub use imputer::{median, most_frequent};
pub use pipeline::{FeatureTransformer, NumericColumn};
pub use scaler::StandardScaler;
