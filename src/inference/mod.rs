//! Inference
//!
//! - [`PredictPipeline`]: loads the persisted transformer and best model once,
//!   caches them behind a read-write lock and scores feature rows
//! - [`RequestRecord`]: validates raw named fields into a typed feature row

mod pipeline;
pub mod request;

pub use pipeline::{PredictPipeline, Predictor};
pub use request::RequestRecord;
