//! Request handlers

use super::error::{Result, ServerError};
use super::state::AppState;
use crate::error::ScorecastError;
use crate::inference::RequestRecord;
use axum::{
    extract::{rejection::{FormRejection, JsonRejection}, State},
    Form, Json,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub prediction: f64,
}

pub async fn health_check() -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Form-encoded prediction request
pub async fn predict_form(
    State(state): State<AppState>,
    form: std::result::Result<Form<HashMap<String, String>>, FormRejection>,
) -> Result<Json<PredictionResponse>> {
    let Form(fields) = form?;
    predict_fields(state, fields).await
}

/// JSON prediction request: an object of string or number fields
pub async fn predict_json(
    State(state): State<AppState>,
    body: std::result::Result<Json<HashMap<String, Value>>, JsonRejection>,
) -> Result<Json<PredictionResponse>> {
    let Json(raw) = body?;
    let fields = raw
        .into_iter()
        .map(|(name, value)| match value {
            Value::String(s) => Ok((name, s)),
            Value::Number(n) => Ok((name, n.to_string())),
            other => Err(ScorecastError::RequestValidationError(format!(
                "field '{}' must be a string or a number, got {}",
                name, other
            ))),
        })
        .collect::<std::result::Result<HashMap<_, _>, _>>()?;
    predict_fields(state, fields).await
}

async fn predict_fields(state: AppState, fields: HashMap<String, String>) -> Result<Json<PredictionResponse>> {
    let record = RequestRecord::from_fields(&fields)?;
    let pipeline = state.pipeline.clone();

    // model scoring is CPU-bound
    let predictions = tokio::task::spawn_blocking(move || {
        pipeline.predict(std::slice::from_ref(record.features()))
    })
    .await
    .map_err(|e| ServerError::Internal(e.to_string()))??;

    let prediction = predictions.first().copied().ok_or_else(|| {
        ScorecastError::PredictionError("model returned no prediction".to_string())
    })?;
    info!(prediction, "Served prediction");
    Ok(Json(PredictionResponse { prediction }))
}
