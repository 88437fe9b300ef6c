//! Error types for the server

use crate::error::ScorecastError;
use axum::{
    extract::rejection::{FormRejection, JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Body of every failed request; details only reach the log
pub const GENERIC_MESSAGE: &str = "Something went wrong";

#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Pipeline(#[from] ScorecastError),

    #[error("Invalid form body: {0}")]
    Form(#[from] FormRejection),

    #[error("Invalid JSON body: {0}")]
    Json(#[from] JsonRejection),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match &self {
            ServerError::Pipeline(err) => {
                tracing::error!(kind = %err.kind(), detail = %err, "Prediction request failed")
            }
            other => tracing::error!(detail = %other, "Prediction request failed"),
        }

        let body = Json(json!({
            "error": true,
            "message": GENERIC_MESSAGE,
        }));

        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
