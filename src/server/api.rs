//! API route definitions

use super::handlers;
use super::state::AppState;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self as axum_middleware, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::instrument::WithSubscriber;

async fn handle_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": true,
            "message": "Not found",
        })),
    )
}

/// Route every event of a request to the process logger
async fn with_logger(State(state): State<AppState>, request: Request, next: Next) -> Response {
    next.run(request)
        .with_subscriber(state.logger.dispatch().clone())
        .await
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/predictdata", post(handlers::predict_form))
        .route("/api/predict", post(handlers::predict_json))
        .fallback(handle_404)
        .layer(TraceLayer::new_for_http())
        .layer(axum_middleware::from_fn_with_state(state.clone(), with_logger))
        .with_state(state)
}
