//! HTTP façade around the prediction pipeline
//!
//! Routes:
//! - `GET /health`
//! - `POST /predictdata` (form-encoded fields)
//! - `POST /api/predict` (JSON object)
//!
//! Every failure answers 500 with one generic body.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::{ServerError, GENERIC_MESSAGE};
pub use handlers::PredictionResponse;
pub use state::AppState;

use crate::config::ServerConfig;
use std::net::SocketAddr;
use tracing::{info, warn};

/// Serve `state` until ctrl+c
pub async fn run_server(config: &ServerConfig, state: AppState) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();
    let logger = state.logger.clone();
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    logger.in_scope(|| {
        info!(
            address = %addr,
            pid = std::process::id(),
            started_at = %start_time.to_rfc3339(),
            "Server listening and ready to accept connections"
        )
    });

    let shutdown_logger = logger.clone();
    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            shutdown_logger.in_scope(|| warn!(error = %e, "Failed to listen for ctrl+c"));
            return std::future::pending::<()>().await;
        }
        let uptime = chrono::Utc::now().signed_duration_since(start_time);
        shutdown_logger.in_scope(|| {
            info!(
                uptime_secs = uptime.num_seconds(),
                "Shutdown signal received, stopping server gracefully"
            )
        });
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    logger.in_scope(|| info!("Server shut down cleanly"));
    Ok(())
}
