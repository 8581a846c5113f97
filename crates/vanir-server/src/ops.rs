//! Health and metrics listener, served on its own port so probes never
//! collide with vanity path resolution.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use tracing::error;
use vanir::Backend;

use crate::metrics::{Metrics, MetricsSnapshot};

const HEALTHZ_DEADLINE: Duration = Duration::from_secs(1);

/// Shared state of the ops listener.
pub struct OpsState {
    pub backend: Arc<dyn Backend>,
    pub metrics: Arc<Metrics>,
}

/// Build the ops router: `/healthz`, `/readyz`, `/metrics`.
pub fn router(state: Arc<OpsState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(healthz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

async fn healthz(State(state): State<Arc<OpsState>>) -> Response {
    match tokio::time::timeout(HEALTHZ_DEADLINE, state.backend.healthz()).await {
        Ok(Ok(())) => StatusCode::OK.into_response(),
        Ok(Err(err)) => {
            error!("health check failed: {err}");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
        Err(_) => {
            error!("health check timed out");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

async fn metrics(State(state): State<Arc<OpsState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
