use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
        .route("/database", get(database_health))
}

pub async fn health_check(State(state): State<AppState>) -> impl axum::response::IntoResponse {
    let healthy = state.service().probe().await.is_ok();
    Json(serde_json::json!({
        "status": if healthy { "ok" } else { "degraded" },
        "uptimeSecs": state.uptime_secs(),
        "store": {
            "healthy": healthy,
        }
    }))
}

pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// Not ready while the store cannot answer within the store timeout.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.service().probe().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness probe failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

pub async fn database_health(State(state): State<AppState>) -> impl axum::response::IntoResponse {
    let start = Instant::now();
    let healthy = state.service().probe().await.is_ok();
    let latency_us = start.elapsed().as_micros() as u64;

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(serde_json::json!({
            "healthy": healthy,
            "latencyUs": latency_us,
        })),
    )
}
