//! Health check route
//!
//! | Path | Method | Meaning |
//! |------|--------|---------|
//! | /health | GET | Service and storage backend status |
//!
//! ```json
//! {
//!   "status": "healthy",
//!   "version": "0.1.0",
//!   "uptime_seconds": 12,
//!   "backend": { "name": "redb", "status": "ok", "latency_ms": 0 }
//! }
//! ```

use std::time::{Instant, SystemTime};

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// healthy | degraded
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub backend: BackendCheck,
}

#[derive(Debug, Serialize)]
pub struct BackendCheck {
    pub name: &'static str,
    /// ok | error
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

static START_TIME: std::sync::OnceLock<SystemTime> = std::sync::OnceLock::new();

/// Record the process start time
pub fn mark_started() {
    START_TIME.get_or_init(SystemTime::now);
}

fn get_uptime_seconds() -> u64 {
    let start = START_TIME.get_or_init(SystemTime::now);
    SystemTime::now()
        .duration_since(*start)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Health check with a backend round trip
///
/// Answers 503 when the backend does not respond within the request timeout.
pub async fn health(State(state): State<ServerState>) -> (StatusCode, Json<HealthResponse>) {
    let ctx = state.op_context();
    let backend = state.store.backend().clone();

    let started = Instant::now();
    let check = match ctx.run(backend.ping()).await {
        Ok(()) => BackendCheck {
            name: backend.name(),
            status: "ok",
            latency_ms: Some(started.elapsed().as_millis() as u64),
            message: None,
        },
        Err(e) => {
            tracing::warn!(backend = backend.name(), error = %e, "Health check failed");
            BackendCheck {
                name: backend.name(),
                status: "error",
                latency_ms: None,
                message: Some(e.to_string()),
            }
        }
    };

    let healthy = check.status == "ok";
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if healthy { "healthy" } else { "degraded" },
            version: env!("CARGO_PKG_VERSION"),
            uptime_seconds: get_uptime_seconds(),
            backend: check,
        }),
    )
}
