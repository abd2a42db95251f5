//! Service-level handlers: statistics, health, metrics, root and the
//! unknown-route fallback.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::warn;

use super::error::ApiError;
use super::response::ApiResponse;
use super::AppState;
use crate::domain::StatsSnapshot;

pub const SERVICE_NAME: &str = "Intelligence Unit API";

/// GET /stats
pub async fn stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<StatsSnapshot>>, ApiError> {
    let snapshot = state.aggregator.snapshot().await?;
    Ok(ApiResponse::ok("Intelligence Unit Statistics", snapshot))
}

/// Store connectivity as reported by `/health`.
#[derive(Debug, Serialize)]
pub struct DatabaseHealth {
    /// "connected" or "disconnected".
    pub status: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// "healthy" or "degraded".
    pub status: &'static str,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub service: &'static str,
    pub version: &'static str,
    pub environment: &'static str,
    pub database: DatabaseHealth,
}

/// GET /health: 200 when the store answers a ping, 503 otherwise.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let ping = state.store.ping().await;
    let healthy = ping.is_ok();
    if let Err(e) = &ping {
        warn!(error = %e, "Health check: store unreachable");
    }

    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" },
        message: if healthy {
            format!("{SERVICE_NAME} is healthy")
        } else {
            format!("{SERVICE_NAME} is degraded: report store unreachable")
        },
        timestamp: Utc::now(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        environment: state.environment.as_str(),
        database: DatabaseHealth {
            status: if healthy { "connected" } else { "disconnected" },
            kind: state.store.backend_name(),
            error: ping.err().map(|e| e.to_string()),
        },
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

/// GET /metrics in Prometheus text format.
pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let body = state
        .metrics
        .render()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}

/// GET /
pub async fn root() -> Json<Value> {
    Json(json!({
        "name": SERVICE_NAME,
        "message": format!("{SERVICE_NAME} is operational"),
        "status": "operational",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/reports",
            "/reports/high",
            "/reports/:id",
            "/reports/:id/confirm",
            "/reports/agent/:fieldCode",
            "/stats",
            "/health",
            "/metrics",
        ],
    }))
}

pub async fn not_found() -> ApiError {
    ApiError::RouteNotFound
}
