//! Liveness and readiness probes.

use axum::{extract::State, http::StatusCode, Json};

use crate::api::state::AppState;

/// Health check response.
#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Liveness probe handler.
///
/// Returns OK if the server is running. Used for Kubernetes liveness probe.
///
/// # Route
///
/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness check response.
#[derive(serde::Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub cache: &'static str,
}

/// Readiness probe handler.
///
/// Checks database and cache connectivity. Used for Kubernetes readiness probe.
///
/// # Route
///
/// `GET /ready`
pub async fn readiness_handler(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let db_ok = sqlx::query("SELECT 1").fetch_one(&state.db).await.is_ok();
    let cache_ok = state.cache.get().await.is_ok();

    let response = ReadinessResponse {
        status: if db_ok && cache_ok { "ok" } else { "degraded" },
        database: if db_ok { "connected" } else { "disconnected" },
        cache: if cache_ok {
            "connected"
        } else {
            "disconnected"
        },
    };

    if db_ok && cache_ok {
        Ok(Json(response))
    } else {
        tracing::warn!(db_ok, cache_ok, "Readiness check degraded");
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
