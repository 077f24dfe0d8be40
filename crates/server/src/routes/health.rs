//! Health check endpoints.

use axum::{extract::State, http::StatusCode};

use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Requires a configured data store and, when a database pool is in use,
/// a reachable database. Returns 503 Service Unavailable otherwise.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    if !state.has_store() {
        tracing::warn!("Readiness: data store not configured");
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    if let Some(pool) = state.pool() {
        if let Err(err) = sqlx::query("SELECT 1").fetch_one(pool).await {
            tracing::warn!(error = %err, "Readiness: database unreachable");
            return StatusCode::SERVICE_UNAVAILABLE;
        }
    }
    StatusCode::OK
}
