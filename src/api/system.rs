use axum::{Json, extract::State};
use std::sync::Arc;

use super::types::HealthResponse;
use super::{ApiError, AppState};

/// GET /health
/// Liveness plus a database round-trip
pub async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, ApiError> {
    state
        .store()
        .ping()
        .await
        .map_err(|e| ApiError::internal(format!("Database ping failed: {e}")))?;

    Ok(Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.start_time.elapsed().as_secs(),
    }))
}
