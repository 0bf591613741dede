use std::time::Duration;

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::discovery::job::{self, DiscoveryStatus};
use crate::errors::AppError;
use crate::state::AppState;

/// POST /api/trigger-ontology-update
///
/// Spawns the Discovery Job and returns immediately; callers follow progress
/// via `GET /api/ontology-update-status` and then re-poll the pending queue.
pub async fn handle_trigger_update(
    State(state): State<AppState>,
) -> Result<Json<Value>, AppError> {
    // Claiming the slot and observing it free is one atomic step; a losing
    // concurrent trigger gets the already-running response and spawns nothing.
    if !job::try_begin(&state.discovery_status).await {
        return Ok(Json(json!({
            "success": true,
            "detail": "Ontology update already running"
        })));
    }

    let timeout = Duration::from_secs(state.config.discovery_timeout_secs);
    tokio::spawn(job::run_and_publish(
        state.db.clone(),
        state.signal_source.clone(),
        timeout,
        state.discovery_status.clone(),
    ));

    Ok(Json(json!({
        "success": true,
        "detail": "Ontology update triggered"
    })))
}

/// GET /api/ontology-update-status
pub async fn handle_update_status(
    State(state): State<AppState>,
) -> Result<Json<DiscoveryStatus>, AppError> {
    let status = state.discovery_status.read().await;
    Ok(Json(status.clone()))
}
