use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::moderation::models::{PendingUpdate, ReviewRequest};
use crate::moderation::queue;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PendingFilter {
    /// "skill" | "role" | "review_obsolete"
    pub kind: Option<String>,
}

#[derive(Serialize)]
pub struct PendingUpdatesResponse {
    pub pending_updates: Vec<PendingUpdate>,
}

/// GET /api/admin/pending-updates
pub async fn handle_pending_updates(
    State(state): State<AppState>,
    Query(filter): Query<PendingFilter>,
) -> Result<Json<PendingUpdatesResponse>, AppError> {
    let pending_updates = queue::list_pending(&state.db, filter.kind.as_deref()).await?;
    Ok(Json(PendingUpdatesResponse { pending_updates }))
}

/// POST /api/admin/review
pub async fn handle_review(
    State(state): State<AppState>,
    Json(req): Json<ReviewRequest>,
) -> Result<Json<Value>, AppError> {
    queue::review(&state.db, req.update_id, req.decision, &req.reviewer_name).await?;
    Ok(Json(json!({ "success": true })))
}
