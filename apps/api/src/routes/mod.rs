pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::auth;
use crate::discovery::handlers as discovery;
use crate::matching::handlers as matching;
use crate::moderation::handlers as moderation;
use crate::ontology::handlers as ontology;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Candidate-facing
        .route("/api/upload-resume", post(matching::handle_upload_resume))
        .route("/api/ontology", get(ontology::handle_get_ontology))
        // Discovery
        .route(
            "/api/trigger-ontology-update",
            post(discovery::handle_trigger_update),
        )
        .route(
            "/api/ontology-update-status",
            get(discovery::handle_update_status),
        )
        // Admin moderation
        .route("/api/admin/login", post(auth::handle_login))
        .route(
            "/api/admin/pending-updates",
            get(moderation::handle_pending_updates),
        )
        .route("/api/admin/review", post(moderation::handle_review))
        .with_state(state)
}
