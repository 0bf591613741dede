use axum::{extract::State, Json};
use serde::Serialize;

use crate::errors::AppError;
use crate::ontology::models::{Role, Skill};
use crate::ontology::store;
use crate::state::AppState;

#[derive(Serialize)]
pub struct OntologyResponse {
    pub skills: Vec<Skill>,
    pub roles: Vec<Role>,
}

/// GET /api/ontology — the current active catalog.
pub async fn handle_get_ontology(
    State(state): State<AppState>,
) -> Result<Json<OntologyResponse>, AppError> {
    let snapshot = store::load_snapshot(&state.db).await?;
    let mut skills: Vec<Skill> = snapshot.active_skills().cloned().collect();
    skills.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Json(OntologyResponse {
        skills,
        roles: snapshot.roles,
    }))
}
