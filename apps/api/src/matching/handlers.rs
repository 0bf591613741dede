use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::matching::extract::extract_skills;
use crate::matching::scoring::{score_catalog, MatchResult};
use crate::ontology::store;
use crate::state::AppState;

/// The original dashboard shows at most the top matches.
const MAX_MATCHES: usize = 10;

#[derive(Serialize)]
pub struct UploadResumeResponse {
    pub success: bool,
    pub user_skills: Vec<String>,
    pub career_matches: Vec<MatchResult>,
    pub analysis_id: Uuid,
}

/// POST /api/upload-resume
///
/// Multipart upload → extracted skill names + ranked career matches. The
/// catalog is read as one snapshot, so a concurrent approval is either fully
/// visible or not at all.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResumeResponse>, AppError> {
    let mut upload: Option<(String, Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("resume").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {e}")))?;
            upload = Some((filename, bytes));
        }
    }
    let (filename, bytes) =
        upload.ok_or_else(|| AppError::BadRequest("Missing 'file' field".to_string()))?;

    let text = state.extractor.extract_text(&filename, &bytes)?;
    if text.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Could not extract text from file".to_string(),
        ));
    }

    let snapshot = store::load_snapshot(&state.db).await?;
    let skill_ids = extract_skills(&text, &snapshot);
    if skill_ids.is_empty() {
        return Err(AppError::BadRequest(
            "No recognizable skills found in resume".to_string(),
        ));
    }

    let mut user_skills: Vec<String> = skill_ids
        .iter()
        .filter_map(|id| snapshot.skill(*id).map(|s| s.name.clone()))
        .collect();
    user_skills.sort();

    let mut career_matches = score_catalog(&snapshot, &skill_ids, state.resources.as_ref());
    career_matches.truncate(MAX_MATCHES);

    // Audit trail of analyses, mirroring what the dashboard history reads.
    let analysis_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO resume_analyses (id, filename, user_skills, career_matches)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(analysis_id)
    .bind(&filename)
    .bind(&user_skills)
    .bind(serde_json::to_value(&career_matches).unwrap_or_default())
    .execute(&state.db)
    .await?;

    Ok(Json(UploadResumeResponse {
        success: true,
        user_skills,
        career_matches,
        analysis_id,
    }))
}
