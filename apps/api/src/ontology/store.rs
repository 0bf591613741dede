use std::collections::HashMap;

use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::errors::{is_unique_violation, AppError};
use crate::moderation::models::{
    ObsolescenceProposal, PendingUpdate, RoleProposal, SkillProposal, UpdatePayload,
};
use crate::ontology::models::{
    normalize_alias, CatalogSnapshot, Role, Skill, SkillRequirement, SkillStatus,
};

#[derive(Debug, sqlx::FromRow)]
struct SkillRow {
    id: Uuid,
    name: String,
    skill_type: String,
    status: String,
    learning_resources: Vec<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct RoleRow {
    id: Uuid,
    title: String,
    description: String,
    salary_low: i64,
    salary_high: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct RequirementRow {
    role_id: Uuid,
    skill_id: Uuid,
    weight: f64,
    name: String,
}

/// Loads a consistent point-in-time catalog snapshot in a single transaction.
/// Scoring reads this; it never sees a partially-applied commit.
pub async fn load_snapshot(pool: &PgPool) -> Result<CatalogSnapshot, AppError> {
    let mut tx = pool.begin().await?;

    let skill_rows: Vec<SkillRow> = sqlx::query_as(
        "SELECT id, name, skill_type, status, learning_resources
         FROM skills WHERE status = 'active'",
    )
    .fetch_all(&mut *tx)
    .await?;

    let alias_rows: Vec<(String, String, Uuid)> =
        sqlx::query_as("SELECT alias, display, skill_id FROM skill_aliases")
            .fetch_all(&mut *tx)
            .await?;

    let role_rows: Vec<RoleRow> = sqlx::query_as(
        "SELECT id, title, description, salary_low, salary_high FROM roles ORDER BY id",
    )
    .fetch_all(&mut *tx)
    .await?;

    let req_rows: Vec<RequirementRow> = sqlx::query_as(
        "SELECT rr.role_id, rr.skill_id, rr.weight, s.name
         FROM role_requirements rr
         JOIN skills s ON s.id = rr.skill_id
         ORDER BY rr.role_id, rr.position",
    )
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;

    // Aliases keep their submitted display form; the normalized key only
    // drops the row duplicating the canonical name.
    let mut aliases_by_skill: HashMap<Uuid, Vec<(String, String)>> = HashMap::new();
    for (alias, display, skill_id) in alias_rows {
        aliases_by_skill
            .entry(skill_id)
            .or_default()
            .push((alias, display));
    }

    let skills: Vec<Skill> = skill_rows
        .into_iter()
        .map(|row| {
            let canonical = normalize_alias(&row.name);
            let aliases = aliases_by_skill
                .remove(&row.id)
                .unwrap_or_default()
                .into_iter()
                .filter(|(key, _)| *key != canonical)
                .map(|(_, display)| display)
                .collect();
            Skill {
                id: row.id,
                name: row.name,
                skill_type: row.skill_type,
                status: SkillStatus::from_str(&row.status),
                aliases,
                learning_resources: row.learning_resources,
            }
        })
        .collect();

    let mut reqs_by_role: HashMap<Uuid, Vec<SkillRequirement>> = HashMap::new();
    for row in req_rows {
        reqs_by_role
            .entry(row.role_id)
            .or_default()
            .push(SkillRequirement {
                skill_id: row.skill_id,
                skill: row.name,
                weight: row.weight,
            });
    }

    let roles = role_rows
        .into_iter()
        .map(|row| Role {
            requirements: reqs_by_role.remove(&row.id).unwrap_or_default(),
            id: row.id,
            title: row.title,
            description: row.description,
            salary_range: (row.salary_low, row.salary_high),
        })
        .collect();

    Ok(CatalogSnapshot::new(skills, roles))
}

/// Applies an approved moderation item inside the caller's transaction.
///
/// Idempotent per update id: the `applied_updates` guard makes re-applying an
/// already-applied id a no-op, so a duplicate approval replay cannot double-
/// mutate the catalog. Fails with `Conflict` on alias/title collisions and
/// `Validation` on referentially-invalid proposals; the caller rolls back and
/// the queue item stays pending.
pub async fn apply_update(
    conn: &mut PgConnection,
    update: &PendingUpdate,
) -> Result<(), AppError> {
    let guard =
        sqlx::query("INSERT INTO applied_updates (update_id) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(update.id)
            .execute(&mut *conn)
            .await?;
    if !is_first_application(guard.rows_affected()) {
        info!("Update {} already applied; skipping", update.id);
        return Ok(());
    }

    match &update.payload {
        UpdatePayload::Skill(proposal) => apply_new_skill(conn, proposal).await,
        UpdatePayload::Role(proposal) => apply_new_role(conn, proposal).await,
        UpdatePayload::ReviewObsolete(proposal) => apply_obsolescence(conn, proposal).await,
    }
}

/// An update id mutates the catalog at most once: the guard row insert either
/// claims the id (one row) or finds it already claimed (zero rows).
fn is_first_application(guard_rows: u64) -> bool {
    guard_rows == 1
}

/// Every alias form a skill proposal claims, canonical name first, as
/// (normalized key, display form) pairs deduplicated on the key.
fn claimed_aliases(proposal: &SkillProposal) -> Vec<(String, String)> {
    let mut claimed: Vec<(String, String)> = Vec::with_capacity(proposal.aliases.len() + 1);
    claimed.push((
        normalize_alias(&proposal.name),
        proposal.name.trim().to_string(),
    ));
    for alias in &proposal.aliases {
        let norm = normalize_alias(alias);
        if !norm.is_empty() && !claimed.iter().any(|(key, _)| *key == norm) {
            claimed.push((norm, alias.trim().to_string()));
        }
    }
    claimed
}

/// Resolves a surface form to (skill id, status) via the alias table.
async fn resolve_skill(
    conn: &mut PgConnection,
    surface: &str,
) -> Result<Option<(Uuid, String)>, AppError> {
    let row: Option<(Uuid, String)> = sqlx::query_as(
        "SELECT s.id, s.status FROM skill_aliases a
         JOIN skills s ON s.id = a.skill_id
         WHERE a.alias = $1",
    )
    .bind(normalize_alias(surface))
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

async fn apply_new_skill(
    conn: &mut PgConnection,
    proposal: &SkillProposal,
) -> Result<(), AppError> {
    if proposal.name.trim().is_empty() {
        return Err(AppError::Validation("Skill name must not be empty".into()));
    }

    let claimed = claimed_aliases(proposal);

    let skill_id = match resolve_skill(conn, &proposal.name).await? {
        Some((existing_id, _status)) => {
            // Same-name proposal: grow the alias set and resource list instead
            // of failing. An approval targeting an obsolete skill reactivates
            // it — the compensating path for a mistaken obsolescence approval.
            let current: Vec<String> = sqlx::query_scalar(
                "SELECT learning_resources FROM skills WHERE id = $1",
            )
            .bind(existing_id)
            .fetch_one(&mut *conn)
            .await?;
            let mut merged = current;
            for url in &proposal.learning_resources {
                if !merged.contains(url) {
                    merged.push(url.clone());
                }
            }
            sqlx::query("UPDATE skills SET status = 'active', learning_resources = $2 WHERE id = $1")
                .bind(existing_id)
                .bind(&merged)
                .execute(&mut *conn)
                .await?;
            existing_id
        }
        None => {
            let id = Uuid::new_v4();
            sqlx::query(
                "INSERT INTO skills (id, name, skill_type, learning_resources)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(id)
            .bind(proposal.name.trim())
            .bind(&proposal.skill_type)
            .bind(&proposal.learning_resources)
            .execute(&mut *conn)
            .await
            .map_err(|e| conflict_on_unique(e, &proposal.name))?;
            id
        }
    };

    for (alias, display) in &claimed {
        // The primary key on alias serializes concurrent commits over the
        // same alias space; a collision with another skill is a Conflict.
        let existing: Option<Uuid> =
            sqlx::query_scalar("SELECT skill_id FROM skill_aliases WHERE alias = $1")
                .bind(alias)
                .fetch_optional(&mut *conn)
                .await?;
        match existing {
            Some(owner) if owner != skill_id => {
                return Err(AppError::Conflict(format!(
                    "Alias '{alias}' already belongs to another skill"
                )));
            }
            Some(_) => {}
            None => {
                sqlx::query(
                    "INSERT INTO skill_aliases (alias, display, skill_id) VALUES ($1, $2, $3)",
                )
                .bind(alias)
                .bind(display)
                .bind(skill_id)
                .execute(&mut *conn)
                .await
                .map_err(|e| conflict_on_unique(e, alias))?;
            }
        }
    }

    info!("Committed skill '{}' ({skill_id})", proposal.name);
    Ok(())
}

async fn apply_new_role(conn: &mut PgConnection, proposal: &RoleProposal) -> Result<(), AppError> {
    if proposal.title.trim().is_empty() {
        return Err(AppError::Validation("Role title must not be empty".into()));
    }
    let (low, high) = proposal.salary_range;
    if low < 0 || low > high {
        return Err(AppError::Validation(format!(
            "Salary range [{low}, {high}] must satisfy 0 <= low <= high"
        )));
    }

    // Resolve every requirement to an active skill before touching the roles
    // table; a single bad reference rejects the whole proposal.
    let mut resolved: Vec<(Uuid, f64)> = Vec::with_capacity(proposal.skill_weights.len());
    for req in &proposal.skill_weights {
        if !(req.weight > 0.0 && req.weight <= 1.0) {
            return Err(AppError::Validation(format!(
                "Weight {} for '{}' is outside (0, 1]",
                req.weight, req.skill
            )));
        }
        let (skill_id, status) = resolve_skill(conn, &req.skill).await?.ok_or_else(|| {
            AppError::Validation(format!(
                "Requirement '{}' does not resolve to a known skill",
                req.skill
            ))
        })?;
        if status != "active" {
            return Err(AppError::Validation(format!(
                "Requirement '{}' resolves to an obsolete skill",
                req.skill
            )));
        }
        if resolved.iter().any(|(id, _)| *id == skill_id) {
            return Err(AppError::Validation(format!(
                "Requirement '{}' duplicates another requirement of this role",
                req.skill
            )));
        }
        resolved.push((skill_id, req.weight));
    }

    let existing: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM roles WHERE lower(title) = $1")
            .bind(normalize_alias(&proposal.title))
            .fetch_optional(&mut *conn)
            .await?;

    let role_id = match existing {
        // Approved re-proposal of an existing title revises the role in place.
        Some(id) => {
            sqlx::query(
                "UPDATE roles SET description = $2, salary_low = $3, salary_high = $4 WHERE id = $1",
            )
            .bind(id)
            .bind(&proposal.description)
            .bind(low)
            .bind(high)
            .execute(&mut *conn)
            .await?;
            sqlx::query("DELETE FROM role_requirements WHERE role_id = $1")
                .bind(id)
                .execute(&mut *conn)
                .await?;
            id
        }
        None => {
            let id = Uuid::new_v4();
            sqlx::query(
                "INSERT INTO roles (id, title, description, salary_low, salary_high)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(id)
            .bind(proposal.title.trim())
            .bind(&proposal.description)
            .bind(low)
            .bind(high)
            .execute(&mut *conn)
            .await
            .map_err(|e| conflict_on_unique(e, &proposal.title))?;
            id
        }
    };

    for (position, (skill_id, weight)) in resolved.iter().enumerate() {
        sqlx::query(
            "INSERT INTO role_requirements (role_id, skill_id, weight, position)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(role_id)
        .bind(skill_id)
        .bind(weight)
        .bind(position as i32)
        .execute(&mut *conn)
        .await?;
    }

    info!("Committed role '{}' ({role_id})", proposal.title);
    Ok(())
}

async fn apply_obsolescence(
    conn: &mut PgConnection,
    proposal: &ObsolescenceProposal,
) -> Result<(), AppError> {
    let (skill_id, _status) = resolve_skill(conn, &proposal.name).await?.ok_or_else(|| {
        AppError::Validation(format!(
            "Obsolescence review targets unknown skill '{}'",
            proposal.name
        ))
    })?;

    sqlx::query("UPDATE skills SET status = 'obsolete' WHERE id = $1")
        .bind(skill_id)
        .execute(&mut *conn)
        .await?;

    info!("Marked skill '{}' obsolete ({skill_id})", proposal.name);
    Ok(())
}

fn conflict_on_unique(err: sqlx::Error, subject: &str) -> AppError {
    if is_unique_violation(&err) {
        AppError::Conflict(format!("'{subject}' collides with an existing catalog entry"))
    } else {
        AppError::Database(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal(name: &str, aliases: &[&str]) -> SkillProposal {
        SkillProposal {
            name: name.to_string(),
            skill_type: "technical".to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            learning_resources: vec![],
            confidence: 0.9,
            discovery_reason: String::new(),
        }
    }

    #[test]
    fn test_replayed_update_id_does_not_apply_again() {
        // First application claims the guard row; a replay finds it claimed.
        assert!(is_first_application(1));
        assert!(!is_first_application(0));
    }

    #[test]
    fn test_claimed_aliases_dedupe_on_normalized_key() {
        let claimed =
            claimed_aliases(&proposal("GraphQL", &["graphql", "Graph QL", "  GRAPH QL "]));
        let keys: Vec<&str> = claimed.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["graphql", "graph ql"]);
    }

    #[test]
    fn test_claimed_aliases_keep_display_casing() {
        let claimed = claimed_aliases(&proposal("GraphQL", &["Graph QL"]));
        let displays: Vec<&str> = claimed.iter().map(|(_, d)| d.as_str()).collect();
        assert_eq!(displays, vec!["GraphQL", "Graph QL"]);
    }

    #[test]
    fn test_approved_skill_resolves_through_rebuilt_snapshot() {
        // Approving a skill proposal makes every claimed form resolvable in
        // the next snapshot, whatever casing the caller uses.
        let p = proposal("GraphQL", &["Graph QL", "graph-ql"]);
        let claimed = claimed_aliases(&p);
        let skill = Skill {
            id: Uuid::new_v4(),
            name: p.name.clone(),
            skill_type: p.skill_type.clone(),
            status: SkillStatus::Active,
            aliases: claimed.iter().skip(1).map(|(_, d)| d.clone()).collect(),
            learning_resources: vec![],
        };
        let id = skill.id;
        let snapshot = CatalogSnapshot::new(vec![skill], vec![]);
        for (_, form) in &claimed {
            assert_eq!(snapshot.resolve_alias(form).map(|s| s.id), Some(id));
        }
        assert_eq!(snapshot.resolve_alias("GRAPHQL").map(|s| s.id), Some(id));
    }
}
