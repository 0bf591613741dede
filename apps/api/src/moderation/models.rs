use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::errors::AppError;
use crate::ontology::models::normalize_alias;

/// Candidate skill carried by a `new_skill` proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillProposal {
    pub name: String,
    #[serde(rename = "type")]
    pub skill_type: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub learning_resources: Vec<String>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub discovery_reason: String,
}

/// A skill reference + weight inside a role proposal. The reference is a
/// surface form resolved through the alias index at commit time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightedSkillRef {
    pub skill: String,
    pub weight: f64,
}

/// Candidate role carried by a `new_role` proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleProposal {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// (low, high) — serializes as `[low, high]`.
    pub salary_range: (i64, i64),
    pub skill_weights: Vec<WeightedSkillRef>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub discovery_reason: String,
}

/// Reference to an existing catalog skill under obsolescence review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObsolescenceProposal {
    pub name: String,
}

/// Discriminated proposal payload. Serializes adjacently tagged so each queue
/// item carries `"type": "skill" | "role" | "review_obsolete"` plus a `"data"`
/// object — the shape the admin console dispatches on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum UpdatePayload {
    Skill(SkillProposal),
    Role(RoleProposal),
    #[serde(rename = "review_obsolete")]
    ReviewObsolete(ObsolescenceProposal),
}

impl UpdatePayload {
    pub fn kind_str(&self) -> &'static str {
        match self {
            UpdatePayload::Skill(_) => "skill",
            UpdatePayload::Role(_) => "role",
            UpdatePayload::ReviewObsolete(_) => "review_obsolete",
        }
    }

    /// Key identifying the catalog entity this proposal targets. Two proposals
    /// with the same key would act on the same target; discovery uses this for
    /// duplicate suppression against unresolved pending items.
    pub fn target_key(&self) -> String {
        match self {
            UpdatePayload::Skill(p) => format!("skill:{}", normalize_alias(&p.name)),
            UpdatePayload::Role(p) => format!("role:{}", normalize_alias(&p.title)),
            UpdatePayload::ReviewObsolete(p) => {
                format!("review_obsolete:{}", normalize_alias(&p.name))
            }
        }
    }

    /// The `data` object alone, as stored in the `payload` column.
    pub fn data_json(&self) -> serde_json::Value {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(mut map)) => {
                map.remove("data").unwrap_or(serde_json::Value::Null)
            }
            _ => serde_json::Value::Null,
        }
    }

    /// Reassembles a payload from the stored kind discriminant + data object.
    pub fn from_parts(kind: &str, data: serde_json::Value) -> Result<Self, AppError> {
        serde_json::from_value(json!({ "type": kind, "data": data })).map_err(|e| {
            AppError::Validation(format!("Malformed {kind} proposal payload: {e}"))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStatus {
    Pending,
    Approved,
    Rejected,
}

impl UpdateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateStatus::Pending => "pending",
            UpdateStatus::Approved => "approved",
            UpdateStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "approved" => UpdateStatus::Approved,
            "rejected" => UpdateStatus::Rejected,
            _ => UpdateStatus::Pending,
        }
    }
}

/// A moderation item. Once status leaves `pending` the record is an immutable
/// audit row; approval commits exactly one catalog mutation.
///
/// Serializes as `{id, type, data, confidence, discovery_reason}` — the wire
/// item shape consumed by the admin console.
#[derive(Debug, Clone, Serialize)]
pub struct PendingUpdate {
    pub id: Uuid,
    #[serde(flatten)]
    pub payload: UpdatePayload,
    pub confidence: f64,
    pub discovery_reason: String,
    #[serde(skip)]
    pub status: UpdateStatus,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub resolved_by: Option<String>,
}

impl PendingUpdate {
    /// A fresh pending item as the Discovery Job emits it.
    pub fn proposed(payload: UpdatePayload, confidence: f64, discovery_reason: String) -> Self {
        PendingUpdate {
            id: Uuid::new_v4(),
            payload,
            confidence: confidence.clamp(0.0, 1.0),
            discovery_reason,
            status: UpdateStatus::Pending,
            created_at: Utc::now(),
            resolved_at: None,
            resolved_by: None,
        }
    }
}

/// Database row backing a `PendingUpdate`.
#[derive(Debug, sqlx::FromRow)]
pub struct PendingUpdateRow {
    pub id: Uuid,
    pub kind: String,
    pub payload: serde_json::Value,
    pub confidence: f64,
    pub discovery_reason: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
}

impl PendingUpdateRow {
    pub fn into_update(self) -> Result<PendingUpdate, AppError> {
        Ok(PendingUpdate {
            payload: UpdatePayload::from_parts(&self.kind, self.payload)?,
            id: self.id,
            confidence: self.confidence,
            discovery_reason: self.discovery_reason,
            status: UpdateStatus::from_str(&self.status),
            created_at: self.created_at,
            resolved_at: self.resolved_at,
            resolved_by: self.resolved_by,
        })
    }
}

/// Body of `POST /api/admin/review`.
#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub update_id: Uuid,
    pub decision: Decision,
    #[serde(default = "default_reviewer")]
    pub reviewer_name: String,
}

fn default_reviewer() -> String {
    "Admin".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skill_payload(name: &str) -> UpdatePayload {
        UpdatePayload::Skill(SkillProposal {
            name: name.to_string(),
            skill_type: "technical".to_string(),
            aliases: vec!["rustlang".to_string()],
            learning_resources: vec!["https://doc.rust-lang.org/book/".to_string()],
            confidence: 0.92,
            discovery_reason: "mentioned in 8 of 12 postings".to_string(),
        })
    }

    #[test]
    fn test_pending_update_wire_shape() {
        let update = PendingUpdate::proposed(
            skill_payload("Rust"),
            0.92,
            "mentioned in 8 of 12 postings".to_string(),
        );
        let v = serde_json::to_value(&update).unwrap();
        assert_eq!(v["type"], "skill");
        assert_eq!(v["data"]["name"], "Rust");
        assert_eq!(v["data"]["aliases"][0], "rustlang");
        assert_eq!(v["confidence"], 0.92);
        assert_eq!(v["discovery_reason"], "mentioned in 8 of 12 postings");
        // audit fields stay off the wire
        assert!(v.get("status").is_none());
        assert!(v.get("created_at").is_none());
    }

    #[test]
    fn test_review_obsolete_tag_name() {
        let payload = UpdatePayload::ReviewObsolete(ObsolescenceProposal {
            name: "Angular".to_string(),
        });
        let v = serde_json::to_value(&payload).unwrap();
        assert_eq!(v["type"], "review_obsolete");
        assert_eq!(v["data"]["name"], "Angular");
    }

    #[test]
    fn test_payload_round_trips_through_parts() {
        let payload = UpdatePayload::Role(RoleProposal {
            title: "Junior Data Scientist".to_string(),
            description: "Assists senior data scientists".to_string(),
            salary_range: (85_000, 115_000),
            skill_weights: vec![WeightedSkillRef {
                skill: "Python".to_string(),
                weight: 1.0,
            }],
            confidence: 0.91,
            discovery_reason: "high posting volume".to_string(),
        });
        let rebuilt =
            UpdatePayload::from_parts(payload.kind_str(), payload.data_json()).unwrap();
        match rebuilt {
            UpdatePayload::Role(p) => {
                assert_eq!(p.title, "Junior Data Scientist");
                assert_eq!(p.salary_range, (85_000, 115_000));
                assert_eq!(p.skill_weights[0].skill, "Python");
            }
            other => panic!("expected role payload, got {other:?}"),
        }
    }

    #[test]
    fn test_from_parts_rejects_malformed_data() {
        let err = UpdatePayload::from_parts("skill", serde_json::json!({"bogus": true}));
        assert!(matches!(err, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_target_key_normalizes_case() {
        let a = skill_payload("Rust").target_key();
        let b = skill_payload("  RUST ").target_key();
        assert_eq!(a, b);
        assert_eq!(a, "skill:rust");
    }

    #[test]
    fn test_confidence_clamped_to_unit_interval() {
        let update = PendingUpdate::proposed(skill_payload("Rust"), 1.7, String::new());
        assert_eq!(update.confidence, 1.0);
    }
}
