use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillStatus {
    Active,
    Obsolete,
}

impl SkillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkillStatus::Active => "active",
            SkillStatus::Obsolete => "obsolete",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "obsolete" => SkillStatus::Obsolete,
            _ => SkillStatus::Active,
        }
    }
}

/// An accepted skill in the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct Skill {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub skill_type: String,
    pub status: SkillStatus,
    /// Alternate surface forms mapping to this skill. The canonical name is
    /// indexed as an alias too, but not duplicated into this list.
    pub aliases: Vec<String>,
    pub learning_resources: Vec<String>,
}

/// A weighted skill requirement of a role. Weight is in (0, 1].
#[derive(Debug, Clone, Serialize)]
pub struct SkillRequirement {
    #[serde(skip)]
    pub skill_id: Uuid,
    pub skill: String,
    pub weight: f64,
}

/// An accepted job role in the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct Role {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// (low, high) — serializes as `[low, high]`.
    pub salary_range: (i64, i64),
    #[serde(rename = "skill_weights")]
    pub requirements: Vec<SkillRequirement>,
}

/// Lowercased, whitespace-trimmed form under which aliases are indexed and
/// compared. Uniqueness is enforced over this form.
pub fn normalize_alias(text: &str) -> String {
    text.trim().to_lowercase()
}

/// A consistent point-in-time view of the catalog: active skills, the alias
/// index over them, and all roles.
///
/// Loaded in a single transaction so an in-flight scoring call sees either the
/// full pre-commit or full post-commit catalog, never a partial one.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    skills: HashMap<Uuid, Skill>,
    alias_index: HashMap<String, Uuid>,
    pub roles: Vec<Role>,
}

impl CatalogSnapshot {
    /// Builds the snapshot from active skills and roles, indexing each skill
    /// under its canonical name and every alias.
    pub fn new(skills: Vec<Skill>, roles: Vec<Role>) -> Self {
        let mut alias_index = HashMap::new();
        for skill in &skills {
            alias_index.insert(normalize_alias(&skill.name), skill.id);
            for alias in &skill.aliases {
                alias_index.insert(normalize_alias(alias), skill.id);
            }
        }
        let skills = skills.into_iter().map(|s| (s.id, s)).collect();
        CatalogSnapshot {
            skills,
            alias_index,
            roles,
        }
    }

    /// Resolves a surface form (name or alias, any casing) to an active skill.
    pub fn resolve_alias(&self, text: &str) -> Option<&Skill> {
        self.alias_index
            .get(&normalize_alias(text))
            .and_then(|id| self.skills.get(id))
    }

    pub fn skill(&self, id: Uuid) -> Option<&Skill> {
        self.skills.get(&id)
    }

    pub fn active_skills(&self) -> impl Iterator<Item = &Skill> {
        self.skills.values()
    }

    pub fn alias_index(&self) -> &HashMap<String, Uuid> {
        &self.alias_index
    }

    pub fn has_role_titled(&self, title: &str) -> bool {
        let needle = normalize_alias(title);
        self.roles
            .iter()
            .any(|r| normalize_alias(&r.title) == needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skill(name: &str, aliases: &[&str]) -> Skill {
        Skill {
            id: Uuid::new_v4(),
            name: name.to_string(),
            skill_type: "technical".to_string(),
            status: SkillStatus::Active,
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            learning_resources: vec![],
        }
    }

    #[test]
    fn test_resolve_alias_by_canonical_name() {
        let snapshot = CatalogSnapshot::new(vec![skill("Python", &[])], vec![]);
        assert_eq!(snapshot.resolve_alias("python").unwrap().name, "Python");
        assert_eq!(snapshot.resolve_alias("  PYTHON ").unwrap().name, "Python");
    }

    #[test]
    fn test_resolve_alias_by_alternate_form() {
        let snapshot = CatalogSnapshot::new(vec![skill("Rust", &["rustlang"])], vec![]);
        assert_eq!(snapshot.resolve_alias("rustlang").unwrap().name, "Rust");
    }

    #[test]
    fn test_resolve_alias_unknown_returns_none() {
        let snapshot = CatalogSnapshot::new(vec![skill("Rust", &[])], vec![]);
        assert!(snapshot.resolve_alias("cobol").is_none());
    }

    #[test]
    fn test_has_role_titled_is_case_insensitive() {
        let role = Role {
            id: Uuid::new_v4(),
            title: "Data Scientist".to_string(),
            description: String::new(),
            salary_range: (90_000, 140_000),
            requirements: vec![],
        };
        let snapshot = CatalogSnapshot::new(vec![], vec![role]);
        assert!(snapshot.has_role_titled("data scientist"));
        assert!(!snapshot.has_role_titled("ML Engineer"));
    }

    #[test]
    fn test_role_serializes_salary_as_array_and_skill_weights() {
        let sid = Uuid::new_v4();
        let role = Role {
            id: Uuid::new_v4(),
            title: "Backend Developer".to_string(),
            description: "Builds services".to_string(),
            salary_range: (70_000, 110_000),
            requirements: vec![SkillRequirement {
                skill_id: sid,
                skill: "Python".to_string(),
                weight: 0.6,
            }],
        };
        let v = serde_json::to_value(&role).unwrap();
        assert_eq!(v["salary_range"], serde_json::json!([70_000, 110_000]));
        assert_eq!(v["skill_weights"][0]["skill"], "Python");
        assert_eq!(v["skill_weights"][0]["weight"], 0.6);
        assert!(v["skill_weights"][0].get("skill_id").is_none());
    }
}
