//! Weighted-overlap scoring of every catalog role against an input skill set.
//!
//! Per role: W = Σ weights of requirements covered by the input, T = Σ weights
//! of all requirements still backed by an active skill; match_score =
//! round(100·W/T), or 0 when T = 0. Requirements whose skill has gone obsolete
//! are excluded from both sums so stale references cannot depress every score.

use std::collections::HashSet;

use serde::Serialize;
use uuid::Uuid;

use crate::ontology::models::{CatalogSnapshot, Skill};

/// Learning-suggestion seam. Missing-skill annotations come from here; the
/// default lookup serves the catalog's stored per-skill URLs, a deployment can
/// swap in a live course-catalog client.
pub trait LearningResourceLookup: Send + Sync {
    fn resources_for(&self, skill: &Skill) -> Vec<String>;
}

/// Default lookup: the learning resources recorded on the catalog skill.
pub struct CatalogResourceLookup;

impl LearningResourceLookup for CatalogResourceLookup {
    fn resources_for(&self, skill: &Skill) -> Vec<String> {
        skill.learning_resources.clone()
    }
}

/// A requirement the candidate already covers.
#[derive(Debug, Clone, Serialize)]
pub struct MatchingSkill {
    pub skill: String,
    pub weight: f64,
}

/// A requirement the candidate lacks, annotated with learning suggestions.
#[derive(Debug, Clone, Serialize)]
pub struct MissingSkill {
    pub skill: String,
    pub weight: f64,
    pub learning_resources: Vec<String>,
}

/// Per-role scoring outcome. Ephemeral — computed per request, never stored
/// in the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub title: String,
    pub description: String,
    /// (low, high) — serializes as `[low, high]`.
    pub salary_range: (i64, i64),
    pub match_score: u32,
    pub matching_skills: Vec<MatchingSkill>,
    pub missing_skills: Vec<MissingSkill>,
}

/// Scores every role in the snapshot against the input skill set. Results are
/// ordered by descending match_score; ties (including the all-zero case of an
/// empty input) break by ascending role id for determinism. Roles with zero
/// active requirements are kept in the output at score 0.
pub fn score_catalog(
    snapshot: &CatalogSnapshot,
    input_skills: &HashSet<Uuid>,
    resources: &dyn LearningResourceLookup,
) -> Vec<MatchResult> {
    let mut scored: Vec<(Uuid, MatchResult)> = snapshot
        .roles
        .iter()
        .map(|role| {
            let mut matching = Vec::new();
            let mut missing = Vec::new();
            let mut covered = 0.0_f64;
            let mut total = 0.0_f64;

            for req in &role.requirements {
                // The snapshot holds active skills only: an unresolvable id
                // means the requirement's skill has gone obsolete.
                let Some(skill) = snapshot.skill(req.skill_id) else {
                    continue;
                };
                total += req.weight;
                if input_skills.contains(&req.skill_id) {
                    covered += req.weight;
                    matching.push(MatchingSkill {
                        skill: req.skill.clone(),
                        weight: req.weight,
                    });
                } else {
                    missing.push(MissingSkill {
                        skill: req.skill.clone(),
                        weight: req.weight,
                        learning_resources: resources.resources_for(skill),
                    });
                }
            }

            let match_score = if total > 0.0 {
                (100.0 * covered / total).round() as u32
            } else {
                0
            };

            (
                role.id,
                MatchResult {
                    title: role.title.clone(),
                    description: role.description.clone(),
                    salary_range: role.salary_range,
                    match_score,
                    matching_skills: matching,
                    missing_skills: missing,
                },
            )
        })
        .collect();

    scored.sort_by(|(a_id, a), (b_id, b)| {
        b.match_score
            .cmp(&a.match_score)
            .then_with(|| a_id.cmp(b_id))
    });
    scored.into_iter().map(|(_, result)| result).collect()
}
