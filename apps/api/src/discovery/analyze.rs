//! Pure analysis over one market-signal batch and a catalog snapshot.
//! Everything here is deterministic and side-effect free; `job::run` owns the
//! transaction that turns the output into queue rows.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::discovery::signal::SignalBatch;
use crate::moderation::models::{
    ObsolescenceProposal, PendingUpdate, RoleProposal, SkillProposal, UpdatePayload,
    WeightedSkillRef,
};
use crate::ontology::models::{normalize_alias, CatalogSnapshot};

/// Unresolvable mentions need this many postings before becoming a proposal.
pub const MIN_SKILL_MENTIONS: u32 = 3;
/// Posting clusters need this many members before becoming a role proposal.
pub const MIN_ROLE_POSTINGS: u32 = 2;
/// Flag an active skill when its batch mentions fall below this share of its
/// historical baseline frequency.
pub const OBSOLESCENCE_RATIO: f64 = 0.25;
/// Baselines below this are too thin to judge; never flag on frequency alone.
pub const MIN_BASELINE: f64 = 4.0;
/// Flag an active skill not seen in the market for this long.
pub const STALE_AFTER_DAYS: i64 = 180;

/// Collapses a surface form for clustering unknown mentions: lowercase,
/// alphanumerics only ("Graph QL" and "graphql" land in one bucket; '+' and
/// '#' survive for the likes of C++ and C#).
pub fn canonical_key(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric() || *c == '+' || *c == '#')
        .flat_map(|c| c.to_lowercase())
        .collect()
}

#[derive(Debug, Default)]
pub struct UnknownMention {
    /// Postings mentioning this form (counted once per posting).
    pub count: u32,
    /// Distinct surface forms observed, first-seen first.
    pub forms: Vec<String>,
}

/// Per-batch mention counts, split into catalog-resolvable and unknown.
#[derive(Debug, Default)]
pub struct MentionTally {
    pub known: HashMap<Uuid, u32>,
    pub unknown: HashMap<String, UnknownMention>,
}

/// Counts skill mentions across the batch, one count per posting per skill.
pub fn tally_mentions(batch: &SignalBatch, snapshot: &CatalogSnapshot) -> MentionTally {
    let mut tally = MentionTally::default();

    for posting in &batch.postings {
        let mut seen_known: HashSet<Uuid> = HashSet::new();
        let mut seen_unknown: HashSet<String> = HashSet::new();

        for surface in &posting.skills {
            if let Some(skill) = snapshot.resolve_alias(surface) {
                if seen_known.insert(skill.id) {
                    *tally.known.entry(skill.id).or_insert(0) += 1;
                }
            } else {
                let key = canonical_key(surface);
                if key.is_empty() {
                    continue;
                }
                let entry = tally.unknown.entry(key.clone()).or_default();
                let form = surface.trim().to_string();
                if !entry
                    .forms
                    .iter()
                    .any(|f| normalize_alias(f) == normalize_alias(&form))
                {
                    entry.forms.push(form);
                }
                if seen_unknown.insert(key) {
                    entry.count += 1;
                }
            }
        }
    }

    tally
}

/// `new_skill` proposals for unknown mentions seen often enough. Confidence is
/// the mention share of the batch; the first observed form becomes the
/// canonical name, the rest become aliases.
pub fn propose_new_skills(tally: &MentionTally, total_postings: u32) -> Vec<PendingUpdate> {
    let mut keys: Vec<&String> = tally.unknown.keys().collect();
    keys.sort();

    let mut proposals = Vec::new();
    for key in keys {
        let mention = &tally.unknown[key];
        if mention.count < MIN_SKILL_MENTIONS || total_postings == 0 {
            continue;
        }
        let name = mention.forms[0].clone();
        let aliases = mention.forms[1..].to_vec();
        let confidence = f64::from(mention.count) / f64::from(total_postings);
        let reason = format!(
            "Mentioned in {} of {} postings in the latest market batch",
            mention.count, total_postings
        );
        proposals.push(PendingUpdate::proposed(
            UpdatePayload::Skill(SkillProposal {
                name,
                skill_type: "technical".to_string(),
                aliases,
                learning_resources: vec![],
                confidence,
                discovery_reason: reason.clone(),
            }),
            confidence,
            reason,
        ));
    }
    proposals
}

/// `new_role` proposals for posting-title clusters the catalog lacks.
/// Requirement weights are each skill's mention count within the cluster,
/// normalized so the most frequent skill carries 1.0; the salary range is the
/// average of the cluster's posted ranges.
pub fn propose_new_roles(batch: &SignalBatch, snapshot: &CatalogSnapshot) -> Vec<PendingUpdate> {
    struct Cluster<'a> {
        title: &'a str,
        postings: u32,
        skill_counts: HashMap<Uuid, u32>,
        salaries: Vec<(i64, i64)>,
    }

    let mut clusters: HashMap<String, Cluster> = HashMap::new();
    for posting in &batch.postings {
        let key = normalize_alias(&posting.title);
        if key.is_empty() {
            continue;
        }
        let cluster = clusters.entry(key).or_insert_with(|| Cluster {
            title: &posting.title,
            postings: 0,
            skill_counts: HashMap::new(),
            salaries: Vec::new(),
        });
        cluster.postings += 1;
        if let Some(range) = posting.salary_range {
            cluster.salaries.push(range);
        }
        let mut seen: HashSet<Uuid> = HashSet::new();
        for surface in &posting.skills {
            if let Some(skill) = snapshot.resolve_alias(surface) {
                if seen.insert(skill.id) {
                    *cluster.skill_counts.entry(skill.id).or_insert(0) += 1;
                }
            }
        }
    }

    let total = batch.postings.len() as u32;
    let mut keys: Vec<String> = clusters.keys().cloned().collect();
    keys.sort();

    let mut proposals = Vec::new();
    for key in keys {
        let cluster = &clusters[&key];
        if cluster.postings < MIN_ROLE_POSTINGS || snapshot.has_role_titled(cluster.title) {
            continue;
        }
        let max_count = cluster.skill_counts.values().copied().max().unwrap_or(0);
        if max_count == 0 {
            // No resolvable requirements; nothing a reviewer could approve.
            continue;
        }

        let mut skill_weights: Vec<WeightedSkillRef> = cluster
            .skill_counts
            .iter()
            .filter_map(|(id, count)| {
                snapshot.skill(*id).map(|skill| WeightedSkillRef {
                    skill: skill.name.clone(),
                    weight: f64::from(*count) / f64::from(max_count),
                })
            })
            .collect();
        skill_weights.sort_by(|a, b| {
            b.weight
                .partial_cmp(&a.weight)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.skill.cmp(&b.skill))
        });

        let salary_range = if cluster.salaries.is_empty() {
            (0, 0)
        } else {
            let n = cluster.salaries.len() as i64;
            (
                cluster.salaries.iter().map(|(lo, _)| lo).sum::<i64>() / n,
                cluster.salaries.iter().map(|(_, hi)| hi).sum::<i64>() / n,
            )
        };

        let confidence = if total > 0 {
            f64::from(cluster.postings) / f64::from(total)
        } else {
            0.0
        };
        let reason = format!(
            "Observed {} of {} postings titled '{}'",
            cluster.postings, total, cluster.title
        );
        proposals.push(PendingUpdate::proposed(
            UpdatePayload::Role(RoleProposal {
                title: cluster.title.to_string(),
                description: format!(
                    "Role inferred from {} recent market postings",
                    cluster.postings
                ),
                salary_range,
                skill_weights,
                confidence,
                discovery_reason: reason.clone(),
            }),
            confidence,
            reason,
        ));
    }
    proposals
}

/// `obsolescence_review` proposals for active skills whose batch mentions fall
/// below `OBSOLESCENCE_RATIO` of their historical baseline, or that have not
/// been seen in the market for `STALE_AFTER_DAYS`.
pub fn propose_obsolescence(
    tally: &MentionTally,
    snapshot: &CatalogSnapshot,
    baseline: &HashMap<Uuid, f64>,
    last_seen: &HashMap<Uuid, DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Vec<PendingUpdate> {
    let mut skills: Vec<_> = snapshot.active_skills().collect();
    skills.sort_by(|a, b| a.name.cmp(&b.name));

    let mut proposals = Vec::new();
    for skill in skills {
        let batch_count = tally.known.get(&skill.id).copied().unwrap_or(0);
        let base = baseline.get(&skill.id).copied().unwrap_or(0.0);

        let reason = if base >= MIN_BASELINE && f64::from(batch_count) < OBSOLESCENCE_RATIO * base
        {
            Some(format!(
                "Seen in {batch_count} postings this batch, below {:.0}% of baseline frequency {base:.1}",
                OBSOLESCENCE_RATIO * 100.0
            ))
        } else {
            match last_seen.get(&skill.id) {
                Some(seen) if (now - *seen).num_days() > STALE_AFTER_DAYS && batch_count == 0 => {
                    Some(format!(
                        "Not seen in the market for {} days",
                        (now - *seen).num_days()
                    ))
                }
                _ => None,
            }
        };

        if let Some(reason) = reason {
            proposals.push(PendingUpdate::proposed(
                UpdatePayload::ReviewObsolete(ObsolescenceProposal {
                    name: skill.name.clone(),
                }),
                0.5,
                reason,
            ));
        }
    }
    proposals
}

/// Drops proposals whose target already has an unresolved pending item, and
/// intra-batch duplicates for the same target. Keeps the job safely
/// re-runnable.
pub fn suppress_duplicates(
    proposals: Vec<PendingUpdate>,
    pending_targets: &HashSet<String>,
) -> Vec<PendingUpdate> {
    let mut seen: HashSet<String> = HashSet::new();
    proposals
        .into_iter()
        .filter(|p| {
            let key = p.payload.target_key();
            !pending_targets.contains(&key) && seen.insert(key)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::signal::JobPosting;
    use crate::ontology::models::{Role, Skill, SkillRequirement, SkillStatus};
    use chrono::Duration;

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

    fn posting(title: &str, skills: &[&str]) -> JobPosting {
        JobPosting {
            title: title.to_string(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            salary_range: Some((80_000, 120_000)),
        }
    }

    fn snapshot_with(skills: Vec<Skill>, roles: Vec<Role>) -> CatalogSnapshot {
        CatalogSnapshot::new(skills, roles)
    }

    #[test]
    fn test_unknown_mention_needs_min_postings_to_propose() {
        let snapshot = snapshot_with(vec![skill("Python", &[])], vec![]);
        let batch = SignalBatch {
            postings: vec![
                posting("A", &["GraphQL", "Python"]),
                posting("B", &["GraphQL"]),
                posting("C", &["GraphQL"]),
                posting("D", &["Terraform"]),
            ],
        };
        let tally = tally_mentions(&batch, &snapshot);
        let proposals = propose_new_skills(&tally, 4);

        assert_eq!(proposals.len(), 1);
        match &proposals[0].payload {
            UpdatePayload::Skill(p) => {
                assert_eq!(p.name, "GraphQL");
                assert!((p.confidence - 0.75).abs() < 1e-9);
            }
            other => panic!("expected skill proposal, got {other:?}"),
        }
    }

    #[test]
    fn test_known_skills_are_never_proposed_as_new() {
        let snapshot = snapshot_with(vec![skill("Python", &["python3"])], vec![]);
        let batch = SignalBatch {
            postings: vec![
                posting("A", &["Python"]),
                posting("B", &["python3"]),
                posting("C", &["PYTHON"]),
            ],
        };
        let tally = tally_mentions(&batch, &snapshot);
        assert!(tally.unknown.is_empty());
        assert!(propose_new_skills(&tally, 3).is_empty());
    }

    #[test]
    fn test_variant_surface_forms_become_aliases() {
        let snapshot = snapshot_with(vec![], vec![]);
        let batch = SignalBatch {
            postings: vec![
                posting("A", &["GraphQL"]),
                posting("B", &["Graph QL"]),
                posting("C", &["graphql"]),
            ],
        };
        let tally = tally_mentions(&batch, &snapshot);
        let proposals = propose_new_skills(&tally, 3);

        assert_eq!(proposals.len(), 1);
        match &proposals[0].payload {
            UpdatePayload::Skill(p) => {
                assert_eq!(p.name, "GraphQL");
                assert_eq!(p.aliases, vec!["Graph QL".to_string()]);
            }
            other => panic!("expected skill proposal, got {other:?}"),
        }
    }

    #[test]
    fn test_mentions_counted_once_per_posting() {
        let snapshot = snapshot_with(vec![skill("Python", &["python3"])], vec![]);
        let batch = SignalBatch {
            postings: vec![posting("A", &["Python", "python3", "PYTHON"])],
        };
        let tally = tally_mentions(&batch, &snapshot);
        assert_eq!(tally.known.values().copied().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_role_cluster_proposes_normalized_weights() {
        let python = skill("Python", &[]);
        let ml = skill("Machine Learning", &["ml"]);
        let sql = skill("SQL", &[]);
        let snapshot = snapshot_with(vec![python, ml, sql], vec![]);
        let batch = SignalBatch {
            postings: vec![
                posting("Junior Data Scientist", &["Python", "ml", "SQL"]),
                posting("Junior Data Scientist", &["Python", "Machine Learning"]),
                posting("Junior Data Scientist", &["Python"]),
            ],
        };

        let proposals = propose_new_roles(&batch, &snapshot);
        assert_eq!(proposals.len(), 1);
        match &proposals[0].payload {
            UpdatePayload::Role(p) => {
                assert_eq!(p.title, "Junior Data Scientist");
                // Python 3/3 -> 1.0, ML 2/3, SQL 1/3 — descending
                assert_eq!(p.skill_weights[0].skill, "Python");
                assert_eq!(p.skill_weights[0].weight, 1.0);
                assert!(p
                    .skill_weights
                    .iter()
                    .all(|w| w.weight > 0.0 && w.weight <= 1.0));
                assert_eq!(p.salary_range, (80_000, 120_000));
            }
            other => panic!("expected role proposal, got {other:?}"),
        }
    }

    #[test]
    fn test_existing_role_title_is_not_reproposed() {
        let js = skill("JavaScript", &[]);
        let role = Role {
            id: Uuid::new_v4(),
            title: "Frontend Developer".to_string(),
            description: String::new(),
            salary_range: (70_000, 120_000),
            requirements: vec![SkillRequirement {
                skill_id: js.id,
                skill: "JavaScript".to_string(),
                weight: 1.0,
            }],
        };
        let snapshot = snapshot_with(vec![js], vec![role]);
        let batch = SignalBatch {
            postings: vec![
                posting("Frontend Developer", &["JavaScript"]),
                posting("frontend developer", &["JavaScript"]),
            ],
        };
        assert!(propose_new_roles(&batch, &snapshot).is_empty());
    }

    #[test]
    fn test_single_posting_cluster_is_ignored() {
        let js = skill("JavaScript", &[]);
        let snapshot = snapshot_with(vec![js], vec![]);
        let batch = SignalBatch {
            postings: vec![posting("Prompt Engineer", &["JavaScript"])],
        };
        assert!(propose_new_roles(&batch, &snapshot).is_empty());
    }

    #[test]
    fn test_obsolescence_flagged_when_mentions_collapse() {
        let angular = skill("Angular", &["angularjs"]);
        let angular_id = angular.id;
        let snapshot = snapshot_with(vec![angular], vec![]);
        let tally = MentionTally::default(); // zero mentions this batch
        let baseline = HashMap::from([(angular_id, 8.0)]);
        let last_seen = HashMap::from([(angular_id, Utc::now())]);

        let proposals =
            propose_obsolescence(&tally, &snapshot, &baseline, &last_seen, Utc::now());
        assert_eq!(proposals.len(), 1);
        match &proposals[0].payload {
            UpdatePayload::ReviewObsolete(p) => assert_eq!(p.name, "Angular"),
            other => panic!("expected obsolescence proposal, got {other:?}"),
        }
    }

    #[test]
    fn test_healthy_mentions_are_not_flagged() {
        let python = skill("Python", &[]);
        let python_id = python.id;
        let snapshot = snapshot_with(vec![python], vec![]);
        let mut tally = MentionTally::default();
        tally.known.insert(python_id, 6);
        let baseline = HashMap::from([(python_id, 8.0)]);
        let last_seen = HashMap::from([(python_id, Utc::now())]);

        assert!(
            propose_obsolescence(&tally, &snapshot, &baseline, &last_seen, Utc::now()).is_empty()
        );
    }

    #[test]
    fn test_thin_baseline_is_not_flagged_on_frequency() {
        let niche = skill("Erlang", &[]);
        let niche_id = niche.id;
        let snapshot = snapshot_with(vec![niche], vec![]);
        let tally = MentionTally::default();
        let baseline = HashMap::from([(niche_id, 2.0)]); // below MIN_BASELINE
        let last_seen = HashMap::from([(niche_id, Utc::now())]);

        assert!(
            propose_obsolescence(&tally, &snapshot, &baseline, &last_seen, Utc::now()).is_empty()
        );
    }

    #[test]
    fn test_stale_last_seen_is_flagged() {
        let old = skill("Flash", &[]);
        let old_id = old.id;
        let snapshot = snapshot_with(vec![old], vec![]);
        let tally = MentionTally::default();
        let baseline = HashMap::from([(old_id, 1.0)]);
        let now = Utc::now();
        let last_seen = HashMap::from([(old_id, now - Duration::days(365))]);

        let proposals = propose_obsolescence(&tally, &snapshot, &baseline, &last_seen, now);
        assert_eq!(proposals.len(), 1);
        assert!(proposals[0].discovery_reason.contains("365 days"));
    }

    #[test]
    fn test_suppress_duplicates_against_pending_and_within_batch() {
        let make = |name: &str| {
            PendingUpdate::proposed(
                UpdatePayload::Skill(SkillProposal {
                    name: name.to_string(),
                    skill_type: "technical".to_string(),
                    aliases: vec![],
                    learning_resources: vec![],
                    confidence: 0.5,
                    discovery_reason: String::new(),
                }),
                0.5,
                String::new(),
            )
        };
        let pending: HashSet<String> = HashSet::from(["skill:terraform".to_string()]);
        let kept = suppress_duplicates(
            vec![make("GraphQL"), make("graphql"), make("Terraform")],
            &pending,
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].payload.target_key(), "skill:graphql");
    }

    #[test]
    fn test_canonical_key_keeps_symbol_languages_apart() {
        assert_ne!(canonical_key("C++"), canonical_key("C#"));
        assert_eq!(canonical_key("Graph QL"), canonical_key("graphql"));
    }
}
