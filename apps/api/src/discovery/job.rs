use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::{error, info};
use uuid::Uuid;

use crate::discovery::analyze::{
    propose_new_roles, propose_new_skills, propose_obsolescence, suppress_duplicates,
    tally_mentions,
};
use crate::discovery::signal::MarketSignalSource;
use crate::errors::AppError;
use crate::moderation::models::PendingUpdateRow;
use crate::ontology::store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryState {
    Idle,
    Running,
    Completed,
    Failed,
}

/// Published progress of the latest discovery run. Callers query this instead
/// of guessing a polling delay after triggering an update.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryStatus {
    pub state: DiscoveryState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Proposals written by the last completed run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl DiscoveryStatus {
    pub fn idle() -> Self {
        DiscoveryStatus {
            state: DiscoveryState::Idle,
            started_at: None,
            finished_at: None,
            proposed: None,
            detail: None,
        }
    }
}

pub type SharedDiscoveryStatus = Arc<RwLock<DiscoveryStatus>>;

/// Claims the run slot for a new discovery run. The running check and the
/// transition to `Running` happen under one write lock, so of two concurrent
/// triggers exactly one claims the slot; the other sees `false` and must not
/// spawn a job.
pub async fn try_begin(status: &SharedDiscoveryStatus) -> bool {
    let mut s = status.write().await;
    if s.state == DiscoveryState::Running {
        return false;
    }
    *s = DiscoveryStatus {
        state: DiscoveryState::Running,
        started_at: Some(Utc::now()),
        finished_at: None,
        proposed: None,
        detail: None,
    };
    true
}

async fn publish_outcome(status: &SharedDiscoveryStatus, result: Result<usize, AppError>) {
    let mut s = status.write().await;
    s.finished_at = Some(Utc::now());
    match result {
        Ok(proposed) => {
            s.state = DiscoveryState::Completed;
            s.proposed = Some(proposed);
        }
        Err(e) => {
            error!("Discovery run failed: {e}");
            s.state = DiscoveryState::Failed;
            s.detail = Some(e.to_string());
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MarketStatRow {
    skill_id: Uuid,
    mention_frequency: f64,
    last_seen: DateTime<Utc>,
}

/// One discovery run: ingest a batch (bounded by `ingest_timeout`), analyze it
/// against a catalog snapshot, and insert proposals. Returns the number of
/// proposals written.
///
/// The pending-item read, the proposal inserts, and the market-stat updates
/// share one transaction, so duplicate suppression cannot race a concurrent
/// writer into double-proposing a target. Any failure leaves the queue
/// untouched.
pub async fn run(
    pool: &PgPool,
    source: &dyn MarketSignalSource,
    ingest_timeout: Duration,
) -> Result<usize, AppError> {
    let batch = tokio::time::timeout(ingest_timeout, source.fetch_batch())
        .await
        .map_err(|_| {
            AppError::Discovery(format!(
                "Market signal ingestion exceeded {}s",
                ingest_timeout.as_secs()
            ))
        })??;

    let total_postings = batch.postings.len() as u32;
    if total_postings == 0 {
        info!("Discovery run: empty signal batch, nothing to propose");
        return Ok(0);
    }

    let snapshot = store::load_snapshot(pool).await?;
    let tally = tally_mentions(&batch, &snapshot);

    let mut tx = pool.begin().await?;

    let stat_rows: Vec<MarketStatRow> =
        sqlx::query_as("SELECT skill_id, mention_frequency, last_seen FROM skill_market_stats")
            .fetch_all(&mut *tx)
            .await?;
    let baseline: HashMap<Uuid, f64> = stat_rows
        .iter()
        .map(|r| (r.skill_id, r.mention_frequency))
        .collect();
    let last_seen: HashMap<Uuid, DateTime<Utc>> =
        stat_rows.iter().map(|r| (r.skill_id, r.last_seen)).collect();

    let mut proposals = propose_new_skills(&tally, total_postings);
    proposals.extend(propose_new_roles(&batch, &snapshot));
    proposals.extend(propose_obsolescence(
        &tally,
        &snapshot,
        &baseline,
        &last_seen,
        Utc::now(),
    ));

    // Duplicate suppression reads pending items inside the insert transaction.
    let pending_rows: Vec<PendingUpdateRow> =
        sqlx::query_as("SELECT * FROM pending_updates WHERE status = 'pending'")
            .fetch_all(&mut *tx)
            .await?;
    let pending_targets: HashSet<String> = pending_rows
        .into_iter()
        .filter_map(|row| row.into_update().ok())
        .map(|u| u.payload.target_key())
        .collect();
    let proposals = suppress_duplicates(proposals, &pending_targets);

    for proposal in &proposals {
        sqlx::query(
            "INSERT INTO pending_updates
                 (id, kind, payload, confidence, discovery_reason, status, created_at)
             VALUES ($1, $2, $3, $4, $5, 'pending', $6)",
        )
        .bind(proposal.id)
        .bind(proposal.payload.kind_str())
        .bind(proposal.payload.data_json())
        .bind(proposal.confidence)
        .bind(&proposal.discovery_reason)
        .bind(proposal.created_at)
        .execute(&mut *tx)
        .await?;
    }

    // Rolling frequency bookkeeping for the next run's baseline. This is
    // discovery-owned state, not the catalog.
    let now = Utc::now();
    for skill in snapshot.active_skills() {
        let count = tally.known.get(&skill.id).copied().unwrap_or(0);
        let old = baseline.get(&skill.id).copied().unwrap_or(0.0);
        let updated = 0.5 * old + 0.5 * f64::from(count);
        let seen_at = if count > 0 {
            now
        } else {
            last_seen.get(&skill.id).copied().unwrap_or(now)
        };
        sqlx::query(
            "INSERT INTO skill_market_stats (skill_id, mention_frequency, last_seen)
             VALUES ($1, $2, $3)
             ON CONFLICT (skill_id)
             DO UPDATE SET mention_frequency = $2, last_seen = $3",
        )
        .bind(skill.id)
        .bind(updated)
        .bind(seen_at)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    info!(
        "Discovery run complete: {} proposals from {} postings",
        proposals.len(),
        total_postings
    );
    Ok(proposals.len())
}

/// Runs discovery and publishes the outcome. The caller must have claimed the
/// run slot with `try_begin` first.
pub async fn run_and_publish(
    pool: PgPool,
    source: Arc<dyn MarketSignalSource>,
    ingest_timeout: Duration,
    status: SharedDiscoveryStatus,
) {
    let result = run(&pool, source.as_ref(), ingest_timeout).await;
    publish_outcome(&status, result).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared_idle() -> SharedDiscoveryStatus {
        Arc::new(RwLock::new(DiscoveryStatus::idle()))
    }

    #[tokio::test]
    async fn test_second_trigger_cannot_claim_a_running_slot() {
        let status = shared_idle();
        assert!(try_begin(&status).await);
        assert!(!try_begin(&status).await);
        assert_eq!(status.read().await.state, DiscoveryState::Running);
    }

    #[tokio::test]
    async fn test_slot_reopens_after_outcome_is_published() {
        let status = shared_idle();
        assert!(try_begin(&status).await);
        publish_outcome(&status, Ok(3)).await;
        {
            let s = status.read().await;
            assert_eq!(s.state, DiscoveryState::Completed);
            assert_eq!(s.proposed, Some(3));
            assert!(s.finished_at.is_some());
        }
        assert!(try_begin(&status).await);
    }

    #[tokio::test]
    async fn test_failed_run_publishes_detail() {
        let status = shared_idle();
        assert!(try_begin(&status).await);
        publish_outcome(
            &status,
            Err(AppError::Discovery(
                "Market signal ingestion exceeded 30s".to_string(),
            )),
        )
        .await;
        let s = status.read().await;
        assert_eq!(s.state, DiscoveryState::Failed);
        assert!(s.detail.as_deref().unwrap_or_default().contains("exceeded"));
    }
}
