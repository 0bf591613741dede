use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::moderation::models::{
    Decision, PendingUpdate, PendingUpdateRow, UpdateStatus,
};
use crate::ontology::store;

/// Pending items in insertion order, optionally filtered by kind
/// ("skill" | "role" | "review_obsolete").
pub async fn list_pending(
    pool: &PgPool,
    kind: Option<&str>,
) -> Result<Vec<PendingUpdate>, AppError> {
    let rows: Vec<PendingUpdateRow> = match kind {
        Some(kind) => {
            sqlx::query_as(
                "SELECT * FROM pending_updates
                 WHERE status = 'pending' AND kind = $1
                 ORDER BY created_at ASC, id ASC",
            )
            .bind(kind)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as(
                "SELECT * FROM pending_updates
                 WHERE status = 'pending'
                 ORDER BY created_at ASC, id ASC",
            )
            .fetch_all(pool)
            .await?
        }
    };

    rows.into_iter().map(|row| row.into_update()).collect()
}

/// Pure transition gate over a locked row: only `pending` may move, and it
/// moves exactly once, to the decision's terminal status.
fn next_status(
    update_id: Uuid,
    current: &str,
    decision: Decision,
) -> Result<UpdateStatus, AppError> {
    if current != UpdateStatus::Pending.as_str() {
        return Err(AppError::AlreadyResolved(format!(
            "Update {update_id} was already {current}"
        )));
    }
    Ok(match decision {
        Decision::Approve => UpdateStatus::Approved,
        Decision::Reject => UpdateStatus::Rejected,
    })
}

/// Resolves a pending item: pending → {approved, rejected}, both terminal.
///
/// The row is locked for the duration of the transaction, so of two concurrent
/// reviews of the same id exactly one observes `pending`; the loser fails with
/// `AlreadyResolved`. An approval whose catalog commit fails (conflict or
/// validation) rolls back entirely — the item stays pending and the underlying
/// error is surfaced to the reviewer.
pub async fn review(
    pool: &PgPool,
    update_id: Uuid,
    decision: Decision,
    reviewer: &str,
) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let row: Option<PendingUpdateRow> =
        sqlx::query_as("SELECT * FROM pending_updates WHERE id = $1 FOR UPDATE")
            .bind(update_id)
            .fetch_optional(&mut *tx)
            .await?;

    let row = row
        .ok_or_else(|| AppError::NotFound(format!("Pending update {update_id} not found")))?;

    let final_status = next_status(update_id, &row.status, decision)?;
    if final_status == UpdateStatus::Approved {
        let update = row.into_update()?;
        store::apply_update(&mut tx, &update).await?;
    }

    sqlx::query(
        "UPDATE pending_updates
         SET status = $2, resolved_at = now(), resolved_by = $3
         WHERE id = $1",
    )
    .bind(update_id)
    .bind(final_status.as_str())
    .bind(reviewer)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(
        "Update {update_id} {} by {reviewer}",
        final_status.as_str()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_item_approves() {
        let id = Uuid::new_v4();
        assert_eq!(
            next_status(id, "pending", Decision::Approve).unwrap(),
            UpdateStatus::Approved
        );
    }

    #[test]
    fn test_pending_item_rejects() {
        let id = Uuid::new_v4();
        assert_eq!(
            next_status(id, "pending", Decision::Reject).unwrap(),
            UpdateStatus::Rejected
        );
    }

    #[test]
    fn test_resolved_statuses_are_terminal() {
        let id = Uuid::new_v4();
        for resolved in ["approved", "rejected"] {
            for decision in [Decision::Approve, Decision::Reject] {
                assert!(matches!(
                    next_status(id, resolved, decision),
                    Err(AppError::AlreadyResolved(_))
                ));
            }
        }
    }
}
