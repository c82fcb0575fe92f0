//! The award transaction: one ledger entry and one total update per event.
//!
//! # Atomicity
//!
//! [`apply`] claims the event's processed flag, appends the ledger entry and
//! bumps the user's total using whatever transaction the caller holds. If any
//! statement fails the caller drops the transaction, so the ledger, the total
//! and the flag roll back together and the event can be retried.
//!
//! # Concurrency
//!
//! [`award_points`] opens the transaction with `BEGIN IMMEDIATE`. SQLite then
//! hands out the write lock before the flag is read, so two triggers for the
//! same event (or two events for the same user) are serialized: the second
//! one waits on the busy timeout and then sees the flag already set.

use crate::db::{now_us, query};
use crate::error::PipelineError;
use crate::model::EventKey;
use rusqlite::{Connection, TransactionBehavior, params};
use serde::Serialize;
use tracing::{debug, info};

/// Inputs for one award.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwardRequest {
    pub user_id: String,
    /// Points to add. Zero is recorded in the ledger like any other amount.
    pub points: u32,
    /// The completion event whose processed flag guards this award.
    pub event: EventKey,
}

/// Result of an award attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AwardOutcome {
    /// A new ledger entry was written.
    Awarded { total: u64, entry_id: i64 },
    /// The event had already been processed; nothing was written.
    AlreadyProcessed { total: u64 },
}

impl AwardOutcome {
    /// The user's total after this attempt.
    #[must_use]
    pub const fn total(&self) -> u64 {
        match self {
            Self::Awarded { total, .. } | Self::AlreadyProcessed { total } => *total,
        }
    }

    #[must_use]
    pub const fn is_already_processed(&self) -> bool {
        matches!(self, Self::AlreadyProcessed { .. })
    }
}

/// Run [`apply`] inside its own `BEGIN IMMEDIATE` transaction.
///
/// # Errors
///
/// Returns [`PipelineError::UserNotFound`] or an event-not-found variant when
/// the referenced rows do not exist, and [`PipelineError::Storage`] when a
/// write fails. No state is changed on error.
pub fn award_points(
    conn: &mut Connection,
    request: &AwardRequest,
) -> Result<AwardOutcome, PipelineError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let outcome = apply(&tx, request)?;
    tx.commit()?;
    Ok(outcome)
}

/// Claim the event, append the ledger entry and add to the user's total.
///
/// Must run inside a write transaction owned by the caller; on error the
/// caller must not commit.
///
/// # Errors
///
/// See [`award_points`].
pub fn apply(conn: &Connection, request: &AwardRequest) -> Result<AwardOutcome, PipelineError> {
    let user_id = request.user_id.as_str();
    if !query::user_exists(conn, user_id)? {
        return Err(PipelineError::UserNotFound(user_id.to_string()));
    }

    if !claim_event(conn, &request.event, user_id)? {
        if !event_exists(conn, &request.event, user_id)? {
            return Err(event_not_found(&request.event));
        }
        let total = query::current_total(conn, user_id)?;
        debug!(event = %request.event, user_id, total, "event already processed; skipping award");
        return Ok(AwardOutcome::AlreadyProcessed { total });
    }

    let now = now_us();
    let source = request.event.source();

    conn.execute(
        "INSERT INTO points_ledger (user_id, amount, source, reference_id, created_at_us)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            user_id,
            i64::from(request.points),
            source.as_str(),
            request.event.reference_id(),
            now
        ],
    )?;
    let entry_id = conn.last_insert_rowid();

    conn.execute(
        "INSERT INTO user_points (user_id, total_points, last_updated_us)
         VALUES (?1, 0, ?2)
         ON CONFLICT(user_id) DO NOTHING",
        params![user_id, now],
    )?;
    conn.execute(
        "UPDATE user_points
         SET total_points = total_points + ?2, last_updated_us = ?3
         WHERE user_id = ?1",
        params![user_id, i64::from(request.points), now],
    )?;

    let total = query::current_total(conn, user_id)?;
    info!(
        event = %request.event,
        user_id,
        points = request.points,
        total,
        entry_id,
        "points awarded"
    );

    Ok(AwardOutcome::Awarded { total, entry_id })
}

/// Flip the processed flag from 0 to 1. Returns `false` if it was already set
/// or the event does not belong to `user_id`.
fn claim_event(conn: &Connection, event: &EventKey, user_id: &str) -> rusqlite::Result<bool> {
    let (table, id_column) = event.table();
    let changed = conn.execute(
        &format!(
            "UPDATE {table} SET points_processed = 1
             WHERE {id_column} = ?1 AND user_id = ?2 AND points_processed = 0"
        ),
        params![event.reference_id(), user_id],
    )?;
    Ok(changed == 1)
}

fn event_exists(conn: &Connection, event: &EventKey, user_id: &str) -> rusqlite::Result<bool> {
    let (table, id_column) = event.table();
    conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE {id_column} = ?1 AND user_id = ?2)"),
        params![event.reference_id(), user_id],
        |row| row.get(0),
    )
}

pub(crate) fn event_not_found(event: &EventKey) -> PipelineError {
    match event {
        EventKey::Task(id) => PipelineError::TaskNotFound(id.clone()),
        EventKey::Action(id) => PipelineError::ActionNotFound(id.clone()),
        EventKey::Bonus(id) => PipelineError::BonusNotFound(id.clone()),
    }
}
