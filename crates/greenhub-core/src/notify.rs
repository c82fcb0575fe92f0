//! Badge notifications.
//!
//! Delivery is best-effort: a failing sink is logged and counted, never
//! propagated, and never rolls back the grant that triggered it.

use crate::db::now_us;
use crate::model::Badge;
use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use serde::Serialize;
use tracing::warn;

/// A notification waiting to be delivered to its recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationRecord {
    pub user_id: String,
    pub message: String,
    pub badge_id: Option<String>,
}

/// Destination for notification records.
pub trait NotificationSink {
    /// Queue one record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record could not be queued.
    fn deliver(&self, record: &NotificationRecord) -> Result<()>;
}

/// Queues notifications in the hub database's `notifications` table.
pub struct StoreSink<'conn> {
    conn: &'conn Connection,
}

impl<'conn> StoreSink<'conn> {
    #[must_use]
    pub const fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl NotificationSink for StoreSink<'_> {
    fn deliver(&self, record: &NotificationRecord) -> Result<()> {
        let now = now_us();
        self.conn
            .execute(
                "INSERT INTO notifications (user_id, message, badge_id, is_read, created_at_us, updated_at_us)
                 VALUES (?1, ?2, ?3, 0, ?4, ?4)",
                params![record.user_id, record.message, record.badge_id, now],
            )
            .with_context(|| format!("queue notification for {}", record.user_id))?;
        Ok(())
    }
}

/// Message shown to a user who earned `badge_name`.
#[must_use]
pub fn badge_message(badge_name: &str) -> String {
    format!("Congratulations! You've earned the '{badge_name}' badge.")
}

/// Deliver one notification per newly granted badge.
///
/// Returns how many were delivered.
pub fn notify_badges(sink: &dyn NotificationSink, user_id: &str, badges: &[Badge]) -> usize {
    let mut delivered = 0;
    for badge in badges {
        let record = NotificationRecord {
            user_id: user_id.to_string(),
            message: badge_message(&badge.name),
            badge_id: Some(badge.badge_id.clone()),
        };
        match sink.deliver(&record) {
            Ok(()) => delivered += 1,
            Err(error) => warn!(
                user_id,
                badge = %badge.name,
                error = %error,
                "badge notification dropped"
            ),
        }
    }
    delivered
}

/// Mark one notification read. Only the recipient's own notifications match.
///
/// Returns `false` when no such notification exists for `user_id`.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn mark_read(conn: &Connection, user_id: &str, notification_id: i64) -> Result<bool> {
    let changed = conn
        .execute(
            "UPDATE notifications SET is_read = 1, updated_at_us = ?3
             WHERE notification_id = ?1 AND user_id = ?2",
            params![notification_id, user_id, now_us()],
        )
        .with_context(|| format!("mark notification {notification_id} read"))?;
    Ok(changed == 1)
}

/// Mark every unread notification for `user_id` read; returns the count changed.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn mark_all_read(conn: &Connection, user_id: &str) -> Result<usize> {
    conn.execute(
        "UPDATE notifications SET is_read = 1, updated_at_us = ?2
         WHERE user_id = ?1 AND is_read = 0",
        params![user_id, now_us()],
    )
    .with_context(|| format!("mark all notifications read for {user_id}"))
}
