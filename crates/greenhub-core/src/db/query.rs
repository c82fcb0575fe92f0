//! SQLite query helpers for the hub database.
//!
//! Read paths used by the CLI and by tests: totals, ledger history,
//! leaderboard, catalog, grants, notifications and events. All functions take
//! a shared `&Connection` and return typed structs (never raw rows).

use crate::model::{
    Badge, BadgeGrant, Bonus, LedgerEntry, Notification, PointSource, PointsTotal,
    SustainabilityAction, Task, TaskCategory, User,
};
use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, Row, params, types::Type};
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Column conversion
// ---------------------------------------------------------------------------

fn conversion_error(
    idx: usize,
    ty: Type,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(err))
}

pub(crate) fn column_u64(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let raw: i64 = row.get(idx)?;
    u64::try_from(raw).map_err(|err| conversion_error(idx, Type::Integer, err))
}

pub(crate) fn column_u32(row: &Row<'_>, idx: usize) -> rusqlite::Result<u32> {
    let raw: i64 = row.get(idx)?;
    u32::try_from(raw).map_err(|err| conversion_error(idx, Type::Integer, err))
}

pub(crate) fn column_parsed<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|err| conversion_error(idx, Type::Text, err))
}

// ---------------------------------------------------------------------------
// Row mappers
// ---------------------------------------------------------------------------

const USER_COLUMNS: &str = "user_id, username, email, created_at_us";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        user_id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        created_at_us: row.get(3)?,
    })
}

pub(crate) const BADGE_COLUMNS: &str = "b.badge_id, b.name, b.description, b.icon, b.points_required";

pub(crate) fn badge_from_row(row: &Row<'_>) -> rusqlite::Result<Badge> {
    Ok(Badge {
        badge_id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        icon: row.get(3)?,
        points_required: column_u64(row, 4)?,
    })
}

fn ledger_from_row(row: &Row<'_>) -> rusqlite::Result<LedgerEntry> {
    Ok(LedgerEntry {
        entry_id: row.get(0)?,
        user_id: row.get(1)?,
        amount: column_u32(row, 2)?,
        source: column_parsed::<PointSource>(row, 3)?,
        reference_id: row.get(4)?,
        created_at_us: row.get(5)?,
    })
}

fn total_from_row(row: &Row<'_>) -> rusqlite::Result<PointsTotal> {
    Ok(PointsTotal {
        user_id: row.get(0)?,
        username: row.get(1)?,
        total_points: column_u64(row, 2)?,
        last_updated_us: row.get(3)?,
    })
}

const NOTIFICATION_COLUMNS: &str =
    "notification_id, user_id, message, badge_id, is_read, created_at_us, updated_at_us";

fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        notification_id: row.get(0)?,
        user_id: row.get(1)?,
        message: row.get(2)?,
        badge_id: row.get(3)?,
        is_read: row.get(4)?,
        created_at_us: row.get(5)?,
        updated_at_us: row.get(6)?,
    })
}

const TASK_COLUMNS: &str = "task_id, user_id, title, category, due_date, points_reward, \
     is_completed, points_processed, created_at_us";

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        task_id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        category: column_parsed::<TaskCategory>(row, 3)?,
        due_date: row.get(4)?,
        points_reward: column_u32(row, 5)?,
        is_completed: row.get(6)?,
        points_processed: row.get(7)?,
        created_at_us: row.get(8)?,
    })
}

const ACTION_COLUMNS: &str =
    "action_id, user_id, action_type, value, points_earned, points_processed, created_at_us";

fn action_from_row(row: &Row<'_>) -> rusqlite::Result<SustainabilityAction> {
    Ok(SustainabilityAction {
        action_id: row.get(0)?,
        user_id: row.get(1)?,
        action_type: row.get(2)?,
        value: row.get(3)?,
        points_earned: column_u32(row, 4)?,
        points_processed: row.get(5)?,
        created_at_us: row.get(6)?,
    })
}

const BONUS_COLUMNS: &str = "bonus_id, user_id, amount, reason, points_processed, created_at_us";

fn bonus_from_row(row: &Row<'_>) -> rusqlite::Result<Bonus> {
    Ok(Bonus {
        bonus_id: row.get(0)?,
        user_id: row.get(1)?,
        amount: column_u32(row, 2)?,
        reason: row.get(3)?,
        points_processed: row.get(4)?,
        created_at_us: row.get(5)?,
    })
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Whether a user row exists.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn user_exists(conn: &Connection, user_id: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE user_id = ?1)",
        [user_id],
        |row| row.get(0),
    )
}

/// Look a user up by id or by username.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn find_user(conn: &Connection, name_or_id: &str) -> Result<Option<User>> {
    let needle = name_or_id.trim();
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1 OR username = ?1 LIMIT 1"),
        [needle],
        user_from_row,
    )
    .optional()
    .with_context(|| format!("find user '{needle}'"))
}

/// All users ordered by username.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_users(conn: &Connection) -> Result<Vec<User>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY username ASC"))
        .context("prepare list_users")?;
    let rows = stmt
        .query_map([], user_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("list users")?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Points
// ---------------------------------------------------------------------------

/// Current total for a user; zero when no total row exists yet.
///
/// # Errors
///
/// Returns an error if the query fails or the stored total is negative.
pub fn current_total(conn: &Connection, user_id: &str) -> rusqlite::Result<u64> {
    conn.query_row(
        "SELECT total_points FROM user_points WHERE user_id = ?1",
        [user_id],
        |row| column_u64(row, 0),
    )
    .optional()
    .map(Option::unwrap_or_default)
}

/// The user's points row joined with their username.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn points_total(conn: &Connection, user_id: &str) -> Result<Option<PointsTotal>> {
    conn.query_row(
        "SELECT p.user_id, u.username, p.total_points, p.last_updated_us
         FROM user_points p
         JOIN users u ON u.user_id = p.user_id
         WHERE p.user_id = ?1",
        [user_id],
        total_from_row,
    )
    .optional()
    .with_context(|| format!("points total for {user_id}"))
}

/// Ledger entries for a user, newest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn ledger_for_user(conn: &Connection, user_id: &str) -> Result<Vec<LedgerEntry>> {
    let mut stmt = conn
        .prepare(
            "SELECT entry_id, user_id, amount, source, reference_id, created_at_us
             FROM points_ledger
             WHERE user_id = ?1
             ORDER BY created_at_us DESC, entry_id DESC",
        )
        .context("prepare ledger_for_user")?;
    let rows = stmt
        .query_map([user_id], ledger_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .with_context(|| format!("ledger for {user_id}"))?;
    Ok(rows)
}

/// Sum of a user's ledger amounts.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn ledger_sum(conn: &Connection, user_id: &str) -> Result<u64> {
    conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM points_ledger WHERE user_id = ?1",
        [user_id],
        |row| column_u64(row, 0),
    )
    .with_context(|| format!("ledger sum for {user_id}"))
}

/// Top `limit` users by total, ties broken by username.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn leaderboard(conn: &Connection, limit: u32) -> Result<Vec<PointsTotal>> {
    let mut stmt = conn
        .prepare(
            "SELECT p.user_id, u.username, p.total_points, p.last_updated_us
             FROM user_points p
             JOIN users u ON u.user_id = p.user_id
             ORDER BY p.total_points DESC, u.username ASC
             LIMIT ?1",
        )
        .context("prepare leaderboard")?;
    let rows = stmt
        .query_map([i64::from(limit)], total_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("leaderboard")?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Badges
// ---------------------------------------------------------------------------

/// The badge catalog ordered by threshold.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_badges(conn: &Connection) -> Result<Vec<Badge>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {BADGE_COLUMNS} FROM badges b ORDER BY b.points_required ASC, b.name ASC"
        ))
        .context("prepare list_badges")?;
    let rows = stmt
        .query_map([], badge_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("list badges")?;
    Ok(rows)
}

/// Badges held by a user, oldest grant first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn user_badges(conn: &Connection, user_id: &str) -> Result<Vec<BadgeGrant>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {BADGE_COLUMNS}, g.user_id, g.awarded_at_us
             FROM user_badges g
             JOIN badges b ON b.badge_id = g.badge_id
             WHERE g.user_id = ?1
             ORDER BY g.awarded_at_us ASC, b.points_required ASC"
        ))
        .context("prepare user_badges")?;
    let rows = stmt
        .query_map([user_id], |row| {
            Ok(BadgeGrant {
                badge: badge_from_row(row)?,
                user_id: row.get(5)?,
                awarded_at_us: row.get(6)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()
        .with_context(|| format!("badges for {user_id}"))?;
    Ok(rows)
}

/// Number of grant rows for one user/badge pair (0 or 1).
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn grant_count(conn: &Connection, user_id: &str, badge_id: &str) -> Result<usize> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM user_badges WHERE user_id = ?1 AND badge_id = ?2",
            params![user_id, badge_id],
            |row| row.get(0),
        )
        .context("count grants")?;
    Ok(usize::try_from(count).unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// A user's notifications, newest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_notifications(
    conn: &Connection,
    user_id: &str,
    unread_only: bool,
) -> Result<Vec<Notification>> {
    let filter = if unread_only { " AND is_read = 0" } else { "" };
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {NOTIFICATION_COLUMNS}
             FROM notifications
             WHERE user_id = ?1{filter}
             ORDER BY created_at_us DESC, notification_id DESC"
        ))
        .context("prepare list_notifications")?;
    let rows = stmt
        .query_map([user_id], notification_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .with_context(|| format!("notifications for {user_id}"))?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Fetch one task by id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_task(conn: &Connection, task_id: &str) -> Result<Option<Task>> {
    conn.query_row(
        &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE task_id = ?1"),
        [task_id],
        task_from_row,
    )
    .optional()
    .with_context(|| format!("get task {task_id}"))
}

/// A user's tasks: open first, then by due date.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_tasks(conn: &Connection, user_id: &str) -> Result<Vec<Task>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE user_id = ?1
             ORDER BY is_completed ASC, due_date ASC, created_at_us ASC"
        ))
        .context("prepare list_tasks")?;
    let rows = stmt
        .query_map([user_id], task_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .with_context(|| format!("tasks for {user_id}"))?;
    Ok(rows)
}

/// Fetch one sustainability action by id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_action(conn: &Connection, action_id: &str) -> Result<Option<SustainabilityAction>> {
    conn.query_row(
        &format!("SELECT {ACTION_COLUMNS} FROM sustainability_actions WHERE action_id = ?1"),
        [action_id],
        action_from_row,
    )
    .optional()
    .with_context(|| format!("get action {action_id}"))
}

/// A user's logged actions, newest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_actions(conn: &Connection, user_id: &str) -> Result<Vec<SustainabilityAction>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {ACTION_COLUMNS} FROM sustainability_actions
             WHERE user_id = ?1
             ORDER BY created_at_us DESC, action_id ASC"
        ))
        .context("prepare list_actions")?;
    let rows = stmt
        .query_map([user_id], action_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .with_context(|| format!("actions for {user_id}"))?;
    Ok(rows)
}

/// Fetch one bonus by id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_bonus(conn: &Connection, bonus_id: &str) -> Result<Option<Bonus>> {
    conn.query_row(
        &format!("SELECT {BONUS_COLUMNS} FROM bonuses WHERE bonus_id = ?1"),
        [bonus_id],
        bonus_from_row,
    )
    .optional()
    .with_context(|| format!("get bonus {bonus_id}"))
}
