//! Badge awarding and catalog management.
//!
//! [`award_badges`] grants every catalog badge whose threshold the user's
//! current total meets and that the user does not hold yet. Grants are
//! unique per `(user_id, badge_id)`; a conflicting insert means another
//! trigger granted the same badge first, and is skipped rather than
//! reported.

use crate::db::{now_us, query};
use crate::error::PipelineError;
use crate::model::{Badge, BadgeDef};
use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use std::collections::HashSet;
use tracing::{debug, info};

/// Grant all badges newly earned by `user_id`.
///
/// Returns only the badges granted by this call. The order among several
/// badges granted at once is unspecified.
///
/// # Errors
///
/// Returns [`PipelineError::Storage`] if reading the total/catalog fails or a
/// grant insert fails for a reason other than a duplicate grant. Grants
/// written before the failure remain.
pub fn award_badges(conn: &Connection, user_id: &str) -> Result<Vec<Badge>, PipelineError> {
    let total = query::current_total(conn, user_id)?;
    let held = held_badge_ids(conn, user_id)?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM badges b
         WHERE b.points_required <= ?1
         ORDER BY b.points_required ASC, b.name ASC",
        query::BADGE_COLUMNS
    ))?;
    let eligible = stmt
        .query_map([i64::try_from(total).unwrap_or(i64::MAX)], query::badge_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut granted = Vec::new();
    for badge in eligible {
        if held.contains(&badge.badge_id) {
            continue;
        }

        let inserted = conn.execute(
            "INSERT INTO user_badges (user_id, badge_id, awarded_at_us)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id, badge_id) DO NOTHING",
            params![user_id, badge.badge_id, now_us()],
        )?;
        if inserted == 0 {
            debug!(
                user_id,
                badge = %badge.name,
                "badge already granted by a concurrent trigger"
            );
            continue;
        }

        info!(user_id, badge = %badge.name, total, "badge granted");
        granted.push(badge);
    }

    Ok(granted)
}

fn held_badge_ids(conn: &Connection, user_id: &str) -> rusqlite::Result<HashSet<String>> {
    let mut stmt = conn.prepare("SELECT badge_id FROM user_badges WHERE user_id = ?1")?;
    let ids = stmt
        .query_map([user_id], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<HashSet<_>>>()?;
    Ok(ids)
}

/// Counts returned by [`sync_catalog`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CatalogSync {
    pub inserted: usize,
    pub updated: usize,
}

/// Upsert catalog definitions by badge name.
///
/// Existing badges keep their id (and therefore their grants); only the
/// description, icon and threshold are refreshed. Badges missing from `defs`
/// are left in place.
///
/// # Errors
///
/// Returns an error if a definition has an empty name or a write fails.
pub fn sync_catalog(conn: &mut Connection, defs: &[BadgeDef]) -> Result<CatalogSync> {
    let tx = conn.transaction().context("begin catalog sync")?;
    let mut stats = CatalogSync::default();

    for def in defs {
        let name = def.name.trim();
        anyhow::ensure!(!name.is_empty(), "badge name must not be empty");
        let threshold = i64::try_from(def.points_required)
            .with_context(|| format!("threshold for badge '{name}' is too large"))?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM badges WHERE name = ?1)",
            [name],
            |row| row.get(0),
        )?;

        tx.execute(
            "INSERT INTO badges (badge_id, name, description, icon, points_required)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(name) DO UPDATE SET
                 description = excluded.description,
                 icon = excluded.icon,
                 points_required = excluded.points_required",
            params![
                uuid::Uuid::new_v4().to_string(),
                name,
                def.description,
                def.icon,
                threshold
            ],
        )
        .with_context(|| format!("upsert badge '{name}'"))?;

        if exists {
            stats.updated += 1;
        } else {
            stats.inserted += 1;
        }
    }

    tx.commit().context("commit catalog sync")?;
    info!(
        inserted = stats.inserted,
        updated = stats.updated,
        "badge catalog synced"
    );
    Ok(stats)
}
