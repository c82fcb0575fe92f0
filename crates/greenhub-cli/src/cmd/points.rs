//! `glh points`: a user's total and, optionally, their ledger.

use crate::cmd::{open_hub, resolve_user};
use crate::output::{OutputMode, format_us, pretty_kv, pretty_rule, pretty_section, render_mode};
use clap::Args;
use greenhub_core::db::query;
use greenhub_core::model::LedgerEntry;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

#[derive(Args, Debug)]
pub struct PointsArgs {
    /// User (username or user id).
    pub user: String,

    /// Include ledger entries, newest first.
    #[arg(long)]
    pub history: bool,
}

#[derive(Debug, Serialize)]
struct PointsView {
    user_id: String,
    username: String,
    total_points: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_updated_us: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    history: Option<Vec<LedgerEntry>>,
}

pub fn run_points(args: &PointsArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let hub = open_hub(project_root, output)?;
    let user = resolve_user(&hub.conn, &args.user, output)?;
    let total = query::points_total(&hub.conn, &user.user_id)?;

    let history = if args.history {
        Some(query::ledger_for_user(&hub.conn, &user.user_id)?)
    } else {
        None
    };

    let view = PointsView {
        user_id: user.user_id,
        username: user.username,
        total_points: total.as_ref().map_or(0, |t| t.total_points),
        last_updated_us: total.map(|t| t.last_updated_us),
        history,
    };

    render_mode(
        output,
        &view,
        |v, w| {
            writeln!(w, "{}\t{}", v.username, v.total_points)?;
            for entry in v.history.iter().flatten() {
                writeln!(
                    w,
                    "{}\t{}\t{}\t{}",
                    entry.entry_id, entry.amount, entry.source, entry.reference_id
                )?;
            }
            Ok(())
        },
        |v, w| {
            pretty_section(w, &format!("Points for {}", v.username))?;
            pretty_kv(w, "Total", v.total_points.to_string())?;
            if let Some(us) = v.last_updated_us {
                pretty_kv(w, "Updated", format_us(us))?;
            }
            if let Some(history) = &v.history {
                writeln!(w)?;
                pretty_rule(w)?;
                for entry in history {
                    writeln!(
                        w,
                        "{}  +{:<5} {:<22} {}",
                        format_us(entry.created_at_us),
                        entry.amount,
                        entry.source.as_str(),
                        entry.reference_id
                    )?;
                }
            }
            Ok(())
        },
    )
}
