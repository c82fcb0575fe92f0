use crate::cmd::open_hub;
use crate::output::{OutputMode, pretty_section, render_mode};
use clap::Args;
use greenhub_core::db::query;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

#[derive(Args, Debug)]
pub struct LeaderboardArgs {
    /// Number of rows to show. Defaults to `[leaderboard] size`.
    #[arg(long)]
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
struct Row {
    rank: usize,
    user_id: String,
    username: String,
    total_points: u64,
}

pub fn run_leaderboard(
    args: &LeaderboardArgs,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let hub = open_hub(project_root, output)?;
    let limit = args.limit.unwrap_or(hub.config.leaderboard.size);

    let rows: Vec<Row> = query::leaderboard(&hub.conn, limit)?
        .into_iter()
        .enumerate()
        .map(|(i, t)| Row {
            rank: i + 1,
            user_id: t.user_id,
            username: t.username,
            total_points: t.total_points,
        })
        .collect();

    render_mode(
        output,
        &rows,
        |rows, w| {
            for r in rows {
                writeln!(w, "{}\t{}\t{}", r.rank, r.username, r.total_points)?;
            }
            Ok(())
        },
        |rows, w| {
            pretty_section(w, "Leaderboard")?;
            for r in rows {
                writeln!(w, "{:>3}. {:<20} {:>8} pts", r.rank, r.username, r.total_points)?;
            }
            Ok(())
        },
    )
}
