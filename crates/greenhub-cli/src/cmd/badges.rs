//! `glh badges`: the catalog, a user's grants, and catalog sync.

use crate::cmd::{open_hub, resolve_user};
use crate::output::{OutputMode, format_us, pretty_kv, pretty_section, render, render_mode};
use clap::{Args, Subcommand};
use greenhub_core::badges::{award_badges, sync_catalog};
use greenhub_core::config::config_path;
use greenhub_core::db::query;
use greenhub_core::notify::{StoreSink, notify_badges};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

#[derive(Args, Debug)]
#[command(args_conflicts_with_subcommands = true)]
pub struct BadgesArgs {
    /// Show badges held by this user instead of the catalog.
    #[arg(long)]
    pub mine: Option<String>,

    #[command(subcommand)]
    pub command: Option<BadgesCommand>,
}

#[derive(Subcommand, Debug)]
pub enum BadgesCommand {
    /// Upsert the `[[badges]]` catalog from config, then grant what users already earned.
    Sync,
}

#[derive(Debug, Serialize)]
struct SyncReport {
    inserted: usize,
    updated: usize,
    granted: usize,
    notified: usize,
}

pub fn run_badges(args: &BadgesArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let mut hub = open_hub(project_root, output)?;

    if let Some(BadgesCommand::Sync) = args.command {
        let synced = sync_catalog(&mut hub.conn, &hub.config.catalog())?;

        // Thresholds may have dropped; backfill grants for everyone.
        let mut granted = 0;
        let mut notified = 0;
        for user in query::list_users(&hub.conn)? {
            let badges = award_badges(&hub.conn, &user.user_id)?;
            notified += notify_badges(&StoreSink::new(&hub.conn), &user.user_id, &badges);
            granted += badges.len();
        }

        let report = SyncReport {
            inserted: synced.inserted,
            updated: synced.updated,
            granted,
            notified,
        };
        let source = config_path(&hub.root);
        return render(output, &report, |r, w| {
            writeln!(w, "✓ Synced badge catalog from {}", source.display())?;
            pretty_kv(w, "Inserted", r.inserted.to_string())?;
            pretty_kv(w, "Updated", r.updated.to_string())?;
            pretty_kv(w, "Granted", r.granted.to_string())
        });
    }

    if let Some(needle) = &args.mine {
        let user = resolve_user(&hub.conn, needle, output)?;
        let grants = query::user_badges(&hub.conn, &user.user_id)?;
        return render_mode(
            output,
            &grants,
            |grants, w| {
                for g in grants {
                    writeln!(w, "{}\t{}\t{}", g.badge.badge_id, g.badge.name, g.awarded_at_us)?;
                }
                Ok(())
            },
            |grants, w| {
                let heading = format!("Badges held by {} ({})", user.username, grants.len());
                pretty_section(w, &heading)?;
                for g in grants {
                    writeln!(
                        w,
                        "★ {:<16} earned {}",
                        g.badge.name,
                        format_us(g.awarded_at_us)
                    )?;
                }
                Ok(())
            },
        );
    }

    let catalog = query::list_badges(&hub.conn)?;
    render_mode(
        output,
        &catalog,
        |catalog, w| {
            for b in catalog {
                writeln!(w, "{}\t{}\t{}", b.badge_id, b.name, b.points_required)?;
            }
            Ok(())
        },
        |catalog, w| {
            pretty_section(w, &format!("Badge catalog ({})", catalog.len()))?;
            for b in catalog {
                writeln!(w, "{:>6} pts  {:<16} {}", b.points_required, b.name, b.description)?;
            }
            Ok(())
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: BadgesArgs,
    }

    #[test]
    fn bare_badges_lists_catalog() {
        let w = Wrapper::parse_from(["test"]);
        assert!(w.args.mine.is_none());
        assert!(w.args.command.is_none());
    }

    #[test]
    fn mine_and_sync_parse() {
        let w = Wrapper::parse_from(["test", "--mine", "fern"]);
        assert_eq!(w.args.mine.as_deref(), Some("fern"));

        let w = Wrapper::parse_from(["test", "sync"]);
        assert!(matches!(w.args.command, Some(BadgesCommand::Sync)));
    }
}
