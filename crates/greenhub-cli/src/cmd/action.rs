//! `glh action`: log sustainability actions and retry unprocessed ones.

use crate::cmd::task::write_outcome;
use crate::cmd::{fail, open_hub, resolve_user};
use crate::output::{OutputMode, format_us, pretty_section, render, render_mode};
use clap::{Args, Subcommand};
use greenhub_core::db::query;
use greenhub_core::model::SustainabilityAction;
use greenhub_core::pipeline::PipelineOutcome;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

#[derive(Args, Debug)]
pub struct ActionArgs {
    #[command(subcommand)]
    pub command: ActionCommand,
}

#[derive(Subcommand, Debug)]
pub enum ActionCommand {
    /// Record an action and award `floor(value * rate)` points.
    Log {
        /// Actor (username or user id).
        #[arg(long)]
        user: String,
        /// Action type, e.g. recycle, bike, public_transport.
        action_type: String,
        /// Measured quantity (kg, km, trips...).
        #[arg(allow_negative_numbers = true)]
        value: f64,
    },
    /// List a user's recorded actions.
    List {
        /// Actor (username or user id).
        #[arg(long)]
        user: String,
    },
    /// Award the points of an action whose earlier award failed.
    Retry {
        /// Action id.
        id: String,
    },
    /// Show the active rate table.
    Rates,
}

#[derive(Debug, Serialize)]
struct LoggedAction {
    action: SustainabilityAction,
    outcome: PipelineOutcome,
}

#[derive(Debug, Serialize)]
struct RateRow {
    action_type: String,
    rate: u32,
}

pub fn run_action(args: &ActionArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let mut hub = open_hub(project_root, output)?;
    let pipeline = hub.pipeline();

    match &args.command {
        ActionCommand::Log {
            user,
            action_type,
            value,
        } => {
            let actor = resolve_user(&hub.conn, user, output)?;
            let (action, outcome) = pipeline
                .log_action(&mut hub.conn, &actor.user_id, action_type, *value)
                .map_err(|e| fail(output, e))?;
            render(output, &LoggedAction { action, outcome }, |logged, w| {
                writeln!(
                    w,
                    "Logged {} × {} ({})",
                    logged.action.action_type, logged.action.value, logged.action.action_id
                )?;
                write_outcome(&logged.outcome, w)
            })
        }
        ActionCommand::List { user } => {
            let actor = resolve_user(&hub.conn, user, output)?;
            let actions = query::list_actions(&hub.conn, &actor.user_id)?;
            render_mode(
                output,
                &actions,
                |actions, w| {
                    for a in actions {
                        writeln!(
                            w,
                            "{}\t{}\t{}\t{}\t{}",
                            a.action_id,
                            a.action_type,
                            a.value,
                            a.points_earned,
                            if a.points_processed { "awarded" } else { "pending" }
                        )?;
                    }
                    Ok(())
                },
                |actions, w| {
                    let heading = format!("Actions for {} ({})", actor.username, actions.len());
                    pretty_section(w, &heading)?;
                    for a in actions {
                        let pending = if a.points_processed { "" } else { "  (pending)" };
                        writeln!(
                            w,
                            "{}  {:<18} {:>8}  {:>5} pts  {}{pending}",
                            format_us(a.created_at_us),
                            a.action_type,
                            a.value,
                            a.points_earned,
                            a.action_id
                        )?;
                    }
                    Ok(())
                },
            )
        }
        ActionCommand::Retry { id } => {
            let outcome = pipeline
                .process_action(&mut hub.conn, id)
                .map_err(|e| fail(output, e))?;
            render(output, &outcome, write_outcome)
        }
        ActionCommand::Rates => {
            let rows: Vec<RateRow> = pipeline
                .rates()
                .iter()
                .map(|(action_type, rate)| RateRow {
                    action_type: action_type.to_string(),
                    rate,
                })
                .collect();
            let default_rate = pipeline.rates().default_rate();
            render(output, &rows, |rows, w| {
                for row in rows {
                    writeln!(w, "{:<20} {}", row.action_type, row.rate)?;
                }
                writeln!(w, "{:<20} {default_rate}", "(other)")
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: ActionArgs,
    }

    #[test]
    fn log_parses_type_and_value() {
        let w = Wrapper::parse_from(["test", "log", "--user", "fern", "recycle", "3.5"]);
        match w.args.command {
            ActionCommand::Log {
                action_type, value, ..
            } => {
                assert_eq!(action_type, "recycle");
                assert!((value - 3.5).abs() < f64::EPSILON);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn log_rejects_non_numeric_value() {
        assert!(Wrapper::try_parse_from(["test", "log", "--user", "fern", "bike", "far"]).is_err());
    }
}
