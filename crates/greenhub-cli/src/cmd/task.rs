//! `glh task`: plan tasks and complete them for points.

use crate::cmd::{fail, open_hub, resolve_user};
use crate::output::{OutputMode, pretty_kv, pretty_section, render, render_mode};
use chrono::{Days, Local, NaiveDate};
use clap::{Args, Subcommand};
use greenhub_core::db::query;
use greenhub_core::model::TaskCategory;
use greenhub_core::pipeline::PipelineOutcome;
use std::io::{self, Write};
use std::path::Path;

#[derive(Args, Debug)]
pub struct TaskArgs {
    #[command(subcommand)]
    pub command: TaskCommand,
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Create an open task worth the configured task reward.
    Add {
        /// Owner (username or user id).
        #[arg(long)]
        user: String,
        /// Task title.
        #[arg(long)]
        title: String,
        /// exercise, nutrition or sustainability.
        #[arg(long, default_value = "exercise")]
        category: TaskCategory,
        /// Due date (YYYY-MM-DD). Defaults to one week from today.
        #[arg(long)]
        due: Option<NaiveDate>,
    },
    /// List a user's tasks.
    List {
        /// Owner (username or user id).
        #[arg(long)]
        user: String,
    },
    /// Mark a task completed and award its points.
    Done {
        /// Task id.
        id: String,
    },
}

pub fn run_task(args: &TaskArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let mut hub = open_hub(project_root, output)?;
    let pipeline = hub.pipeline();

    match &args.command {
        TaskCommand::Add {
            user,
            title,
            category,
            due,
        } => {
            let owner = resolve_user(&hub.conn, user, output)?;
            let due = due.unwrap_or_else(default_due);
            let task = pipeline
                .create_task(&hub.conn, &owner.user_id, title, *category, due)
                .map_err(|e| fail(output, e))?;
            render(output, &task, |t, w| {
                writeln!(
                    w,
                    "✓ Created task {} ({}, due {}, {} pts)",
                    t.task_id, t.category, t.due_date, t.points_reward
                )
            })
        }
        TaskCommand::List { user } => {
            let owner = resolve_user(&hub.conn, user, output)?;
            let tasks = query::list_tasks(&hub.conn, &owner.user_id)?;
            render_mode(
                output,
                &tasks,
                |tasks, w| {
                    for t in tasks {
                        writeln!(
                            w,
                            "{}\t{}\t{}\t{}\t{}",
                            t.task_id,
                            t.category,
                            t.due_date,
                            if t.is_completed { "done" } else { "open" },
                            t.title
                        )?;
                    }
                    Ok(())
                },
                |tasks, w| {
                    pretty_section(w, &format!("Tasks for {} ({})", owner.username, tasks.len()))?;
                    for t in tasks {
                        let mark = if t.is_completed { "[x]" } else { "[ ]" };
                        writeln!(
                            w,
                            "{mark} {}  {} ({}, due {})",
                            t.task_id, t.title, t.category, t.due_date
                        )?;
                    }
                    Ok(())
                },
            )
        }
        TaskCommand::Done { id } => {
            let outcome = pipeline
                .complete_task(&mut hub.conn, id)
                .map_err(|e| fail(output, e))?;
            render(output, &outcome, write_outcome)
        }
    }
}

fn default_due() -> NaiveDate {
    let today = Local::now().date_naive();
    today.checked_add_days(Days::new(7)).unwrap_or(today)
}

/// Human rendering shared by every command that triggers the pipeline.
pub fn write_outcome(outcome: &PipelineOutcome, w: &mut dyn Write) -> io::Result<()> {
    if outcome.already_processed {
        writeln!(w, "• {} was already awarded; nothing changed", outcome.event)?;
    } else {
        writeln!(w, "✓ +{} points for {}", outcome.points, outcome.event)?;
    }
    pretty_kv(w, "Total", outcome.total.to_string())?;
    for badge in &outcome.newly_granted {
        writeln!(w, "★ New badge: {} ({} pts)", badge.name, badge.points_required)?;
    }
    if outcome.badges_deferred {
        writeln!(w, "  Badges could not be granted now; `glh sweep` will grant them")?;
    }
    if outcome.notified < outcome.newly_granted.len() {
        writeln!(
            w,
            "  {} badge notification(s) could not be queued",
            outcome.newly_granted.len() - outcome.notified
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: TaskArgs,
    }

    #[test]
    fn add_parses_category_and_due() {
        let w = Wrapper::parse_from([
            "test",
            "add",
            "--user",
            "fern",
            "--title",
            "Swim",
            "--category",
            "Nutrition",
            "--due",
            "2026-11-02",
        ]);
        match w.args.command {
            TaskCommand::Add { category, due, .. } => {
                assert_eq!(category, TaskCategory::Nutrition);
                assert_eq!(due, NaiveDate::from_ymd_opt(2026, 11, 2));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn add_rejects_unknown_category() {
        let result = Wrapper::try_parse_from([
            "test", "add", "--user", "fern", "--title", "x", "--category", "knitting",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn default_due_is_in_the_future() {
        assert!(default_due() > Local::now().date_naive());
    }

    #[test]
    fn outcome_text_mentions_new_badges() {
        let outcome = PipelineOutcome {
            user_id: "u-1".into(),
            event: "task:t-1".into(),
            points: 10,
            total: 10,
            already_processed: false,
            newly_granted: vec![greenhub_core::model::Badge {
                badge_id: "b-1".into(),
                name: "Seedling".into(),
                description: String::new(),
                icon: String::new(),
                points_required: 0,
            }],
            notified: 1,
            badges_deferred: false,
        };
        let mut buf = Vec::new();
        write_outcome(&outcome, &mut buf).expect("write");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.contains("+10 points for task:t-1"));
        assert!(text.contains("New badge: Seedling"));
        assert!(!text.contains("glh sweep"));
    }
}
