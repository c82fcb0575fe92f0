//! `glh notifications`: badge notices queued for a user.

use crate::cmd::{open_hub, resolve_user};
use crate::output::{
    CliError, OutputMode, format_us, pretty_section, render, render_error, render_mode,
};
use clap::{Args, Subcommand};
use greenhub_core::db::query;
use greenhub_core::error::ErrorCode;
use greenhub_core::notify::{mark_all_read, mark_read};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

#[derive(Args, Debug)]
pub struct NotificationsArgs {
    #[command(subcommand)]
    pub command: NotificationsCommand,
}

#[derive(Subcommand, Debug)]
pub enum NotificationsCommand {
    /// List a user's notifications, newest first.
    List {
        /// Recipient (username or user id).
        user: String,
        /// Only unread notifications.
        #[arg(long)]
        unread: bool,
    },
    /// Mark one notification read.
    Read {
        /// Recipient (username or user id).
        user: String,
        /// Notification id.
        id: i64,
    },
    /// Mark all of a user's notifications read.
    ReadAll {
        /// Recipient (username or user id).
        user: String,
    },
}

#[derive(Debug, Serialize)]
struct ReadResult {
    marked: usize,
}

pub fn run_notifications(
    args: &NotificationsArgs,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let hub = open_hub(project_root, output)?;

    match &args.command {
        NotificationsCommand::List { user, unread } => {
            let recipient = resolve_user(&hub.conn, user, output)?;
            let notes = query::list_notifications(&hub.conn, &recipient.user_id, *unread)?;
            render_mode(
                output,
                &notes,
                |notes, w| {
                    for n in notes {
                        writeln!(
                            w,
                            "{}\t{}\t{}",
                            n.notification_id,
                            if n.is_read { "read" } else { "unread" },
                            n.message
                        )?;
                    }
                    Ok(())
                },
                |notes, w| {
                    pretty_section(w, &format!("Notifications for {}", recipient.username))?;
                    for n in notes {
                        let dot = if n.is_read { " " } else { "●" };
                        writeln!(
                            w,
                            "{dot} #{:<4} {}  {}",
                            n.notification_id,
                            format_us(n.created_at_us),
                            n.message
                        )?;
                    }
                    Ok(())
                },
            )
        }
        NotificationsCommand::Read { user, id } => {
            let recipient = resolve_user(&hub.conn, user, output)?;
            if !mark_read(&hub.conn, &recipient.user_id, *id)? {
                render_error(
                    output,
                    &CliError::from_code(
                        ErrorCode::NotificationNotFound,
                        format!("notification {id} not found for {}", recipient.username),
                    ),
                )?;
                anyhow::bail!("notification {id} not found");
            }
            render(output, &ReadResult { marked: 1 }, |_, w| {
                writeln!(w, "✓ Marked notification {id} read")
            })
        }
        NotificationsCommand::ReadAll { user } => {
            let recipient = resolve_user(&hub.conn, user, output)?;
            let marked = mark_all_read(&hub.conn, &recipient.user_id)?;
            render(output, &ReadResult { marked }, |r, w| {
                writeln!(w, "✓ Marked {} notification(s) read", r.marked)
            })
        }
    }
}
