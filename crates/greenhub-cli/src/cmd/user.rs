//! `glh user`: register and list hub members.

use crate::cmd::{fail, open_hub};
use crate::output::{OutputMode, format_us, pretty_kv, pretty_section, render, render_mode};
use clap::{Args, Subcommand};
use greenhub_core::db::query;
use std::io::Write;
use std::path::Path;

#[derive(Args, Debug)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Register a user with a zero points total.
    Add {
        /// Unique username.
        username: String,
        /// Unique email address.
        email: String,
    },
    /// List registered users.
    List,
}

pub fn run_user(args: &UserArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let mut hub = open_hub(project_root, output)?;

    match &args.command {
        UserCommand::Add { username, email } => {
            let user = hub
                .pipeline()
                .register_user(&mut hub.conn, username, email)
                .map_err(|e| fail(output, e))?;
            render(output, &user, |u, w| {
                writeln!(w, "✓ Registered {} ({})", u.username, u.user_id)
            })
        }
        UserCommand::List => {
            let users = query::list_users(&hub.conn)?;
            render_mode(
                output,
                &users,
                |users, w| {
                    for u in users {
                        writeln!(w, "{}\t{}\t{}", u.user_id, u.username, u.email)?;
                    }
                    Ok(())
                },
                |users, w| {
                    pretty_section(w, &format!("Users ({})", users.len()))?;
                    for u in users {
                        pretty_kv(
                            w,
                            &u.username,
                            format!("{}  joined {}", u.email, format_us(u.created_at_us)),
                        )?;
                    }
                    Ok(())
                },
            )
        }
    }
}
