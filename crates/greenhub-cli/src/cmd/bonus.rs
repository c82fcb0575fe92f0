//! `glh bonus`: operator-granted points.

use crate::cmd::task::write_outcome;
use crate::cmd::{fail, open_hub, resolve_user};
use crate::output::{OutputMode, render};
use clap::Args;
use greenhub_core::model::Bonus;
use greenhub_core::pipeline::PipelineOutcome;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

#[derive(Args, Debug)]
pub struct BonusArgs {
    /// Recipient (username or user id).
    #[arg(long)]
    pub user: String,

    /// Points to grant.
    #[arg(long)]
    pub amount: u32,

    /// Free-form reason kept with the bonus.
    #[arg(long, default_value = "")]
    pub reason: String,
}

#[derive(Debug, Serialize)]
struct GrantedBonus {
    bonus: Bonus,
    outcome: PipelineOutcome,
}

pub fn run_bonus(args: &BonusArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let mut hub = open_hub(project_root, output)?;
    let recipient = resolve_user(&hub.conn, &args.user, output)?;

    let (bonus, outcome) = hub
        .pipeline()
        .grant_bonus(&mut hub.conn, &recipient.user_id, args.amount, &args.reason)
        .map_err(|e| fail(output, e))?;

    render(output, &GrantedBonus { bonus, outcome }, |granted, w| {
        if !granted.bonus.reason.is_empty() {
            writeln!(w, "Bonus for {}: {}", recipient.username, granted.bonus.reason)?;
        }
        write_outcome(&granted.outcome, w)
    })
}
