//! `glh sweep`: award every completed event whose points were never recorded.

use crate::cmd::open_hub;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};
use clap::Args;
use std::io::Write;
use std::path::Path;

#[derive(Args, Debug)]
pub struct SweepArgs {
    /// Exit non-zero when any event fails to process.
    #[arg(long)]
    pub strict: bool,
}

pub fn run_sweep(args: &SweepArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let mut hub = open_hub(project_root, output)?;
    let report = hub.pipeline().process_pending(&mut hub.conn)?;

    render_mode(
        output,
        &report,
        |r, w| {
            writeln!(
                w,
                "processed={} skipped={} badges={} failed={}",
                r.processed,
                r.skipped,
                r.badges_granted,
                r.failures.len()
            )?;
            for failure in &r.failures {
                writeln!(w, "failed\t{}\t{}", failure.event, failure.error)?;
            }
            Ok(())
        },
        |r, w| {
            pretty_section(w, "Pending sweep")?;
            pretty_kv(w, "Processed", r.processed.to_string())?;
            pretty_kv(w, "Skipped", r.skipped.to_string())?;
            pretty_kv(w, "Badges", r.badges_granted.to_string())?;
            pretty_kv(w, "Failed", r.failures.len().to_string())?;
            for failure in &r.failures {
                let retry = if failure.retryable { " (retryable)" } else { "" };
                writeln!(w, "  ✗ {}: {}{retry}", failure.event, failure.error)?;
            }
            Ok(())
        },
    )?;

    if args.strict && !report.failures.is_empty() {
        anyhow::bail!("{} pending event(s) failed", report.failures.len());
    }
    Ok(())
}
