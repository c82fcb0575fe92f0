use crate::cmd::db_path;
use crate::output::{OutputMode, pretty_kv, render};
use anyhow::{Context as _, Result};
use clap::Args;
use greenhub_core::badges::sync_catalog;
use greenhub_core::config::{self, HUB_DIR, HubConfig};
use greenhub_core::db::{self, migrations};
use greenhub_core::model::badge::default_catalog;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Rewrite the config file even if `.greenhub/` already exists.
    #[arg(long)]
    pub force: bool,
}

const CONFIG_HEADER: &str = "# greenhub hub configuration\n\
    #\n\
    # [points.rates] replaces the built-in action rates entirely when present.\n\
    # [[badges]] entries are upserted by name on `glh init` and `glh badges sync`.\n\n";

const GITIGNORE: &str = "greenhub.sqlite3\ngreenhub.sqlite3-wal\ngreenhub.sqlite3-shm\n";

#[derive(Debug, Serialize)]
struct InitReport {
    hub_dir: String,
    config: String,
    database: String,
    schema_version: u32,
    badges_inserted: usize,
    badges_updated: usize,
}

fn default_config_toml() -> Result<String> {
    let defaults = HubConfig {
        badges: default_catalog(),
        ..HubConfig::default()
    };
    let body = toml::to_string_pretty(&defaults).context("serialize default config")?;
    Ok(format!("{CONFIG_HEADER}{body}"))
}

/// Execute `glh init`. Creates the hub skeleton:
///
/// ```text
/// .greenhub/
///   config.toml         (points, rates, leaderboard and badge catalog)
///   greenhub.sqlite3    (migrated store)
///   .gitignore          (database files)
/// ```
///
/// # Errors
///
/// Returns an error if `.greenhub/` already exists and `--force` is not set,
/// or if any filesystem or database operation fails.
pub fn run_init(args: &InitArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let hub_dir = project_root.join(HUB_DIR);

    if hub_dir.exists() && !args.force {
        anyhow::bail!("{HUB_DIR}/ already exists. Use `glh init --force` to reinitialize.");
    }

    std::fs::create_dir_all(&hub_dir)
        .with_context(|| format!("Failed to create {}", hub_dir.display()))?;

    let config_path = config::config_path(project_root);
    std::fs::write(&config_path, default_config_toml()?)
        .with_context(|| format!("Failed to write config: {}", config_path.display()))?;

    let gitignore_path = hub_dir.join(".gitignore");
    std::fs::write(&gitignore_path, GITIGNORE)
        .with_context(|| format!("Failed to write .gitignore: {}", gitignore_path.display()))?;

    let config = config::load_hub_config(project_root)?;
    let path = db_path(project_root);
    let mut conn = db::open_store(&path)?;
    let schema_version = migrations::current_schema_version(&conn)?;
    let synced = sync_catalog(&mut conn, &config.catalog())?;

    tracing::info!(hub = %hub_dir.display(), schema_version, "hub initialized");

    let report = InitReport {
        hub_dir: hub_dir.display().to_string(),
        config: config_path.display().to_string(),
        database: path.display().to_string(),
        schema_version,
        badges_inserted: synced.inserted,
        badges_updated: synced.updated,
    };

    render(output, &report, |r, w| {
        writeln!(w, "✓ Initialized {HUB_DIR}/ hub.")?;
        writeln!(w)?;
        pretty_kv(w, "Config", &r.config)?;
        pretty_kv(w, "Database", &r.database)?;
        pretty_kv(w, "Schema", format!("v{}", r.schema_version))?;
        pretty_kv(
            w,
            "Badges",
            format!("{} new, {} updated", r.badges_inserted, r.badges_updated),
        )?;
        writeln!(w)?;
        writeln!(w, "Next steps:")?;
        writeln!(w, "  glh user add <username> <email>")?;
        writeln!(w, "  glh task add --user <username> --title \"Evening walk\"")
    })
}

#[cfg(test)]
mod tests {
    use super::default_config_toml;
    use greenhub_core::config::HubConfig;

    #[test]
    fn default_config_parses_back() {
        let text = default_config_toml().expect("render");
        assert!(text.starts_with("# greenhub hub configuration"));
        let parsed: HubConfig = toml::from_str(&text).expect("parse");
        assert_eq!(parsed.points.task_reward, 10);
        assert_eq!(parsed.points.rates.get("recycle"), Some(&10));
        assert_eq!(parsed.badges.len(), 4);
        assert_eq!(parsed.leaderboard.size, 10);
    }
}
