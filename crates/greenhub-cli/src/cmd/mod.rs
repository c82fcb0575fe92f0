pub mod action;
pub mod badges;
pub mod bonus;
pub mod completions;
pub mod init;
pub mod leaderboard;
pub mod notifications;
pub mod points;
pub mod sweep;
pub mod task;
pub mod user;

use crate::output::{CliError, OutputMode, render_error};
use anyhow::Context as _;
use greenhub_core::config::{self, HUB_DIR, HubConfig};
use greenhub_core::db::{self, query};
use greenhub_core::error::{ErrorCode, PipelineError};
use greenhub_core::model::User;
use greenhub_core::pipeline::Pipeline;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// An opened hub: its root, parsed config and a migrated connection.
pub struct Hub {
    pub root: PathBuf,
    pub config: HubConfig,
    pub conn: Connection,
}

impl Hub {
    pub fn pipeline(&self) -> Pipeline {
        Pipeline::from_config(&self.config)
    }
}

/// Path of the hub database under `root`.
pub fn db_path(root: &Path) -> PathBuf {
    root.join(HUB_DIR).join(db::DB_FILE_NAME)
}

/// Locate the hub containing `project_root` and open it.
///
/// Renders a coded error before failing so JSON consumers get a stable shape.
pub fn open_hub(project_root: &Path, output: OutputMode) -> anyhow::Result<Hub> {
    let Some(root) = config::find_hub_root(project_root) else {
        render_error(
            output,
            &CliError::from_code(
                ErrorCode::NotInitialized,
                format!("no {HUB_DIR} directory found from {}", project_root.display()),
            ),
        )?;
        anyhow::bail!("Not a greenhub hub: {HUB_DIR} directory not found");
    };

    let config = match config::load_hub_config(&root) {
        Ok(config) => config,
        Err(err) => {
            render_error(
                output,
                &CliError::from_code(ErrorCode::ConfigParseError, format!("{err:#}")),
            )?;
            return Err(err);
        }
    };

    let path = db_path(&root);
    let conn = db::open_store(&path)
        .with_context(|| format!("Failed to open hub database {}", path.display()))?;
    Ok(Hub { root, config, conn })
}

/// Resolve a username or user id, rendering a coded error when missing.
pub fn resolve_user(conn: &Connection, needle: &str, output: OutputMode) -> anyhow::Result<User> {
    match query::find_user(conn, needle)? {
        Some(user) => Ok(user),
        None => Err(fail(output, PipelineError::UserNotFound(needle.to_string()))),
    }
}

/// Render a pipeline error and convert it for propagation.
pub fn fail(output: OutputMode, err: PipelineError) -> anyhow::Error {
    match render_error(output, &CliError::from(&err)) {
        Ok(()) => err.into(),
        Err(render_err) => render_err.context(err.to_string()),
    }
}
