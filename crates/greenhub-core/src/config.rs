use crate::model::BadgeDef;
use crate::model::badge::default_catalog;
use crate::rates::{BUILTIN_RATES, DEFAULT_RATE, RateTable};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Name of the per-hub state directory.
pub const HUB_DIR: &str = ".greenhub";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HubConfig {
    #[serde(default)]
    pub points: PointsConfig,
    #[serde(default)]
    pub leaderboard: LeaderboardConfig,
    #[serde(default)]
    pub badges: Vec<BadgeDef>,
}

impl HubConfig {
    /// Configured badge catalog, or the built-in one when none is listed.
    #[must_use]
    pub fn catalog(&self) -> Vec<BadgeDef> {
        if self.badges.is_empty() {
            default_catalog()
        } else {
            self.badges.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsConfig {
    #[serde(default = "default_task_reward")]
    pub task_reward: u32,
    #[serde(default = "default_rate")]
    pub default_rate: u32,
    #[serde(default = "default_rates")]
    pub rates: BTreeMap<String, u32>,
}

impl Default for PointsConfig {
    fn default() -> Self {
        Self {
            task_reward: default_task_reward(),
            default_rate: default_rate(),
            rates: default_rates(),
        }
    }
}

impl PointsConfig {
    #[must_use]
    pub fn rate_table(&self) -> RateTable {
        RateTable::new(self.rates.clone(), self.default_rate)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardConfig {
    #[serde(default = "default_leaderboard_size")]
    pub size: u32,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            size: default_leaderboard_size(),
        }
    }
}

const fn default_task_reward() -> u32 {
    10
}

const fn default_rate() -> u32 {
    DEFAULT_RATE
}

fn default_rates() -> BTreeMap<String, u32> {
    BUILTIN_RATES
        .iter()
        .map(|(name, rate)| ((*name).to_string(), *rate))
        .collect()
}

const fn default_leaderboard_size() -> u32 {
    10
}

/// Path of the hub config file under `root`.
#[must_use]
pub fn config_path(root: &Path) -> PathBuf {
    root.join(HUB_DIR).join("config.toml")
}

/// Load `.greenhub/config.toml`, falling back to defaults when absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_hub_config(root: &Path) -> Result<HubConfig> {
    let path = config_path(root);
    if !path.exists() {
        return Ok(HubConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<HubConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Walk up from `start` looking for a `.greenhub` directory.
#[must_use]
pub fn find_hub_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(HUB_DIR).is_dir() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}
