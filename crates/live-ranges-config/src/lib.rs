use live_ranges_engine::{DEFAULT_SAFE_DELTA_BOUND, IntervalTree, TreeOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid config at {config_path}: safe_delta_bound must be positive, got {value}")]
    InvalidDeltaBound { config_path: PathBuf, value: i64 },
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tree: TreeConfig,
}

/// Settings for every range index created from this config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Node deltas beyond this magnitude trigger a rewrite into absolute positions.
    pub safe_delta_bound: i64,
    /// Check every tree invariant after each mutation. Slow; meant for debugging.
    pub verify_invariants: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        TreeConfig {
            safe_delta_bound: DEFAULT_SAFE_DELTA_BOUND,
            verify_invariants: false,
        }
    }
}

impl TreeConfig {
    pub fn tree_options(&self) -> TreeOptions {
        TreeOptions {
            safe_delta_bound: self.safe_delta_bound,
            verify_invariants: self.verify_invariants,
        }
    }

    pub fn build_tree(&self) -> IntervalTree {
        IntervalTree::with_options(self.tree_options())
    }
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        if config.tree.safe_delta_bound <= 0 {
            return Err(ConfigError::InvalidDeltaBound {
                config_path: config_path.to_path_buf(),
                value: config.tree.safe_delta_bound,
            });
        }

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    /// The stored config, or defaults when there is no config file.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        Ok(Self::load()?.unwrap_or_default())
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/live-ranges");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }
}
