//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! ccsync has two configuration scopes:
//! - **Global**: settings of the build host (tool location, timeouts,
//!   host variables)
//! - **Plan**: the ClearCase settings of one build plan
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$CCSYNC_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/ccsync/config.toml`
//! 3. `~/.ccsync/config.toml`
//!
//! A missing global config is not an error. A missing plan config is.
//!
//! # Example
//!
//! ```no_run
//! use ccsync::core::config::Config;
//! use std::path::Path;
//!
//! let result = Config::load(Path::new("ccsync.toml")).unwrap();
//! let config = result.config;
//! println!("compare baselines: {}", config.compare_baselines());
//! println!("build prefix: {}", config.build_prefix());
//! ```

pub mod schema;

pub use schema::{GlobalConfig, LabellerConfig, PlanConfig, VcsType};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use super::paths::DEFAULT_VIEW_STORAGE;

/// Default prefix for derived build stream names.
pub const DEFAULT_BUILD_PREFIX: &str = "build_ro_";

/// Default promotion level for a successful build.
pub const DEFAULT_SUCCESS_LEVEL: &str = "BUILT";

/// Default promotion level for a failed build.
pub const DEFAULT_FAILURE_LEVEL: &str = "REJECTED";

/// Default plan file name.
pub const DEFAULT_PLAN_FILE: &str = "ccsync.toml";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("plan config not found: {0}")]
    PlanNotFound(PathBuf),

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Merged configuration from both scopes.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub global: GlobalConfig,
    pub plan: PlanConfig,
    global_path: Option<PathBuf>,
    plan_path: Option<PathBuf>,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    pub config: Config,
}

impl Config {
    /// Build a config from already-parsed parts.
    pub fn new(global: GlobalConfig, plan: PlanConfig) -> Self {
        Self {
            global,
            plan,
            global_path: None,
            plan_path: None,
        }
    }

    /// Load the global config from its standard locations and the plan
    /// config from `plan_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the plan file is missing or if any file that
    /// exists cannot be parsed or fails validation.
    pub fn load(plan_path: &Path) -> Result<ConfigLoadResult, ConfigError> {
        let (global, global_path) = Self::load_global()?;

        if !plan_path.exists() {
            return Err(ConfigError::PlanNotFound(plan_path.to_path_buf()));
        }
        let plan: PlanConfig = read_toml(plan_path)?;

        global.validate()?;
        plan.validate()?;

        Ok(ConfigLoadResult {
            config: Config {
                global,
                plan,
                global_path,
                plan_path: Some(plan_path.to_path_buf()),
            },
        })
    }

    /// Load global configuration from standard locations.
    fn load_global() -> Result<(GlobalConfig, Option<PathBuf>), ConfigError> {
        // 1. Check $CCSYNC_CONFIG
        if let Ok(path) = std::env::var("CCSYNC_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                let config = read_toml(&path)?;
                return Ok((config, Some(path)));
            }
        }

        // 2. Check $XDG_CONFIG_HOME/ccsync/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("ccsync/config.toml");
            if path.exists() {
                let config = read_toml(&path)?;
                return Ok((config, Some(path)));
            }
        }

        // 3. Check ~/.ccsync/config.toml
        if let Some(home) = dirs::home_dir() {
            let path = home.join(".ccsync/config.toml");
            if path.exists() {
                let config = read_toml(&path)?;
                return Ok((config, Some(path)));
            }
        }

        Ok((GlobalConfig::default(), None))
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    pub fn vcs(&self) -> VcsType {
        self.plan.vcs
    }

    /// Defaults to `true`.
    pub fn compare_baselines(&self) -> bool {
        self.plan.compare_baselines.unwrap_or(true)
    }

    /// Defaults to `true`.
    pub fn auto_create(&self) -> bool {
        self.plan.auto_create.unwrap_or(true)
    }

    /// Defaults to `build_ro_`.
    pub fn build_prefix(&self) -> &str {
        self.plan.build_prefix.as_deref().unwrap_or(DEFAULT_BUILD_PREFIX)
    }

    pub fn dynamic_view(&self) -> bool {
        self.plan.dynamic_view.unwrap_or(false)
    }

    pub fn disable_update(&self) -> bool {
        self.plan.disable_update.unwrap_or(false)
    }

    /// Defaults to `${host.view.storage}`.
    pub fn view_storage(&self) -> &str {
        self.plan
            .view_storage
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_VIEW_STORAGE)
    }

    /// Extra load rules, blank lines removed.
    pub fn extra_load_rules(&self) -> Vec<String> {
        self.plan
            .load_rules
            .as_deref()
            .unwrap_or_default()
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn labeller_enabled(&self) -> bool {
        self.labeller().and_then(|l| l.enabled).unwrap_or(false)
    }

    pub fn labeller_recommend(&self) -> bool {
        self.labeller().and_then(|l| l.recommend).unwrap_or(false)
    }

    /// Defaults to `BUILT`.
    pub fn success_level(&self) -> &str {
        self.labeller()
            .and_then(|l| l.success_level.as_deref())
            .unwrap_or(DEFAULT_SUCCESS_LEVEL)
    }

    /// Defaults to `REJECTED`.
    pub fn failure_level(&self) -> &str {
        self.labeller()
            .and_then(|l| l.failure_level.as_deref())
            .unwrap_or(DEFAULT_FAILURE_LEVEL)
    }

    fn labeller(&self) -> Option<&LabellerConfig> {
        self.plan.labeller.as_ref()
    }

    pub fn tool_home(&self) -> Option<&Path> {
        self.global.tool_home.as_deref()
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.global.command_timeout_secs.map(Duration::from_secs)
    }

    /// Get the path to the loaded global config file.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Get the path to the loaded plan config file.
    pub fn plan_config_loaded_from(&self) -> Option<&Path> {
        self.plan_path.as_deref()
    }
}

fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
