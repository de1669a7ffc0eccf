//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Host-wide settings shared by every plan on the build agent. Located at
//! (in order of precedence):
//! 1. `$CCSYNC_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/ccsync/config.toml`
//! 3. `~/.ccsync/config.toml`
//!
//! # Plan Config
//!
//! Per-plan settings, read from the file given with `--plan` (default
//! `ccsync.toml`).
//!
//! # Validation
//!
//! Values are checked for shape after parsing. Checks that need `cleartool`
//! (does the integration stream exist?) happen later, in
//! [`crate::engine::settings`].

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Host-global configuration.
///
/// # Example
///
/// ```toml
/// tool_home = "/opt/rational/clearcase/bin"
/// command_timeout_secs = 1800
///
/// [variables]
/// "view.storage" = "\\\\ccserver\\views"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Directory holding the `cleartool` executable
    pub tool_home: Option<PathBuf>,

    /// Kill a `cleartool` invocation that runs longer than this
    pub command_timeout_secs: Option<u64>,

    /// Host variables available to `${host.NAME}` substitution
    pub variables: BTreeMap<String, String>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.command_timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "command_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Which ClearCase model the plan uses.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VcsType {
    #[default]
    Ucm,
    Base,
}

impl std::fmt::Display for VcsType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VcsType::Ucm => f.write_str("ucm"),
            VcsType::Base => f.write_str("base"),
        }
    }
}

/// Per-plan configuration.
///
/// # Example
///
/// ```toml
/// vcs = "ucm"
/// compare_baselines = true
/// auto_create = true
/// project = "project:Proj1@\\pvob"
/// main_component = "component:Main@\\pvob"
/// view_location = "/builds/views"
/// load_rules = """
/// /vobs/tools
/// """
///
/// [labeller]
/// enabled = true
/// recommend = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PlanConfig {
    /// `ucm` (default) or `base`
    pub vcs: VcsType,

    /// Build only when the integration baseline moved
    pub compare_baselines: Option<bool>,

    /// Create the build stream and view on demand
    pub auto_create: Option<bool>,

    /// Prefix of the derived build stream name (default: `build_ro_`)
    pub build_prefix: Option<String>,

    /// Project selector
    pub project: Option<String>,

    /// Integration stream selector; derived from the project when blank
    pub integration_stream: Option<String>,

    /// Build stream selector; derived from the project when auto-creating
    pub build_stream: Option<String>,

    /// Main component selector
    pub main_component: Option<String>,

    /// Root directory for build views
    pub view_location: Option<PathBuf>,

    /// View storage directory; may reference `${host.NAME}`
    pub view_storage: Option<String>,

    /// View tag override
    pub view_tag: Option<String>,

    /// Extra load rules, one per line
    pub load_rules: Option<String>,

    /// Use a dynamic view instead of a snapshot view
    pub dynamic_view: Option<bool>,

    /// Drive letter a dynamic view is mapped to
    pub drive_letter: Option<String>,

    /// Skip `cleartool update` on snapshot views
    pub disable_update: Option<bool>,

    /// Branch to scan (Base ClearCase)
    pub branch: Option<String>,

    /// Snapshot view root (Base ClearCase)
    pub base_view_location: Option<PathBuf>,

    /// VOB directory below the view root (Base ClearCase)
    pub vob_dir: Option<String>,

    /// Post-build baseline promotion
    pub labeller: Option<LabellerConfig>,
}

impl PlanConfig {
    /// Validate value shapes.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(letter) = self.drive_letter.as_deref().map(str::trim) {
            let bare = letter.trim_end_matches(&['\\', '/'][..]).trim_end_matches(':');
            if !bare.is_empty() && (bare.len() != 1 || !bare.chars().all(|c| c.is_ascii_alphabetic())) {
                return Err(ConfigError::InvalidValue(format!(
                    "drive_letter must be a single letter, got '{}'",
                    letter
                )));
            }
        }

        if let Some(labeller) = &self.labeller {
            labeller.validate()?;
        }

        Ok(())
    }
}

/// Post-build labelling settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LabellerConfig {
    /// Promote the built baseline after each build
    pub enabled: Option<bool>,

    /// Also make it the integration stream's recommended baseline
    pub recommend: Option<bool>,

    /// Promotion level on success (default: `BUILT`)
    pub success_level: Option<String>,

    /// Promotion level on failure (default: `REJECTED`)
    pub failure_level: Option<String>,
}

impl LabellerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for level in [&self.success_level, &self.failure_level].into_iter().flatten() {
            if level.trim().is_empty() || level.chars().any(char::is_whitespace) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid promotion level '{}'",
                    level
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod global_config {
        use super::*;

        #[test]
        fn defaults() {
            let config = GlobalConfig::default();
            assert!(config.tool_home.is_none());
            assert!(config.command_timeout_secs.is_none());
            assert!(config.variables.is_empty());
            assert!(config.validate().is_ok());
        }

        #[test]
        fn zero_timeout_rejected() {
            let config = GlobalConfig {
                command_timeout_secs: Some(0),
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }

        #[test]
        fn dotted_variable_names() {
            let config: GlobalConfig = toml::from_str(
                r#"
                [variables]
                "view.storage" = "/vws"
                "#,
            )
            .unwrap();
            assert_eq!(config.variables.get("view.storage").map(String::as_str), Some("/vws"));
        }

        #[test]
        fn unknown_field_rejected() {
            assert!(toml::from_str::<GlobalConfig>("colour = true").is_err());
        }
    }

    mod plan_config {
        use super::*;

        #[test]
        fn vcs_defaults_to_ucm() {
            let config: PlanConfig = toml::from_str("").unwrap();
            assert_eq!(config.vcs, VcsType::Ucm);
        }

        #[test]
        fn base_mode_parses() {
            let config: PlanConfig = toml::from_str(
                r#"
                vcs = "base"
                branch = "main"
                vob_dir = "myvob"
                base_view_location = "/views/base"
                "#,
            )
            .unwrap();
            assert_eq!(config.vcs, VcsType::Base);
            assert_eq!(config.vob_dir.as_deref(), Some("myvob"));
        }

        #[test]
        fn drive_letter_shape() {
            for ok in ["M", "m:", "M:\\", ""] {
                let config = PlanConfig {
                    drive_letter: Some(ok.to_string()),
                    ..Default::default()
                };
                assert!(config.validate().is_ok(), "{ok}");
            }
            let config = PlanConfig {
                drive_letter: Some("MM".to_string()),
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }

        #[test]
        fn labeller_levels_checked() {
            let config = PlanConfig {
                labeller: Some(LabellerConfig {
                    success_level: Some("NOT BUILT".to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }

        #[test]
        fn roundtrip() {
            let config = PlanConfig {
                vcs: VcsType::Ucm,
                compare_baselines: Some(true),
                project: Some("project:P@\\pvob".to_string()),
                labeller: Some(LabellerConfig {
                    enabled: Some(true),
                    ..Default::default()
                }),
                ..Default::default()
            };
            let text = toml::to_string_pretty(&config).unwrap();
            let parsed: PlanConfig = toml::from_str(&text).unwrap();
            assert_eq!(config, parsed);
        }
    }
}
