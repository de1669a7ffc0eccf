//! engine
//!
//! Reconciles the build stream, its view and the integration baseline.
//!
//! # Architecture
//!
//! The engine decides which `cleartool` commands to run, in what order, and
//! keeps the stream / view / baseline triad consistent. State lives in the
//! VOB and is only reachable through [`crate::cleartool::Cleartool`], so every
//! decision is made from fresh command output.
//!
//! - [`settings`] - Resolved plan settings and validation
//! - [`provision`] - Ensure the build stream and view exist
//! - [`load_rules`] - Compute and add missing load rules
//! - [`changes`] - Build change summaries from diffs and history
//! - [`reconcile`] - The top-level sync and poll operations
//! - [`labeller`] - Post-build baseline promotion
//!
//! # Invariants
//!
//! - Commands are issued once; nothing is retried
//! - Inconsistent stream / view state is reported, never repaired
//! - Load rules are only ever added
//!
//! # Example
//!
//! ```
//! use ccsync::cleartool::mock::MockCleartool;
//! use ccsync::cleartool::Cleartool;
//! use ccsync::core::config::{Config, GlobalConfig, PlanConfig};
//! use ccsync::engine::reconcile::Reconciler;
//! use ccsync::engine::settings::Settings;
//!
//! let plan: PlanConfig = toml::from_str(r#"
//!     project = "project:P@\\pvob"
//!     integration_stream = "stream:P_int@\\pvob"
//!     main_component = "component:Main@\\pvob"
//!     view_location = "/views"
//! "#).unwrap();
//! let mut settings = Settings::from_config(&Config::new(GlobalConfig::default(), plan)).unwrap();
//!
//! let mock = MockCleartool::new()
//!     .reply("lsbl", "20240101.000000,baseline:bl1@\\pvob\n");
//! let ct = Cleartool::new(&mock);
//! settings.prepare(&ct).unwrap();
//!
//! let engine = Reconciler::new(ct, &settings, "PLAN-JOB1");
//! let changes = engine.check_for_changes("baseline:bl1@\\pvob").unwrap();
//! assert!(changes.commits.is_empty());
//! ```

pub mod changes;
pub mod labeller;
pub mod load_rules;
pub mod provision;
pub mod reconcile;
pub mod settings;

pub use labeller::Labeller;
pub use provision::{ProvisionOutcome, Provisioner, ViewSpec};
pub use reconcile::{BuildChanges, Reconciler, SyncOutcome};
pub use settings::{Settings, ValidationIssue};

use std::path::PathBuf;

use crate::cleartool::CleartoolError;
use crate::core::config::ConfigError;
use crate::core::types::TypeError;

/// Execution context for commands.
///
/// Contains global settings derived from CLI flags.
#[derive(Debug, Clone)]
pub struct Context {
    /// Plan configuration file.
    pub plan: PathBuf,
    /// Debug logging enabled.
    pub debug: bool,
    /// Quiet mode (minimal output).
    pub quiet: bool,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            plan: PathBuf::from(crate::core::config::DEFAULT_PLAN_FILE),
            debug: false,
            quiet: false,
        }
    }
}

/// Errors from engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The plan settings are incomplete or wrong.
    #[error("invalid settings: {}", format_issues(.0))]
    Validation(Vec<ValidationIssue>),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Cleartool(#[from] CleartoolError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// View registration and the filesystem disagree. Needs an operator.
    #[error("{}", inconsistent_message(.tag, .path, *.registered))]
    InconsistentView {
        tag: String,
        path: PathBuf,
        registered: bool,
    },

    #[error("no integration baselines found for {component} on {stream}; create a baseline on the integration stream")]
    NoIntegrationBaselines { component: String, stream: String },

    #[error("no foundation baselines found on stream {stream}")]
    NoFoundationBaselines { stream: String },

    #[error("failed to parse revision key {marker}: {message}")]
    MarkerParse { marker: String, message: String },

    #[error("missing setting: {0}")]
    MissingSetting(&'static str),

    #[error("failed to prepare {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|issue| issue.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn inconsistent_message(tag: &str, path: &std::path::Path, registered: bool) -> String {
    if registered {
        format!(
            "view tag ({}) exists but view dir ({}) does not, correct situation manually",
            tag,
            path.display()
        )
    } else {
        format!(
            "view tag ({}) does not exist but view dir ({}) does, correct situation manually",
            tag,
            path.display()
        )
    }
}
