//! cleartool::interface
//!
//! Typed queries and actions over an [`Executor`].
//!
//! This is the single doorway the engine uses to talk to ClearCase. Each
//! method builds one [`CommandRequest`], runs it and parses the output with
//! [`crate::core::parse`]. Existence probes turn
//! [`CleartoolError::NotFound`] into `Ok(false)`; every other failure is
//! returned unchanged.
//!
//! # Example
//!
//! ```
//! use ccsync::cleartool::mock::MockCleartool;
//! use ccsync::cleartool::Cleartool;
//! use ccsync::core::types::{Selector, SelectorKind};
//!
//! let mock = MockCleartool::new().fail("lsstream", "cleartool: Error: Stream not found");
//! let ct = Cleartool::new(&mock);
//! let stream = Selector::typed(SelectorKind::Stream, "build@\\pvob").unwrap();
//! assert!(!ct.stream_exists(&stream).unwrap());
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use chrono::NaiveDateTime;
use tracing::warn;

use super::executor::{CleartoolError, CommandOutput, Executor};
use super::request::{CommandRequest, Op};
use crate::core::marker::LEGACY_DATE_FORMAT;
use crate::core::parse::{self, HISTORY_FORMAT};
use crate::core::types::Selector;

/// `describe` format for an object's owner.
pub const FMT_OWNER: &str = "%[owner]p";

/// `describe` format for an object's numeric creation date.
pub const FMT_DATE: &str = "%Nd";

/// `lsbl` format listing integration baselines with their dates.
pub const FMT_DATED_BASELINE: &str = "%d,%Xn\\n";

/// Typed `cleartool` operations.
#[derive(Clone, Copy)]
pub struct Cleartool<'a> {
    exec: &'a dyn Executor,
}

impl std::fmt::Debug for Cleartool<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cleartool").finish_non_exhaustive()
    }
}

impl<'a> Cleartool<'a> {
    pub fn new(exec: &'a dyn Executor) -> Self {
        Self { exec }
    }

    fn run(&self, request: CommandRequest) -> Result<CommandOutput, CleartoolError> {
        self.exec.run(&request)
    }

    fn stdout(&self, request: CommandRequest) -> Result<String, CleartoolError> {
        Ok(self.run(request)?.stdout)
    }

    fn exists(&self, request: CommandRequest) -> Result<bool, CleartoolError> {
        match self.run(request) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    // =========================================================================
    // Probes
    // =========================================================================

    /// Does `stream` exist?
    pub fn stream_exists(&self, stream: &Selector) -> Result<bool, CleartoolError> {
        self.exists(CommandRequest::new(Op::ListStream {
            format: "%Xn".to_string(),
            stream: stream.to_string(),
        }))
    }

    /// Is a view registered under `tag`?
    pub fn view_registered(&self, tag: &str) -> Result<bool, CleartoolError> {
        self.exists(CommandRequest::new(Op::ListView {
            tag: tag.to_string(),
        }))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Baselines of `component` on `stream`, oldest first.
    pub fn stream_baselines(&self, component: &Selector, stream: &Selector) -> Result<Vec<String>, CleartoolError> {
        let out = self.stdout(CommandRequest::new(Op::ListBaselines {
            format: FMT_DATED_BASELINE.to_string(),
            component: component.to_string(),
            stream: stream.to_string(),
        }))?;
        Ok(parse::dated_baselines(&out))
    }

    /// Foundation baselines of `stream`, as printed.
    pub fn foundation_baselines(&self, stream: &Selector) -> Result<Vec<String>, CleartoolError> {
        let out = self.stdout(CommandRequest::new(Op::ListStream {
            format: "%[found_bls]Xp".to_string(),
            stream: stream.to_string(),
        }))?;
        Ok(parse::words(&out))
    }

    /// The component a baseline belongs to.
    pub fn baseline_component(&self, baseline: &str) -> Result<String, CleartoolError> {
        let out = self.stdout(CommandRequest::new(Op::DescribeBaseline {
            format: "%[component]Xp".to_string(),
            baseline: baseline.to_string(),
        }))?;
        Ok(out.trim().to_string())
    }

    /// Baselines a (composite) baseline depends on.
    pub fn baseline_depends_on(&self, baseline: &str) -> Result<Vec<String>, CleartoolError> {
        let out = self.stdout(CommandRequest::new(Op::DescribeBaseline {
            format: "%[depends_on]Xp".to_string(),
            baseline: baseline.to_string(),
        }))?;
        Ok(parse::words(&out))
    }

    /// Root directory of a component; `None` for non-rooted components.
    pub fn component_root(&self, component: &str) -> Result<Option<String>, CleartoolError> {
        let out = self.stdout(CommandRequest::new(Op::ListComponent {
            format: "%[root_dir]p".to_string(),
            component: component.to_string(),
        }))?;
        let root = out.trim();
        Ok((!root.is_empty()).then(|| root.to_string()))
    }

    /// Load rules currently in the config spec of view `tag`.
    pub fn current_load_rules(&self, tag: &str) -> Result<BTreeSet<String>, CleartoolError> {
        let out = self.stdout(CommandRequest::new(Op::ConfigSpec {
            tag: tag.to_string(),
        }))?;
        Ok(parse::load_rules(&out))
    }

    /// The integration stream of `project`.
    pub fn project_integration_stream(&self, project: &Selector) -> Result<String, CleartoolError> {
        let out = self.stdout(CommandRequest::new(Op::ListProject {
            format: "%[istream]Xp".to_string(),
            project: project.to_string(),
        }))?;
        Ok(out.trim().to_string())
    }

    /// `describe -fmt <format>` of any object.
    pub fn describe(&self, format: &str, selector: &str) -> Result<String, CleartoolError> {
        let out = self.stdout(CommandRequest::new(Op::Describe {
            format: format.to_string(),
            selector: selector.to_string(),
        }))?;
        Ok(out.trim().to_string())
    }

    pub fn owner(&self, selector: &str) -> Result<String, CleartoolError> {
        self.describe(FMT_OWNER, selector)
    }

    /// Creation date in `yyyyMMdd.HHmmss` form.
    pub fn object_date(&self, selector: &str) -> Result<String, CleartoolError> {
        self.describe(FMT_DATE, selector)
    }

    /// `diffbl -act -ver` between two baselines, run inside the view.
    pub fn diff_baselines(&self, first: &str, second: &str, view_path: &Path) -> Result<String, CleartoolError> {
        self.stdout(
            CommandRequest::new(Op::DiffBaselines {
                first: first.to_string(),
                second: second.to_string(),
                versions: true,
            })
            .in_dir(view_path),
        )
    }

    /// Recursive history of `dir` since `since`, in [`HISTORY_FORMAT`].
    pub fn history_since(&self, dir: &Path, since: NaiveDateTime, branch: Option<&str>) -> Result<String, CleartoolError> {
        self.stdout(
            CommandRequest::new(Op::History {
                format: HISTORY_FORMAT.to_string(),
                since: since.format(LEGACY_DATE_FORMAT).to_string(),
                branch: branch.map(str::to_string),
            })
            .in_dir(dir),
        )
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub fn make_stream(&self, integration: &Selector, stream: &Selector, readonly: bool) -> Result<(), CleartoolError> {
        self.run(CommandRequest::new(Op::MakeStream {
            integration: integration.to_string(),
            stream: stream.to_string(),
            readonly,
        }))
        .map(drop)
    }

    pub fn make_view(
        &self,
        tag: &str,
        stream: &Selector,
        storage: Option<&Path>,
        path: &Path,
        snapshot: bool,
    ) -> Result<(), CleartoolError> {
        self.run(CommandRequest::new(Op::MakeView {
            tag: tag.to_string(),
            stream: stream.to_string(),
            storage: storage.map(|s| s.display().to_string()),
            path: path.display().to_string(),
            snapshot,
        }))
        .map(drop)
    }

    /// Add one load rule to the snapshot view at `view_path`.
    pub fn add_load_rule(&self, view_path: &Path, rule: &str) -> Result<(), CleartoolError> {
        let rule = rule.trim_start_matches(&['\\', '/'][..]);
        self.run(
            CommandRequest::new(Op::AddLoadRule {
                path: view_path.join(rule).display().to_string(),
            })
            .in_dir(view_path),
        )
        .map(drop)
    }

    /// Refresh a snapshot view.
    pub fn update_view(&self, view_path: &Path) -> Result<(), CleartoolError> {
        let out = self.run(
            CommandRequest::new(Op::Update {
                path: view_path.display().to_string(),
            })
            .in_dir(view_path),
        )?;
        if !out.stderr.trim().is_empty() {
            warn!(stderr = %out.stderr.trim(), "update reported warnings");
        }
        Ok(())
    }

    /// Rebase `stream` onto `baseline` and complete it.
    pub fn rebase(&self, baseline: &str, stream: &Selector, view_tag: &str, view_path: &Path) -> Result<(), CleartoolError> {
        self.run(
            CommandRequest::new(Op::Rebase {
                baseline: baseline.to_string(),
                stream: stream.to_string(),
                view: view_tag.to_string(),
            })
            .in_dir(view_path),
        )
        .map(drop)
    }

    pub fn change_baseline_level(&self, baseline: &str, level: &str) -> Result<(), CleartoolError> {
        self.run(CommandRequest::new(Op::ChangeBaselineLevel {
            level: level.to_string(),
            baseline: baseline.to_string(),
        }))
        .map(drop)
    }

    /// Make `baseline` the recommended baseline of `stream`.
    pub fn recommend_baseline(&self, baseline: &str, stream: &Selector) -> Result<(), CleartoolError> {
        self.run(CommandRequest::new(Op::Recommend {
            baseline: baseline.to_string(),
            stream: stream.to_string(),
        }))
        .map(drop)
    }
}
