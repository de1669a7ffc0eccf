//! engine::reconcile
//!
//! The two operations a CI server needs: poll for changes and bring the
//! build view up to date.
//!
//! # Modes
//!
//! - UCM comparing baselines: the revision marker is the last built
//!   integration baseline. A build happens when the newest integration
//!   baseline differs from it.
//! - UCM without comparison, and Base ClearCase: the revision marker is a
//!   `yyyyMMdd.HHmmss` timestamp and changes come from `lshistory`.
//!
//! Every run is tagged with a fresh run id so the commands it issued can be
//! picked out of an interleaved log.

use std::path::PathBuf;

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, info, info_span};
use uuid::Uuid;

use super::changes::{self, HistoryScope};
use super::labeller::foundation_baseline;
use super::load_rules;
use super::provision::{ProvisionOutcome, Provisioner, ViewSpec};
use super::settings::Settings;
use super::EngineError;
use crate::cleartool::Cleartool;
use crate::core::config::VcsType;
use crate::core::marker::{format_timestamp, marker_after, since_from_raw, RevisionMarker};
use crate::core::types::CommitRecord;

/// Result of [`Reconciler::retrieve_source_code`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    /// The revision marker to persist for the next build.
    pub marker: String,
    /// False when the integration baseline had not moved.
    pub changed: bool,
    /// Where the build reads its sources.
    pub source_dir: PathBuf,
    /// Load rules added to the view.
    pub load_rules_added: Vec<String>,
    pub commits: Vec<CommitRecord>,
}

/// Result of [`Reconciler::check_for_changes`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildChanges {
    pub marker: String,
    pub commits: Vec<CommitRecord>,
}

/// Drives one plan's build view.
#[derive(Debug)]
pub struct Reconciler<'a> {
    ct: Cleartool<'a>,
    settings: &'a Settings,
    build_key: String,
    now: Option<NaiveDateTime>,
}

impl<'a> Reconciler<'a> {
    pub fn new(ct: Cleartool<'a>, settings: &'a Settings, build_key: impl Into<String>) -> Self {
        Self {
            ct,
            settings,
            build_key: build_key.into(),
            now: None,
        }
    }

    /// Pin the clock.
    pub fn with_now(mut self, now: NaiveDateTime) -> Self {
        self.now = Some(now);
        self
    }

    fn now(&self) -> NaiveDateTime {
        self.now.unwrap_or_else(|| Local::now().naive_local())
    }

    fn compares_baselines(&self) -> bool {
        self.settings.vcs == VcsType::Ucm && self.settings.compare_baselines
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Prepare the build view and return the marker of what it now holds.
    ///
    /// `previous` is the marker returned by the last build, if any.
    pub fn retrieve_source_code(&self, previous: Option<&str>) -> Result<SyncOutcome, EngineError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("sync", run = %run_id, build_key = %self.build_key);
        let _enter = span.enter();
        info!(previous = previous.unwrap_or(""), "retrieving source code");

        match self.settings.vcs {
            VcsType::Ucm => self.sync_ucm(previous),
            VcsType::Base => self.sync_base(previous),
        }
    }

    /// Report what changed since `previous` without touching the view.
    pub fn check_for_changes(&self, previous: &str) -> Result<BuildChanges, EngineError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("changes", run = %run_id, build_key = %self.build_key);
        let _enter = span.enter();
        debug!(previous = %previous, "collecting changes since last build");

        if self.compares_baselines() {
            let latest = self.latest_integration_baseline()?;
            if latest == previous {
                info!(baseline = %latest, "integration baseline unchanged");
                return Ok(BuildChanges {
                    marker: latest,
                    commits: Vec::new(),
                });
            }
            let commits = self.baseline_summary(&latest, Some(previous))?;
            return Ok(BuildChanges {
                marker: latest,
                commits,
            });
        }

        self.date_changes(previous)
    }

    /// Ensure the build stream and view exist.
    pub fn provision(&self) -> Result<ProvisionOutcome, EngineError> {
        let settings = self.settings;
        let stream = settings.build_stream()?;
        let integration = settings.integration_stream()?;

        let paths = settings.view_paths()?;
        paths
            .ensure_parent(&self.build_key)
            .map_err(|source| EngineError::Io {
                path: paths.root().join(&self.build_key),
                source,
            })?;

        let view = ViewSpec {
            tag: settings.view_tag()?,
            path: settings.view_path(&self.build_key)?,
            storage: settings.view_storage_path()?,
            dynamic: settings.dynamic_view,
        };
        let outcome = Provisioner::new(self.ct).ensure(stream, integration, &view)?;
        debug!(?outcome, "provisioned");
        Ok(outcome)
    }

    /// The newest baseline of the main component on the integration stream.
    ///
    /// # Errors
    ///
    /// `EngineError::NoIntegrationBaselines` when the stream has none.
    pub fn latest_integration_baseline(&self) -> Result<String, EngineError> {
        let component = self.settings.main_component()?;
        let integration = self.settings.integration_stream()?;
        let baselines = self.ct.stream_baselines(component, integration)?;
        debug!(count = baselines.len(), "integration baselines");

        baselines.last().cloned().ok_or_else(|| EngineError::NoIntegrationBaselines {
            component: component.to_string(),
            stream: integration.to_string(),
        })
    }

    // =========================================================================
    // UCM
    // =========================================================================

    fn sync_ucm(&self, previous: Option<&str>) -> Result<SyncOutcome, EngineError> {
        self.provision()?;
        let source_dir = self.settings.source_dir(&self.build_key)?;

        if !self.settings.compare_baselines {
            let marker = format_timestamp(self.now());
            let mut added = Vec::new();
            if !self.settings.dynamic_view {
                added = self.ensure_load_rules(None)?;
                self.update_view()?;
            }
            return Ok(SyncOutcome {
                marker,
                changed: true,
                source_dir,
                load_rules_added: added,
                commits: Vec::new(),
            });
        }

        let latest = self.latest_integration_baseline()?;
        if previous == Some(latest.as_str()) {
            info!(baseline = %latest, "integration baseline unchanged, nothing to do");
            return Ok(SyncOutcome {
                marker: latest,
                changed: false,
                source_dir,
                load_rules_added: Vec::new(),
                commits: Vec::new(),
            });
        }

        info!(baseline = %latest, "building new integration baseline");
        let added = self.ensure_load_rules(Some(&latest))?;
        self.rebase(&latest)?;
        let commits = self.baseline_summary(&latest, previous)?;

        Ok(SyncOutcome {
            marker: latest,
            changed: true,
            source_dir,
            load_rules_added: added,
            commits,
        })
    }

    /// Reconcile load rules against `baseline`, or the build stream's
    /// foundation baseline when `None`. Only views this tool creates are
    /// touched, and dynamic views have no load rules.
    fn ensure_load_rules(&self, baseline: Option<&str>) -> Result<Vec<String>, EngineError> {
        if !self.settings.auto_create || self.settings.dynamic_view {
            return Ok(Vec::new());
        }
        let baseline = match baseline {
            Some(bl) => bl.to_string(),
            None => foundation_baseline(&self.ct, self.settings.build_stream()?)?,
        };
        load_rules::reconcile(
            &self.ct,
            &self.settings.view_tag()?,
            &self.settings.view_path(&self.build_key)?,
            &baseline,
            &self.settings.extra_load_rules,
        )
    }

    fn rebase(&self, baseline: &str) -> Result<(), EngineError> {
        let stream = self.settings.build_stream()?;
        info!(baseline = %baseline, stream = %stream, "rebasing build stream");
        self.ct.rebase(
            baseline,
            stream,
            &self.settings.view_tag()?,
            &self.settings.view_path(&self.build_key)?,
        )?;
        Ok(())
    }

    fn update_view(&self) -> Result<(), EngineError> {
        if self.settings.disable_update {
            debug!("view update disabled");
            return Ok(());
        }
        let path = self.settings.view_path(&self.build_key)?;
        info!(path = %path.display(), "updating view");
        self.ct.update_view(&path)?;
        Ok(())
    }

    /// Commits between `previous` and `latest`. A missing or timestamp-shaped
    /// previous marker means this is the first comparison, so `latest` is
    /// compared with itself.
    fn baseline_summary(&self, latest: &str, previous: Option<&str>) -> Result<Vec<CommitRecord>, EngineError> {
        let previous = match previous.map(RevisionMarker::classify) {
            Some(RevisionMarker::Baseline(prev)) if !prev.trim().is_empty() => prev,
            _ => {
                debug!("first baseline comparison");
                latest.to_string()
            }
        };
        changes::diff_summary(
            &self.ct,
            latest,
            &previous,
            &self.settings.view_path(&self.build_key)?,
            &self.settings.container_suffix(),
        )
    }

    // =========================================================================
    // Date based
    // =========================================================================

    /// Refresh the Base view and collect history since `previous`. The
    /// marker is checked before any command runs.
    fn sync_base(&self, previous: Option<&str>) -> Result<SyncOutcome, EngineError> {
        let now = self.now();
        let since = self.since(previous.unwrap_or(""), now)?;
        let source_dir = self.settings.base_source_dir()?;

        if !self.settings.dynamic_view && !self.settings.disable_update {
            let root = self
                .settings
                .base_view_location
                .as_deref()
                .ok_or(EngineError::MissingSetting("base_view_location"))?;
            info!(path = %root.display(), "updating view");
            self.ct.update_view(root)?;
        }

        debug!(since = %since, "scanning history");
        let commits = changes::scoped_history(&self.ct, &self.history_scope()?, since, self.settings.branch())?;
        info!(commits = commits.len(), "history change summary");

        Ok(SyncOutcome {
            marker: format_timestamp(now),
            changed: true,
            source_dir,
            load_rules_added: Vec::new(),
            commits,
        })
    }

    fn since(&self, previous: &str, now: NaiveDateTime) -> Result<NaiveDateTime, EngineError> {
        since_from_raw(previous, now).map_err(|e| EngineError::MarkerParse {
            marker: previous.to_string(),
            message: e.to_string(),
        })
    }

    fn date_changes(&self, previous: &str) -> Result<BuildChanges, EngineError> {
        let since = self.since(previous, self.now())?;
        debug!(since = %since, "scanning history");

        let commits = changes::scoped_history(&self.ct, &self.history_scope()?, since, self.settings.branch())?;
        let marker = match changes::newest_date(&commits) {
            Some(latest) => marker_after(latest),
            None => previous.to_string(),
        };
        info!(commits = commits.len(), marker = %marker, "history change summary");

        Ok(BuildChanges { marker, commits })
    }

    /// A configured VOB directory, else every subdirectory of the view.
    fn history_scope(&self) -> Result<HistoryScope, EngineError> {
        let settings = self.settings;
        let root = match settings.vcs {
            VcsType::Base => settings
                .base_view_location
                .clone()
                .ok_or(EngineError::MissingSetting("base_view_location"))?,
            VcsType::Ucm => settings.view_path(&self.build_key)?,
        };
        Ok(match settings.vob_dir() {
            Some(vob) => HistoryScope::Vob(root.join(vob)),
            None => HistoryScope::Children(root),
        })
    }
}
