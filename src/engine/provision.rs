//! engine::provision
//!
//! Ensure the build stream and its view exist.
//!
//! # State machine
//!
//! | Stream | View tag | View dir | Result                          |
//! |--------|----------|----------|---------------------------------|
//! | absent | absent   | absent   | create stream, then view        |
//! | exists | absent   | absent   | create view                     |
//! | exists | exists   | exists   | nothing to do                   |
//! | any    | exists   | absent   | fatal: tag without storage      |
//! | any    | absent   | exists   | fatal: storage without tag      |
//!
//! Inconsistent states are never repaired; they need an operator. Nothing is
//! rolled back either: a stream created before a failed `mkview` stays.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::EngineError;
use crate::cleartool::Cleartool;
use crate::core::types::Selector;

/// What was found before provisioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionState {
    AbsentAbsent,
    StreamOnly,
    /// View registered and on disk, stream missing.
    ViewOnly,
    Ready,
}

impl ProvisionState {
    fn from_parts(stream: bool, view: bool) -> Self {
        match (stream, view) {
            (false, false) => ProvisionState::AbsentAbsent,
            (true, false) => ProvisionState::StreamOnly,
            (false, true) => ProvisionState::ViewOnly,
            (true, true) => ProvisionState::Ready,
        }
    }
}

/// The view to attach to the build stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSpec {
    pub tag: String,
    /// Snapshot root, or the mount point of a dynamic view.
    pub path: PathBuf,
    /// `.vws` storage; `None` lets `cleartool` pick.
    pub storage: Option<PathBuf>,
    pub dynamic: bool,
}

/// The result of [`Provisioner::ensure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisionOutcome {
    pub initial: ProvisionState,
    pub stream_created: bool,
    pub view_created: bool,
}

/// Creates the build stream and view on demand.
#[derive(Debug, Clone, Copy)]
pub struct Provisioner<'a> {
    ct: Cleartool<'a>,
}

impl<'a> Provisioner<'a> {
    /// Build streams are always created read-only.
    pub fn new(ct: Cleartool<'a>) -> Self {
        Self { ct }
    }

    /// Make sure `stream` (a child of `integration`) and its view exist.
    ///
    /// # Errors
    ///
    /// `EngineError::InconsistentView` when the view tag and the view
    /// directory disagree, or any command failure.
    pub fn ensure(
        &self,
        stream: &Selector,
        integration: &Selector,
        view: &ViewSpec,
    ) -> Result<ProvisionOutcome, EngineError> {
        let stream_exists = self.ct.stream_exists(stream)?;
        let stream_created = if stream_exists {
            false
        } else {
            info!(stream = %stream, parent = %integration, "creating build stream");
            self.ct.make_stream(integration, stream, true)?;
            true
        };

        let view_exists = self.view_exists(&view.tag, &view.path)?;
        let view_created = if view_exists {
            false
        } else {
            info!(tag = %view.tag, path = %view.path.display(), dynamic = view.dynamic, "creating build view");
            self.ct
                .make_view(&view.tag, stream, view.storage.as_deref(), &view.path, !view.dynamic)?;
            true
        };

        Ok(ProvisionOutcome {
            initial: ProvisionState::from_parts(stream_exists, view_exists),
            stream_created,
            view_created,
        })
    }

    /// Is the view registered, with its directory present?
    fn view_exists(&self, tag: &str, path: &Path) -> Result<bool, EngineError> {
        let registered = self.ct.view_registered(tag)?;
        let on_disk = path.exists();
        debug!(tag = %tag, registered, on_disk, "view probe");

        if registered != on_disk {
            return Err(EngineError::InconsistentView {
                tag: tag.to_string(),
                path: path.to_path_buf(),
                registered,
            });
        }
        Ok(registered)
    }
}
