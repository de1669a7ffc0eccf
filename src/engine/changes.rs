//! engine::changes
//!
//! Change summaries between two builds.
//!
//! UCM plans diff two baselines with `diffbl -act -ver`; every activity
//! becomes one commit whose owner and date are asked of `describe`. Base
//! plans scan `lshistory` since a point in time; every history record
//! becomes one commit with one file. In both cases the order printed by
//! `cleartool` is kept.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{debug, error, info};

use super::EngineError;
use crate::cleartool::Cleartool;
use crate::core::parse::{self, ActivityLookup, HISTORY_FIELD_DELIMITER, HISTORY_RECORD_DELIMITER};
use crate::core::types::{CommitRecord, Selector};

/// Answers activity owner and date lookups with `describe`.
#[derive(Debug, Clone, Copy)]
pub struct DescribeLookup<'a> {
    ct: Cleartool<'a>,
}

impl<'a> DescribeLookup<'a> {
    pub fn new(ct: Cleartool<'a>) -> Self {
        Self { ct }
    }
}

impl ActivityLookup for DescribeLookup<'_> {
    type Error = EngineError;

    fn owner(&self, activity: &Selector) -> Result<String, EngineError> {
        Ok(self.ct.owner(&activity.to_string())?)
    }

    fn date(&self, activity: &Selector) -> Result<String, EngineError> {
        Ok(self.ct.object_date(&activity.to_string())?)
    }
}

/// Commits between `previous` and `latest`.
///
/// `diffbl` runs inside `view_path`, and element paths under it are
/// reported relative to it.
pub fn diff_summary(
    ct: &Cleartool<'_>,
    latest: &str,
    previous: &str,
    view_path: &Path,
    container_suffix: &str,
) -> Result<Vec<CommitRecord>, EngineError> {
    debug!(latest = %latest, previous = %previous, "diffing baselines");
    let diff = ct.diff_baselines(latest, previous, view_path)?;
    let prefix = view_path.display().to_string();
    let commits = parse::commits_from_diff(&diff, container_suffix, Some(&prefix), &DescribeLookup::new(*ct))?;
    info!(commits = commits.len(), "baseline change summary");
    Ok(commits)
}

/// Commits recorded in `dir` since `since`.
pub fn history_summary(
    ct: &Cleartool<'_>,
    dir: &Path,
    since: NaiveDateTime,
    branch: Option<&str>,
) -> Result<Vec<CommitRecord>, EngineError> {
    let text = ct.history_since(dir, since, branch)?;
    let records = parse::history_records(&text, HISTORY_FIELD_DELIMITER, HISTORY_RECORD_DELIMITER);
    debug!(dir = %dir.display(), records = records.len(), "history records");
    Ok(parse::commits_from_history(records))
}

/// Where to scan history for a Base plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryScope {
    /// One VOB directory; failures are fatal.
    Vob(PathBuf),
    /// Every immediate subdirectory of a view root; failures are logged and
    /// the directory skipped.
    Children(PathBuf),
}

/// Commits since `since` across `scope`.
pub fn scoped_history(
    ct: &Cleartool<'_>,
    scope: &HistoryScope,
    since: NaiveDateTime,
    branch: Option<&str>,
) -> Result<Vec<CommitRecord>, EngineError> {
    match scope {
        HistoryScope::Vob(dir) => history_summary(ct, dir, since, branch),
        HistoryScope::Children(root) => {
            let dirs = match child_dirs(root) {
                Ok(dirs) if !dirs.is_empty() => dirs,
                Ok(_) => {
                    error!(root = %root.display(), "no subdirs found");
                    return Ok(Vec::new());
                }
                Err(e) => {
                    error!(root = %root.display(), error = %e, "no subdirs found");
                    return Ok(Vec::new());
                }
            };

            let mut commits = Vec::new();
            for dir in dirs {
                match history_summary(ct, &dir, since, branch) {
                    Ok(found) => commits.extend(found),
                    Err(e) => error!(dir = %dir.display(), error = %e, "unable to scan history, skipping"),
                }
            }
            Ok(commits)
        }
    }
}

fn child_dirs(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut dirs: Vec<PathBuf> = std::fs::read_dir(root)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// The newest commit date, if any commit carries one.
pub fn newest_date(commits: &[CommitRecord]) -> Option<NaiveDateTime> {
    commits.iter().filter_map(|c| c.date).max()
}
