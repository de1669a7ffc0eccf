//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`SelectorKind`] - The kind prefix of a ClearCase object selector
//! - [`Selector`] - A typed ClearCase object reference (`kind:name@container`)
//! - [`CommitRecord`] - One change-summary entry (an activity or history event)
//! - [`CommitFile`] - A changed element and its version
//!
//! # Validation
//!
//! Selector parsing is permissive: the kind prefix and the container suffix
//! are both optional. Rendering is canonical, so a parsed selector always
//! renders the same way no matter how it was written.
//!
//! # Examples
//!
//! ```
//! use ccsync::core::types::{Selector, SelectorKind};
//!
//! let project = Selector::typed(SelectorKind::Project, "Proj1").unwrap();
//! assert_eq!(project.to_string(), "project:Proj1");
//!
//! // A conflicting kind prefix is rejected
//! assert!(Selector::typed(SelectorKind::Project, "stream:Proj1").is_err());
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Separator placed between `@` and the container when rendering.
pub const CONTAINER_SEPARATOR: char = std::path::MAIN_SEPARATOR;

/// Maximum length of a recorded revision label, in characters.
pub const MAX_REVISION_LEN: usize = 254;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("The selector can not set to null")]
    NullSelector,

    #[error("selector kind [{expected}] did not match that passed, value [{value}]")]
    KindMismatch { expected: String, value: String },

    #[error("unknown selector kind '{0}'")]
    UnknownKind(String),

    #[error("invalid revision marker: {0}")]
    InvalidMarker(String),
}

/// The kind of a ClearCase object named by a [`Selector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorKind {
    Project,
    Vob,
    Stream,
    Baseline,
    /// Rendered as `attype`.
    ActivityType,
    Activity,
    Component,
}

impl SelectorKind {
    /// The prefix used in the textual selector form.
    ///
    /// # Example
    ///
    /// ```
    /// use ccsync::core::types::SelectorKind;
    ///
    /// assert_eq!(SelectorKind::ActivityType.as_str(), "attype");
    /// assert_eq!(SelectorKind::Stream.as_str(), "stream");
    /// ```
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectorKind::Project => "project",
            SelectorKind::Vob => "vob",
            SelectorKind::Stream => "stream",
            SelectorKind::Baseline => "baseline",
            SelectorKind::ActivityType => "attype",
            SelectorKind::Activity => "activity",
            SelectorKind::Component => "component",
        }
    }
}

impl FromStr for SelectorKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "project" => Ok(SelectorKind::Project),
            "vob" => Ok(SelectorKind::Vob),
            "stream" => Ok(SelectorKind::Stream),
            "baseline" => Ok(SelectorKind::Baseline),
            "attype" => Ok(SelectorKind::ActivityType),
            "activity" => Ok(SelectorKind::Activity),
            "component" => Ok(SelectorKind::Component),
            other => Err(TypeError::UnknownKind(other.to_string())),
        }
    }
}

impl fmt::Display for SelectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ClearCase object selector: `[kind:]name[@container]`.
///
/// The container (usually the project VOB) is stored without any leading
/// path separator; rendering puts exactly one back.
///
/// Selectors are immutable once parsed, apart from [`Selector::set_kind`]
/// and [`Selector::set_name`] which exist for incremental construction.
///
/// # Example
///
/// ```
/// use ccsync::core::types::{Selector, SelectorKind, CONTAINER_SEPARATOR};
///
/// let text = format!("baseline:Rel5_26_10@{}Curam", CONTAINER_SEPARATOR);
/// let bl: Selector = text.parse().unwrap();
/// assert_eq!(bl.kind(), Some(SelectorKind::Baseline));
/// assert_eq!(bl.name(), "Rel5_26_10");
/// assert_eq!(bl.container(), Some("Curam"));
/// assert_eq!(bl.to_string(), text);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Selector {
    kind: Option<SelectorKind>,
    name: String,
    container: Option<String>,
}

impl Selector {
    /// An empty selector expecting the given kind (or any kind if `None`).
    pub fn new(kind: Option<SelectorKind>) -> Self {
        Self {
            kind,
            name: String::new(),
            container: None,
        }
    }

    /// Parse `text` into a selector expecting `kind`.
    ///
    /// # Errors
    ///
    /// `TypeError::KindMismatch` if `text` carries a different kind prefix.
    pub fn typed(kind: SelectorKind, text: &str) -> Result<Self, TypeError> {
        let mut selector = Self::new(Some(kind));
        selector.set_from_str(Some(text))?;
        Ok(selector)
    }

    /// Parse a possibly-absent selector string.
    ///
    /// # Errors
    ///
    /// `TypeError::NullSelector` when `text` is `None`, otherwise as
    /// [`Selector::set_from_str`].
    pub fn parse(kind: Option<SelectorKind>, text: Option<&str>) -> Result<Self, TypeError> {
        let mut selector = Self::new(kind);
        selector.set_from_str(text)?;
        Ok(selector)
    }

    /// Replace name and container with those parsed from `text`.
    ///
    /// Accepts `Proj1`, `project:Proj1`, `Proj1@\Pvob` and
    /// `project:Proj1@\Pvob`. A kind prefix fills in the kind when it is not
    /// yet set and must match it otherwise.
    pub fn set_from_str(&mut self, text: Option<&str>) -> Result<(), TypeError> {
        let text = text.ok_or(TypeError::NullSelector)?;

        let rest = match text.split_once(':') {
            Some((stated, rest)) => {
                let stated_kind = match (stated.parse::<SelectorKind>(), self.kind) {
                    (Ok(kind), _) => kind,
                    (Err(err), None) => return Err(err),
                    (Err(_), Some(_)) => {
                        return Err(TypeError::KindMismatch {
                            expected: self.kind_label(),
                            value: text.to_string(),
                        })
                    }
                };
                if !self.is_valid_kind(stated_kind) {
                    return Err(TypeError::KindMismatch {
                        expected: self.kind_label(),
                        value: text.to_string(),
                    });
                }
                self.kind.get_or_insert(stated_kind);
                rest
            }
            None => text,
        };

        match rest.split_once('@') {
            Some((name, container)) => {
                self.name = name.to_string();
                let container = container.trim_start_matches(&['\\', '/'][..]);
                self.container = if container.trim().is_empty() {
                    None
                } else {
                    Some(container.to_string())
                };
            }
            None => {
                self.name = rest.to_string();
                self.container = None;
            }
        }

        Ok(())
    }

    /// True if this selector's kind is unset or equal to `candidate`.
    pub fn is_valid_kind(&self, candidate: SelectorKind) -> bool {
        self.kind.map_or(true, |kind| kind == candidate)
    }

    /// Fill in or overwrite the kind.
    pub fn set_kind(&mut self, kind: SelectorKind) {
        self.kind = Some(kind);
    }

    /// Overwrite the name portion.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// A copy of this selector with a different kind and name but the same
    /// container. Used to derive sibling objects in the same project VOB.
    pub fn sibling(&self, kind: SelectorKind, name: impl Into<String>) -> Self {
        Self {
            kind: Some(kind),
            name: name.into(),
            container: self.container.clone(),
        }
    }

    pub fn kind(&self) -> Option<SelectorKind> {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The container without any leading separator.
    pub fn container(&self) -> Option<&str> {
        self.container.as_deref()
    }

    /// The `@<sep><container>` suffix, or an empty string.
    pub fn container_suffix(&self) -> String {
        match &self.container {
            Some(container) => format!("@{}{}", CONTAINER_SEPARATOR, container),
            None => String::new(),
        }
    }

    /// True if no name has been set.
    pub fn is_empty(&self) -> bool {
        self.name.trim().is_empty()
    }

    fn kind_label(&self) -> String {
        self.kind.map(|k| k.to_string()).unwrap_or_default()
    }
}

impl FromStr for Selector {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(None, Some(s))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(kind) = self.kind {
            write!(f, "{}:", kind)?;
        }
        write!(f, "{}{}", self.name, self.container_suffix())
    }
}

impl Serialize for Selector {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A changed element recorded against a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitFile {
    /// Element path, relative to the view when the view prefix was present.
    pub path: String,
    /// Version label, at most [`MAX_REVISION_LEN`] characters.
    pub revision: Option<String>,
}

impl CommitFile {
    /// A file with a revision label, truncated to [`MAX_REVISION_LEN`].
    ///
    /// # Example
    ///
    /// ```
    /// use ccsync::core::types::{CommitFile, MAX_REVISION_LEN};
    ///
    /// let long = "x".repeat(300);
    /// let file = CommitFile::with_revision("src/a.c", &long);
    /// assert_eq!(file.revision.unwrap().len(), MAX_REVISION_LEN);
    /// ```
    pub fn with_revision(path: impl Into<String>, revision: &str) -> Self {
        Self {
            path: path.into(),
            revision: Some(revision.chars().take(MAX_REVISION_LEN).collect()),
        }
    }

    /// A file with no revision label.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            revision: None,
        }
    }
}

/// One entry of a change summary.
///
/// Built incrementally while reading diff output: an activity line starts a
/// record, the version lines that follow append files to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitRecord {
    pub author: String,
    pub date: Option<NaiveDateTime>,
    pub comment: Option<String>,
    pub files: Vec<CommitFile>,
}

impl CommitRecord {
    pub fn new(author: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            date: None,
            comment: None,
            files: Vec::new(),
        }
    }
}
