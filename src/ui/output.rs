//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Output is formatted consistently and respects the quiet flag.
//! When `--json` is enabled, output is machine-readable JSON.
//! The revision marker a command produces is printed even in quiet mode;
//! the CI server reads it.

use std::fmt::Display;

use serde::Serialize;

use crate::core::marker::MARKER_DATE_FORMAT;
use crate::core::types::CommitRecord;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print a command result (always shown).
pub fn result(message: impl Display) {
    println!("{}", message);
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Print a success message (respects quiet mode).
pub fn success(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print `value` as pretty JSON.
pub fn json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Format a list of items.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", prefix, item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format one commit: a header line, then one indented line per file.
pub fn format_commit(commit: &CommitRecord) -> String {
    let date = commit
        .date
        .map(|d| d.format(MARKER_DATE_FORMAT).to_string())
        .unwrap_or_else(|| "-".to_string());
    let mut out = format!("{} {} {}", date, commit.author, commit.comment.as_deref().unwrap_or(""));
    out.truncate(out.trim_end().len());
    for file in &commit.files {
        match &file.revision {
            Some(rev) => out.push_str(&format!("\n    {}@@{}", file.path, rev)),
            None => out.push_str(&format!("\n    {}", file.path)),
        }
    }
    out
}

/// Format a change summary.
pub fn format_commits(commits: &[CommitRecord]) -> String {
    if commits.is_empty() {
        return "No changes.".to_string();
    }
    commits.iter().map(format_commit).collect::<Vec<_>>().join("\n")
}
