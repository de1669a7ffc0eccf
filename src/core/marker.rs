//! core::marker
//!
//! The revision marker persisted by the build server between builds.
//!
//! A marker is an opaque string that is either the canonical rendering of a
//! baseline selector or a `yyyyMMdd.HHmmss` timestamp. The two forms are told
//! apart by shape alone: anything matching `^[0-9]+\.[0-9]+$` is a timestamp.

use std::fmt;
use std::sync::OnceLock;

use chrono::{Duration, NaiveDateTime};
use regex::Regex;

use super::types::TypeError;

/// `strftime` form of the numeric ClearCase date (`%Nd`): `yyyyMMdd.HHmmss`.
pub const MARKER_DATE_FORMAT: &str = "%Y%m%d.%H%M%S";

/// Date format used by older revision keys and by `lshistory -since`.
pub const LEGACY_DATE_FORMAT: &str = "%d-%b-%y.%H:%M:%S";

fn timestamp_shape() -> &'static Regex {
    static SHAPE: OnceLock<Regex> = OnceLock::new();
    SHAPE.get_or_init(|| Regex::new(r"^[0-9]+\.[0-9]+$").expect("static regex"))
}

/// True if `marker` has the shape of a numeric timestamp.
///
/// # Example
///
/// ```
/// use ccsync::core::marker::is_timestamp_shaped;
///
/// assert!(is_timestamp_shaped("20240131.235959"));
/// assert!(!is_timestamp_shaped("baseline:foo@\\vob"));
/// ```
pub fn is_timestamp_shaped(marker: &str) -> bool {
    timestamp_shape().is_match(marker)
}

/// Format a timestamp as a marker string.
pub fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(MARKER_DATE_FORMAT).to_string()
}

/// Parse a numeric `yyyyMMdd.HHmmss` date, as printed by `%Nd`.
pub fn parse_numeric_date(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text.trim(), MARKER_DATE_FORMAT).ok()
}

/// A classified revision marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionMarker {
    /// A previously built baseline, kept verbatim.
    Baseline(String),
    /// A timestamp-shaped marker, kept verbatim.
    Timestamp(String),
}

impl RevisionMarker {
    /// Classify a raw marker string by shape.
    pub fn classify(raw: &str) -> Self {
        if is_timestamp_shaped(raw) {
            RevisionMarker::Timestamp(raw.to_string())
        } else {
            RevisionMarker::Baseline(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RevisionMarker::Baseline(s) | RevisionMarker::Timestamp(s) => s,
        }
    }
}

/// The point in time history queries should start from.
///
/// Blank markers and baseline markers (left behind when a plan switched from
/// baseline comparison to date comparison) fall back to `now`. Anything else
/// is parsed with the numeric format, then the legacy format, so legacy
/// locale-formatted keys that are not timestamp-shaped still work.
///
/// # Errors
///
/// `TypeError::InvalidMarker` if neither date format matches. The caller
/// has no other way to interpret the marker, so this is fatal.
pub fn since_from_raw(raw: &str, now: NaiveDateTime) -> Result<NaiveDateTime, TypeError> {
    if raw.trim().is_empty() || raw.starts_with("baseline") {
        return Ok(now);
    }
    parse_since(raw)
}

fn parse_since(raw: &str) -> Result<NaiveDateTime, TypeError> {
    if let Some(at) = parse_numeric_date(raw) {
        return Ok(at);
    }
    NaiveDateTime::parse_from_str(raw.trim(), LEGACY_DATE_FORMAT)
        .map_err(|e| TypeError::InvalidMarker(format!("failed to parse revision key {raw}: {e}")))
}

/// The marker to record after seeing a change at `latest`.
///
/// One second is added so the same change is not reported again by the next
/// `-since` query.
pub fn marker_after(latest: NaiveDateTime) -> String {
    format_timestamp(latest + Duration::seconds(1))
}

impl fmt::Display for RevisionMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
