//! core::parse
//!
//! Pure functions that turn raw `cleartool` output into typed results.
//!
//! Nothing here runs a command. Where a parse needs more information (the
//! owner and date of an activity found in a diff), it asks through the
//! [`ActivityLookup`] trait so the parser stays testable without a VOB.
//!
//! Malformed change-summary lines are logged and skipped. Partial results are
//! preferred over failing the whole summary.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, error, warn};

use super::marker::parse_numeric_date;
use super::types::{CommitFile, CommitRecord, Selector, SelectorKind, TypeError};

/// Banner printed by ClearCase 7 and later before the diff body.
pub const DIFF_BANNER: &str = "Differences:";

/// Prefixes that mark an activity line in `diffbl` output.
pub const ACTIVITY_PREFIXES: [&str; 4] = ["<<", ">>", "->", "<-"];

/// Separator between element path and version in a version-extended path.
pub const VERSION_SEPARATOR: &str = "@@";

/// Field separator used by the history format string.
pub const HISTORY_FIELD_DELIMITER: &str = "#~#~#";

/// Record separator used by the history format string.
pub const HISTORY_RECORD_DELIMITER: &str = "@#@#@#@#@";

/// `lshistory -fmt` string producing `{date, user, file, version, operation, comment}`.
pub const HISTORY_FORMAT: &str = "%Nd#~#~#%u#~#~#%En#~#~#%Vn#~#~#%o#~#~#%Nc@#@#@#@#@";

/// Number of fields every history record must carry. The comment is optional.
const HISTORY_MIN_FIELDS: usize = 5;

fn line_breaks() -> &'static Regex {
    static BREAKS: OnceLock<Regex> = OnceLock::new();
    BREAKS.get_or_init(|| Regex::new(r"[\n\x0C\r]").expect("static regex"))
}

/// Split `text` on `delimiter` (any CR, LF or FF when `None`), trimming each
/// token and dropping empty ones when `ignore_empty` is set.
///
/// # Example
///
/// ```
/// use ccsync::core::parse::tokens;
///
/// let items = tokens(" a \r\n\r\nb\n", None, true);
/// assert_eq!(items, vec!["a", "b"]);
/// ```
pub fn tokens(text: &str, delimiter: Option<&Regex>, ignore_empty: bool) -> Vec<String> {
    let pattern = delimiter.unwrap_or_else(|| line_breaks());
    pattern
        .split(text)
        .map(str::trim)
        .filter(|token| !(ignore_empty && token.is_empty()))
        .map(str::to_string)
        .collect()
}

/// Split on whitespace, as used for `%[...]Xp` list output.
pub fn words(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

/// Extract the load rules from a config spec.
///
/// Only lines starting with `load ` are rules; every other directive is
/// ignored. Returns an empty set when there are none.
pub fn load_rules(config_spec: &str) -> BTreeSet<String> {
    tokens(config_spec, None, true)
        .into_iter()
        .filter_map(|line| line.strip_prefix("load ").map(str::to_string))
        .collect()
}

/// Parse `lsbl -fmt "%d,%Xn\n"` output into baseline selectors, in the
/// order `cleartool` printed them (oldest first).
pub fn dated_baselines(text: &str) -> Vec<String> {
    tokens(text, None, true)
        .into_iter()
        .map(|line| match line.split_once(',') {
            Some((_, baseline)) => baseline.trim().to_string(),
            None => line,
        })
        .filter(|baseline| !baseline.is_empty())
        .collect()
}

/// Drop everything up to and including the ClearCase 7 diff banner.
pub fn strip_diff_banner(text: &str) -> &str {
    match text.find(DIFF_BANNER) {
        Some(pos) => &text[pos + DIFF_BANNER.len()..],
        None => text,
    }
}

/// True if a (trimmed) diff line introduces an activity.
pub fn is_activity_line(line: &str) -> bool {
    let line = line.trim();
    line.get(..2)
        .map_or(false, |prefix| ACTIVITY_PREFIXES.contains(&prefix))
}

/// An activity line split into identifier and headline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityLine {
    pub id: String,
    pub headline: String,
}

/// Split an activity line like `>> act1@\pvob Fix the thing`.
///
/// Leading `<`, `>`, `-` and spaces are skipped, the identifier runs up to the
/// next space and everything after it is the headline.
pub fn parse_activity_line(line: &str) -> ActivityLine {
    let body = line
        .trim()
        .trim_start_matches(|c: char| matches!(c, '<' | '>' | '-' | ' '));
    match body.split_once(' ') {
        Some((id, headline)) => ActivityLine {
            id: id.to_string(),
            headline: headline.to_string(),
        },
        None => ActivityLine {
            id: body.to_string(),
            headline: String::new(),
        },
    }
}

/// Split a version line into a [`CommitFile`].
///
/// `view_prefix` is removed from the front of the element path when it
/// matches case-insensitively. Returns `None` for lines without a version.
pub fn parse_version_line(line: &str, view_prefix: Option<&str>) -> Option<CommitFile> {
    let line = line.trim();
    let mut parts = line.split(VERSION_SEPARATOR);
    let element = parts.next()?;
    let version = parts.next().filter(|v| !v.is_empty())?;

    let element = match view_prefix.filter(|p| !p.is_empty()) {
        Some(prefix) if starts_with_ignore_case(element, prefix) => &element[prefix.len()..],
        _ => element,
    };

    Some(CommitFile::with_revision(element, version))
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.get(..prefix.len())
        .map_or(false, |head| head.eq_ignore_ascii_case(prefix))
}

/// Owner and date of an activity, answered by `describe`.
pub trait ActivityLookup {
    type Error: From<TypeError>;

    /// The activity owner, as printed by `%[owner]p`.
    fn owner(&self, activity: &Selector) -> Result<String, Self::Error>;

    /// The activity creation date, as printed by `%Nd`.
    fn date(&self, activity: &Selector) -> Result<String, Self::Error>;
}

/// Build commit records from `diffbl -act -ver` output.
///
/// `container_suffix` (for example `@\pvob`) is appended to activity ids that
/// carry no container. Owners are lower-cased.
pub fn commits_from_diff<L: ActivityLookup + ?Sized>(
    diff: &str,
    container_suffix: &str,
    view_prefix: Option<&str>,
    lookup: &L,
) -> Result<Vec<CommitRecord>, L::Error> {
    let body = strip_diff_banner(diff);
    let mut commits: Vec<CommitRecord> = Vec::new();

    for line in tokens(body, None, true) {
        if is_activity_line(&line) {
            let activity = parse_activity_line(&line);
            let id = if activity.id.contains('@') {
                activity.id.clone()
            } else {
                format!("{}{}", activity.id, container_suffix)
            };
            let selector = Selector::typed(SelectorKind::Activity, &id).map_err(|e| {
                error!(id = %activity.id, "bad activity selector");
                e
            })?;
            debug!(activity = %selector, headline = %activity.headline, "diff activity");

            let owner = lookup.owner(&selector)?;
            let date = parse_numeric_date(&lookup.date(&selector)?);
            let comment = if activity.headline.trim().is_empty() {
                activity.id
            } else {
                activity.headline.trim().to_string()
            };

            let mut commit = CommitRecord::new(owner.trim().to_lowercase());
            commit.date = date;
            commit.comment = Some(comment);
            commits.push(commit);
            continue;
        }

        let Some(current) = commits.last_mut() else {
            warn!(line = %line, "version line before any activity, ignoring");
            continue;
        };
        match parse_version_line(&line, view_prefix) {
            Some(file) => current.files.push(file),
            None => warn!(line = %line, "unable to process version line"),
        }
    }

    Ok(commits)
}

/// One `lshistory` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    pub date: String,
    pub user: String,
    pub file: String,
    pub version: String,
    pub operation: String,
    pub comment: Option<String>,
}

/// Split history output into records.
///
/// Records with fewer than five fields are logged and skipped. An empty or
/// missing comment becomes `None`.
pub fn history_records(text: &str, field_delimiter: &str, record_delimiter: &str) -> Vec<HistoryRecord> {
    text.split(record_delimiter)
        .map(str::trim)
        .filter(|record| !record.is_empty())
        .filter_map(|record| {
            let fields: Vec<&str> = record.split(field_delimiter).collect();
            if fields.len() < HISTORY_MIN_FIELDS {
                warn!(record = %record, fields = fields.len(), "short history record, skipping");
                return None;
            }
            Some(HistoryRecord {
                date: fields[0].trim().to_string(),
                user: fields[1].trim().to_string(),
                file: fields[2].trim().to_string(),
                version: fields[3].trim().to_string(),
                operation: fields[4].trim().to_string(),
                comment: fields
                    .get(5)
                    .map(|c| c.trim())
                    .filter(|c| !c.is_empty())
                    .map(str::to_string),
            })
        })
        .collect()
}

/// Map history records to commits, one file per record.
///
/// The author is kept exactly as printed.
pub fn commits_from_history(records: Vec<HistoryRecord>) -> Vec<CommitRecord> {
    records
        .into_iter()
        .map(|record| {
            let mut commit = CommitRecord::new(record.user);
            commit.date = parse_numeric_date(&record.date);
            commit.comment = record.comment;
            commit
                .files
                .push(CommitFile::with_revision(record.file, &record.version));
            commit
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct FixedLookup {
        owner: &'static str,
        date: &'static str,
        asked: RefCell<Vec<String>>,
    }

    impl FixedLookup {
        fn new() -> Self {
            Self {
                owner: "JSmith",
                date: "20240102.030405",
                asked: RefCell::new(Vec::new()),
            }
        }
    }

    impl ActivityLookup for FixedLookup {
        type Error = TypeError;

        fn owner(&self, activity: &Selector) -> Result<String, TypeError> {
            self.asked.borrow_mut().push(activity.to_string());
            Ok(self.owner.to_string())
        }

        fn date(&self, _activity: &Selector) -> Result<String, TypeError> {
            Ok(self.date.to_string())
        }
    }

    mod tokens {
        use super::*;

        #[test]
        fn keeps_empties_when_asked() {
            assert_eq!(tokens("a\n\nb", None, false), vec!["a", "", "b"]);
        }

        #[test]
        fn custom_delimiter() {
            let comma = Regex::new(",").unwrap();
            assert_eq!(tokens("a, b ,,c", Some(&comma), true), vec!["a", "b", "c"]);
        }

        #[test]
        fn form_feed_splits() {
            assert_eq!(tokens("a\x0Cb", None, true), vec!["a", "b"]);
        }
    }

    mod load_rules {
        use super::*;

        #[test]
        fn only_load_lines_count() {
            let spec = "element * CHECKEDOUT\r\nload \\vob\\comp1\nload \\vob\\comp2\n# load nothing\n";
            let rules = load_rules(spec);
            assert_eq!(rules.len(), 2);
            assert!(rules.contains("\\vob\\comp1"));
            assert!(rules.contains("\\vob\\comp2"));
        }

        #[test]
        fn empty_when_none() {
            assert!(load_rules("element * /main/LATEST\n").is_empty());
            assert!(load_rules("").is_empty());
        }
    }

    #[test]
    fn dated_baselines_strip_date() {
        let text = "20240101.000000,baseline:b1@\\pvob\n20240102.000000,baseline:b2@\\pvob\n\n";
        assert_eq!(
            dated_baselines(text),
            vec!["baseline:b1@\\pvob", "baseline:b2@\\pvob"]
        );
    }

    mod diff {
        use super::*;

        #[test]
        fn one_activity_two_files() {
            let lookup = FixedLookup::new();
            let commits = commits_from_diff(
                ">> act1 headline\nfile1.txt@@1\nfile2.txt@@2\n",
                "@\\pvob",
                None,
                &lookup,
            )
            .unwrap();

            assert_eq!(commits.len(), 1);
            let files = &commits[0].files;
            assert_eq!(files.len(), 2);
            assert_eq!(files[0].path, "file1.txt");
            assert_eq!(files[0].revision.as_deref(), Some("1"));
            assert_eq!(files[1].path, "file2.txt");
            assert_eq!(files[1].revision.as_deref(), Some("2"));
        }

        #[test]
        fn owner_lowercased_and_dated() {
            let lookup = FixedLookup::new();
            let commits = commits_from_diff(">> act1 Fix build\n", "@\\pvob", None, &lookup).unwrap();
            assert_eq!(commits[0].author, "jsmith");
            assert_eq!(commits[0].comment.as_deref(), Some("Fix build"));
            assert!(commits[0].date.is_some());
        }

        #[test]
        fn container_appended_when_missing() {
            let lookup = FixedLookup::new();
            commits_from_diff(">> act1 x\n<< act2@\\other y\n", "@\\pvob", None, &lookup).unwrap();
            let asked = lookup.asked.borrow();
            assert_eq!(asked[0], format!("activity:act1@{}pvob", crate::core::types::CONTAINER_SEPARATOR));
            assert_eq!(asked[1], format!("activity:act2@{}other", crate::core::types::CONTAINER_SEPARATOR));
        }

        #[test]
        fn banner_preamble_skipped() {
            let lookup = FixedLookup::new();
            let text = "Comparing the following:\n  bl1@\\pvob\n  bl2@\\pvob\nDifferences:\n>> act1 h\nf@@\\main\\1\n";
            let commits = commits_from_diff(text, "@\\pvob", None, &lookup).unwrap();
            assert_eq!(commits.len(), 1);
            assert_eq!(commits[0].files.len(), 1);
        }

        #[test]
        fn orphan_and_malformed_lines_skipped() {
            let lookup = FixedLookup::new();
            let text = "orphan.txt@@1\n-> act1 h\nno-version-here\nempty@@\nok.c@@\\main\\4\n";
            let commits = commits_from_diff(text, "@\\pvob", None, &lookup).unwrap();
            assert_eq!(commits.len(), 1);
            assert_eq!(commits[0].files, vec![CommitFile::with_revision("ok.c", "\\main\\4")]);
        }

        #[test]
        fn view_prefix_stripped_case_insensitively() {
            let file = parse_version_line("C:\\Views\\Build\\src\\a.c@@\\main\\2", Some("c:\\views\\build")).unwrap();
            assert_eq!(file.path, "\\src\\a.c");
        }

        #[test]
        fn activity_without_headline_uses_id() {
            let lookup = FixedLookup::new();
            let commits = commits_from_diff("<- lonely\n", "@\\pvob", None, &lookup).unwrap();
            assert_eq!(commits[0].comment.as_deref(), Some("lonely"));
        }

        #[test]
        fn short_lines_are_not_activities() {
            assert!(!is_activity_line(">"));
            assert!(!is_activity_line(""));
            assert!(is_activity_line("  >> x"));
        }

        #[test]
        fn activity_line_split() {
            let parsed = parse_activity_line(">> deliver.x@\\pvob \"Deliver to int\"");
            assert_eq!(parsed.id, "deliver.x@\\pvob");
            assert_eq!(parsed.headline, "\"Deliver to int\"");
        }
    }

    mod history {
        use super::*;

        fn record(comment: &str) -> String {
            format!(
                "20240102.030405#~#~#JDoe#~#~#src/a.c#~#~#/main/3#~#~#checkin version#~#~#{}@#@#@#@#@",
                comment
            )
        }

        #[test]
        fn full_record() {
            let text = record("fixed it");
            let records = history_records(&text, HISTORY_FIELD_DELIMITER, HISTORY_RECORD_DELIMITER);
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].user, "JDoe");
            assert_eq!(records[0].comment.as_deref(), Some("fixed it"));
        }

        #[test]
        fn empty_comment_is_none() {
            let text = format!("{}\n{}", record(""), record("  "));
            let records = history_records(&text, HISTORY_FIELD_DELIMITER, HISTORY_RECORD_DELIMITER);
            assert_eq!(records.len(), 2);
            assert!(records.iter().all(|r| r.comment.is_none()));
        }

        #[test]
        fn missing_comment_field_is_allowed() {
            let text = "20240102.030405#~#~#u#~#~#f#~#~#v#~#~#op@#@#@#@#@";
            let records = history_records(text, HISTORY_FIELD_DELIMITER, HISTORY_RECORD_DELIMITER);
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].comment, None);
        }

        #[test]
        fn short_record_skipped() {
            let text = format!("garbage#~#~#x@#@#@#@#@{}", record("ok"));
            let records = history_records(&text, HISTORY_FIELD_DELIMITER, HISTORY_RECORD_DELIMITER);
            assert_eq!(records.len(), 1);
        }

        #[test]
        fn commits_keep_author_case_and_order() {
            let text = format!("{}{}", record("first"), record("second"));
            let commits = commits_from_history(history_records(
                &text,
                HISTORY_FIELD_DELIMITER,
                HISTORY_RECORD_DELIMITER,
            ));
            assert_eq!(commits.len(), 2);
            assert_eq!(commits[0].author, "JDoe");
            assert_eq!(commits[0].comment.as_deref(), Some("first"));
            assert_eq!(commits[1].comment.as_deref(), Some("second"));
            assert_eq!(commits[0].files.len(), 1);
            assert_eq!(commits[0].files[0].revision.as_deref(), Some("/main/3"));
        }
    }
}
