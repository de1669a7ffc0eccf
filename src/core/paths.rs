//! core::paths
//!
//! Centralized path routing for view locations and view storage.
//!
//! # Layout
//!
//! - Snapshot views created on demand live at
//!   `<view_location>/<build_key>/<build stream name>`.
//! - Dynamic views and hand-made snapshot views use `view_location` as-is.
//! - Build view storage is `<view_storage>/<build stream name>.vws`.
//! - Base ClearCase sources live at `<base_view_location>/<vob_dir>`.
//!
//! No other module should join view paths by hand.
//!
//! # Example
//!
//! ```
//! use ccsync::core::paths::ViewPaths;
//! use std::path::PathBuf;
//!
//! let paths = ViewPaths::new("/views", false, true);
//! assert_eq!(
//!     paths.view_path("PLAN-JOB1", "build_ro_Proj"),
//!     PathBuf::from("/views/PLAN-JOB1/build_ro_Proj")
//! );
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Prefix of host-global variable references inside `${...}`.
pub const HOST_VARIABLE_PREFIX: &str = "host.";

/// Default `view_storage` value.
pub const DEFAULT_VIEW_STORAGE: &str = "${host.view.storage}";

/// Path routing for the build view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewPaths {
    view_location: PathBuf,
    dynamic: bool,
    auto_create: bool,
}

impl ViewPaths {
    pub fn new(view_location: impl Into<PathBuf>, dynamic: bool, auto_create: bool) -> Self {
        Self {
            view_location: view_location.into(),
            dynamic,
            auto_create,
        }
    }

    /// The configured root, before any per-build nesting.
    pub fn root(&self) -> &Path {
        &self.view_location
    }

    /// Where the view for `build_key` lives.
    pub fn view_path(&self, build_key: &str, stream_name: &str) -> PathBuf {
        if self.dynamic || !self.auto_create {
            return self.view_location.clone();
        }
        self.view_location.join(build_key).join(stream_name)
    }

    /// Create the per-build parent directory of [`ViewPaths::view_path`].
    ///
    /// The view directory itself is left for `mkview` to create.
    pub fn ensure_parent(&self, build_key: &str) -> std::io::Result<()> {
        if self.dynamic || !self.auto_create {
            return Ok(());
        }
        std::fs::create_dir_all(self.view_location.join(build_key))
    }

    /// The directory a build reads sources from.
    ///
    /// For a dynamic view mapped to a drive letter this is the drive root.
    pub fn source_dir(&self, build_key: &str, stream_name: &str, drive_letter: Option<&str>) -> PathBuf {
        if self.dynamic {
            if let Some(letter) = drive_letter.map(str::trim).filter(|l| !l.is_empty()) {
                return drive_root(letter);
            }
        }
        self.view_path(build_key, stream_name)
    }
}

/// `X:\` for a drive letter given as `X`, `X:` or `X:\`.
pub fn drive_root(letter: &str) -> PathBuf {
    let letter = letter.trim_end_matches(&['\\', '/'][..]).trim_end_matches(':');
    PathBuf::from(format!("{}:\\", letter))
}

/// View storage for a stream: `<storage_dir>/<stream_name>.vws`.
pub fn view_storage_path(storage_dir: &str, stream_name: &str) -> PathBuf {
    Path::new(storage_dir).join(format!("{}.vws", stream_name))
}

/// Base ClearCase source directory.
pub fn base_source_dir(base_view_location: &Path, vob_dir: &str) -> PathBuf {
    base_view_location.join(vob_dir)
}

fn variable_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^${}]+)\}").expect("static regex"))
}

/// Replace `${host.NAME}` references with values from `variables`.
///
/// References to unknown variables, and `${...}` forms without the `host.`
/// prefix, are left untouched.
///
/// # Example
///
/// ```
/// use ccsync::core::paths::substitute_host_variables;
/// use std::collections::BTreeMap;
///
/// let mut vars = BTreeMap::new();
/// vars.insert("view.storage".to_string(), "\\\\srv\\vws".to_string());
/// assert_eq!(
///     substitute_host_variables("${host.view.storage}", &vars),
///     "\\\\srv\\vws"
/// );
/// ```
pub fn substitute_host_variables(value: &str, variables: &BTreeMap<String, String>) -> String {
    variable_pattern()
        .replace_all(value, |caps: &Captures<'_>| {
            let whole = caps[0].to_string();
            caps[1]
                .strip_prefix(HOST_VARIABLE_PREFIX)
                .and_then(|name| variables.get(name).cloned())
                .unwrap_or(whole)
        })
        .into_owned()
}

/// True if `value` still carries a `${...}` reference.
pub fn has_unresolved_variables(value: &str) -> bool {
    variable_pattern().is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn auto_create_snapshot_is_nested() {
        let paths = ViewPaths::new("/v", false, true);
        assert_eq!(paths.view_path("K", "s"), PathBuf::from("/v/K/s"));
    }

    #[test]
    fn dynamic_and_manual_views_use_root() {
        assert_eq!(ViewPaths::new("/v", true, true).view_path("K", "s"), PathBuf::from("/v"));
        assert_eq!(ViewPaths::new("/v", false, false).view_path("K", "s"), PathBuf::from("/v"));
    }

    #[test]
    fn ensure_parent_creates_build_key_dir() {
        let temp = TempDir::new().unwrap();
        let paths = ViewPaths::new(temp.path(), false, true);
        paths.ensure_parent("PLAN-1").unwrap();
        assert!(temp.path().join("PLAN-1").is_dir());
        assert!(!temp.path().join("PLAN-1/stream").exists());
    }

    #[test]
    fn dynamic_drive_letter_source_dir() {
        let paths = ViewPaths::new("/v", true, false);
        assert_eq!(paths.source_dir("K", "s", Some("M")), PathBuf::from("M:\\"));
        assert_eq!(paths.source_dir("K", "s", Some("M:")), PathBuf::from("M:\\"));
        assert_eq!(paths.source_dir("K", "s", None), PathBuf::from("/v"));
        assert_eq!(paths.source_dir("K", "s", Some(" ")), PathBuf::from("/v"));
    }

    #[test]
    fn snapshot_ignores_drive_letter() {
        let paths = ViewPaths::new("/v", false, true);
        assert_eq!(paths.source_dir("K", "s", Some("M")), PathBuf::from("/v/K/s"));
    }

    #[test]
    fn storage_path() {
        assert_eq!(view_storage_path("/vws", "build_ro_P"), PathBuf::from("/vws/build_ro_P.vws"));
    }

    #[test]
    fn substitution() {
        let mut vars = BTreeMap::new();
        vars.insert("a".to_string(), "1".to_string());
        assert_eq!(substitute_host_variables("x/${host.a}/y", &vars), "x/1/y");
        assert_eq!(substitute_host_variables("${host.b}", &vars), "${host.b}");
        assert_eq!(substitute_host_variables("${env.a}", &vars), "${env.a}");
        assert!(has_unresolved_variables("${host.b}"));
        assert!(!has_unresolved_variables("plain"));
    }

    #[test]
    fn default_storage_needs_host_variable() {
        let vars = BTreeMap::new();
        assert_eq!(substitute_host_variables(DEFAULT_VIEW_STORAGE, &vars), DEFAULT_VIEW_STORAGE);
    }
}
