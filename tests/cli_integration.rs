//! Integration tests for the ccsync binary.
//!
//! Every test runs with an isolated global config so settings on the
//! machine running the tests cannot leak in.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// =============================================================================
// Fixtures
// =============================================================================

/// A scratch directory holding a plan and a global config.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn write(&self, name: &str, body: &str) -> PathBuf {
        let path = self.path().join(name);
        fs::write(&path, body).unwrap();
        path
    }

    fn plan(&self, body: &str) -> PathBuf {
        self.write("ccsync.toml", body)
    }

    fn global(&self, body: &str) {
        self.write("global.toml", body);
    }

    /// `ccsync` with the global config pointed into the workspace.
    fn ccsync(&self) -> Command {
        let mut cmd = Command::cargo_bin("ccsync").unwrap();
        cmd.current_dir(self.path())
            .env("CCSYNC_CONFIG", self.path().join("global.toml"))
            .env("XDG_CONFIG_HOME", self.path().join("xdg"))
            .env("HOME", self.path())
            .env_remove("CCSYNC_LOG");
        cmd
    }
}

fn base_plan(root: &Path, extra: &str) -> String {
    format!("vcs = 'base'\nbase_view_location = '{}'\n{extra}\n", root.display())
}

// =============================================================================
// Surface
// =============================================================================

#[test]
fn help_lists_commands() {
    Workspace::new()
        .ccsync()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sync"))
        .stdout(predicate::str::contains("last-baseline"))
        .stdout(predicate::str::contains("--plan"));
}

#[test]
fn version_flag_works() {
    Workspace::new()
        .ccsync()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ccsync"));
}

#[test]
fn bash_completion_is_generated() {
    Workspace::new()
        .ccsync()
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ccsync"));
}

#[test]
fn changes_requires_marker() {
    Workspace::new()
        .ccsync()
        .args(["changes", "--build-key", "K"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--marker"));
}

#[test]
fn missing_plan_fails() {
    let ws = Workspace::new();
    ws.ccsync()
        .args(["--plan", "absent.toml", "last-baseline"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load plan"));
}

#[test]
fn unknown_plan_key_fails() {
    let ws = Workspace::new();
    ws.plan("projekt = 'project:P@\\pvob'\n");
    ws.ccsync()
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("projekt"));
}

// =============================================================================
// config
// =============================================================================

#[test]
fn config_show_substitutes_host_variables() {
    let ws = Workspace::new();
    ws.global("[variables]\n\"view.storage\" = '/srv/views'\n");
    ws.plan(
        r#"
project = 'project:P@\pvob'
main_component = 'component:Main@\pvob'
view_location = '/builds'
"#,
    );

    ws.ccsync()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("vcs = ucm"))
        .stdout(predicate::str::contains("view_storage = /srv/views"))
        .stdout(predicate::str::contains("build_prefix = build_ro_"))
        .stdout(predicate::str::contains("global_config = "));
}

#[test]
fn config_check_reports_every_base_problem() {
    let ws = Workspace::new();
    ws.plan(&base_plan(&ws.path().join("missing"), ""));

    ws.ccsync()
        .args(["config", "check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("base_view_location:"))
        .stderr(predicate::str::contains("branch: a branch is required"))
        .stderr(predicate::str::contains("2 problem(s)"));
}

#[test]
fn config_check_accepts_complete_base_plan() {
    let ws = Workspace::new();
    fs::create_dir_all(ws.path().join("view").join("vob")).unwrap();
    ws.plan(&base_plan(&ws.path().join("view"), "vob_dir = 'vob'\nbranch = 'main'"));

    ws.ccsync()
        .args(["config", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"));
}

// =============================================================================
// sync
// =============================================================================

#[cfg(unix)]
#[test]
fn base_sync_without_update_prints_timestamp_marker() {
    let ws = Workspace::new();
    fake_cleartool(&ws, r#"[ "$1" = lshistory ] || exit 1"#);
    fs::create_dir_all(ws.path().join("view").join("vob")).unwrap();
    ws.plan(&base_plan(
        &ws.path().join("view"),
        "vob_dir = 'vob'\nbranch = 'main'\ndisable_update = true",
    ));

    ws.ccsync()
        .args(["-q", "sync", "--build-key", "K"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^[0-9]{8}\.[0-9]{6}\n$").unwrap());
}

#[cfg(unix)]
#[test]
fn base_sync_json_reports_source_dir() {
    let ws = Workspace::new();
    fake_cleartool(&ws, r#"[ "$1" = lshistory ] || exit 1"#);
    fs::create_dir_all(ws.path().join("view").join("vob")).unwrap();
    ws.plan(&base_plan(
        &ws.path().join("view"),
        "vob_dir = 'vob'\nbranch = 'main'\ndynamic_view = true",
    ));

    ws.ccsync()
        .args(["sync", "--build-key", "K", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"marker\""))
        .stdout(predicate::str::contains("\"changed\": true"))
        .stdout(predicate::str::contains("vob"));
}

// =============================================================================
// Real process execution
// =============================================================================

#[cfg(unix)]
fn fake_cleartool(ws: &Workspace, script: &str) {
    use std::os::unix::fs::PermissionsExt;

    let bin = ws.path().join("bin");
    fs::create_dir_all(&bin).unwrap();
    let path = bin.join("cleartool");
    fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    ws.global(&format!("tool_home = '{}'\n", bin.display()));
}

#[cfg(unix)]
#[test]
fn base_sync_rejects_unparsable_marker() {
    let ws = Workspace::new();
    fake_cleartool(&ws, "exit 1");
    fs::create_dir_all(ws.path().join("view").join("vob")).unwrap();
    ws.plan(&base_plan(
        &ws.path().join("view"),
        "vob_dir = 'vob'\nbranch = 'main'",
    ));

    ws.ccsync()
        .args(["sync", "--build-key", "K", "--marker", "last tuesday"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("last tuesday"));
}

#[cfg(unix)]
const UCM_PLAN: &str = r#"
project = 'project:P@\pvob'
integration_stream = 'stream:P_int@\pvob'
main_component = 'component:Main@\pvob'
view_location = '/builds'
"#;

#[cfg(unix)]
#[test]
fn last_baseline_runs_cleartool() {
    let ws = Workspace::new();
    fake_cleartool(
        &ws,
        r#"case "$1" in
  lsstream) echo 'baseline:bl2@\pvob' ;;
  *) exit 1 ;;
esac"#,
    );
    ws.plan(UCM_PLAN);

    ws.ccsync()
        .arg("last-baseline")
        .assert()
        .success()
        .stdout("baseline:bl2@\\pvob\n");
}

#[cfg(unix)]
#[test]
fn cleartool_failure_is_reported() {
    let ws = Workspace::new();
    fake_cleartool(
        &ws,
        r#"echo 'cleartool: Error: Unable to contact albd_server.' >&2
exit 1"#,
    );
    ws.plan(UCM_PLAN);

    ws.ccsync()
        .arg("last-baseline")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to determine the last built baseline"))
        .stderr(predicate::str::contains("albd_server"));
}
