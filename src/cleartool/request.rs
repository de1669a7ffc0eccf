//! cleartool::request
//!
//! Immutable descriptions of `cleartool` invocations.
//!
//! Every subcommand ccsync issues is a variant of [`Op`]. A [`CommandRequest`]
//! pairs an operation with where it runs and whether a non-zero exit is an
//! error. Requests are plain values: building one never runs anything, and
//! the same request can be executed any number of times.
//!
//! # Example
//!
//! ```
//! use ccsync::cleartool::{CommandRequest, Op};
//!
//! let request = CommandRequest::new(Op::ListView { tag: "build_view".into() });
//! assert_eq!(request.command_line(), "cleartool lsview build_view");
//! assert!(request.fail_on_error);
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

/// A `cleartool` subcommand and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// `lsstream -fmt <format> <stream>`
    ListStream { format: String, stream: String },

    /// `mkstream -in <integration> [-readonly] <stream>`
    MakeStream {
        integration: String,
        stream: String,
        readonly: bool,
    },

    /// `lsview <tag>`
    ListView { tag: String },

    /// Snapshot: `mkview -snapshot -tag <tag> -stream <stream> [-vws <storage>] <path>`.
    /// Dynamic: `mkview -tag <tag> -stream <stream> <storage>`.
    MakeView {
        tag: String,
        stream: String,
        storage: Option<String>,
        path: String,
        snapshot: bool,
    },

    /// `lsbl -fmt <format> -component <component> -stream <stream>`
    ListBaselines {
        format: String,
        component: String,
        stream: String,
    },

    /// `lsbl -fmt <format> <baseline>`
    DescribeBaseline { format: String, baseline: String },

    /// `lscomp -fmt <format> <component>`
    ListComponent { format: String, component: String },

    /// `lsproject -fmt <format> <project>`
    ListProject { format: String, project: String },

    /// `catcs -tag <tag>`
    ConfigSpec { tag: String },

    /// `update -add_loadrules -force -overwrite <path>`
    AddLoadRule { path: String },

    /// `update <path>`
    Update { path: String },

    /// `rebase -baseline <baseline> -stream <stream> -complete -force -view <view>`
    Rebase {
        baseline: String,
        stream: String,
        view: String,
    },

    /// `diffbl -act [-ver] <first> <second>`
    DiffBaselines {
        first: String,
        second: String,
        versions: bool,
    },

    /// `describe -fmt <format> <selector>`
    Describe { format: String, selector: String },

    /// `lshistory -fmt <format> -nco -since <since> [-branch <branch>] -r`
    History {
        format: String,
        since: String,
        branch: Option<String>,
    },

    /// `chbl -level <level> <baseline>`
    ChangeBaselineLevel { level: String, baseline: String },

    /// `chstream -recommended <baseline> <stream>`
    Recommend { baseline: String, stream: String },
}

impl Op {
    /// The subcommand name.
    pub fn subcommand(&self) -> &'static str {
        match self {
            Op::ListStream { .. } => "lsstream",
            Op::MakeStream { .. } => "mkstream",
            Op::ListView { .. } => "lsview",
            Op::MakeView { .. } => "mkview",
            Op::ListBaselines { .. } | Op::DescribeBaseline { .. } => "lsbl",
            Op::ListComponent { .. } => "lscomp",
            Op::ListProject { .. } => "lsproject",
            Op::ConfigSpec { .. } => "catcs",
            Op::AddLoadRule { .. } | Op::Update { .. } => "update",
            Op::Rebase { .. } => "rebase",
            Op::DiffBaselines { .. } => "diffbl",
            Op::Describe { .. } => "describe",
            Op::History { .. } => "lshistory",
            Op::ChangeBaselineLevel { .. } => "chbl",
            Op::Recommend { .. } => "chstream",
        }
    }

    /// Arguments after the subcommand, in order.
    pub fn args(&self) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();
        let mut push = |items: &[&str]| args.extend(items.iter().map(|s| s.to_string()));

        match self {
            Op::ListStream { format, stream } => push(&["-fmt", format, stream]),
            Op::MakeStream {
                integration,
                stream,
                readonly,
            } => {
                push(&["-in", integration]);
                if *readonly {
                    push(&["-readonly"]);
                }
                push(&[stream]);
            }
            Op::ListView { tag } => push(&[tag]),
            Op::MakeView {
                tag,
                stream,
                storage,
                path,
                snapshot,
            } => {
                if *snapshot {
                    push(&["-snapshot"]);
                }
                push(&["-tag", tag, "-stream", stream]);
                match (*snapshot, storage.as_deref().filter(|s| !s.trim().is_empty())) {
                    (true, Some(vws)) => push(&["-vws", vws, path]),
                    (true, None) => push(&[path]),
                    (false, Some(vws)) => push(&[vws]),
                    (false, None) => push(&[path]),
                }
            }
            Op::ListBaselines {
                format,
                component,
                stream,
            } => push(&["-fmt", format, "-component", component, "-stream", stream]),
            Op::DescribeBaseline { format, baseline } => push(&["-fmt", format, baseline]),
            Op::ListComponent { format, component } => push(&["-fmt", format, component]),
            Op::ListProject { format, project } => push(&["-fmt", format, project]),
            Op::ConfigSpec { tag } => push(&["-tag", tag]),
            Op::AddLoadRule { path } => push(&["-add_loadrules", "-force", "-overwrite", path]),
            Op::Update { path } => push(&[path]),
            Op::Rebase {
                baseline,
                stream,
                view,
            } => push(&[
                "-baseline", baseline, "-stream", stream, "-complete", "-force", "-view", view,
            ]),
            Op::DiffBaselines {
                first,
                second,
                versions,
            } => {
                push(&["-act"]);
                if *versions {
                    push(&["-ver"]);
                }
                push(&[first, second]);
            }
            Op::Describe { format, selector } => push(&["-fmt", format, selector]),
            Op::History {
                format,
                since,
                branch,
            } => {
                push(&["-fmt", format, "-nco", "-since", since]);
                if let Some(branch) = branch.as_deref().filter(|b| !b.trim().is_empty()) {
                    push(&["-branch", branch]);
                }
                push(&["-r"]);
            }
            Op::ChangeBaselineLevel { level, baseline } => push(&["-level", level, baseline]),
            Op::Recommend { baseline, stream } => push(&["-recommended", baseline, stream]),
        }

        args
    }
}

/// A single `cleartool` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub op: Op,
    /// Used only if it exists on disk.
    pub working_dir: Option<PathBuf>,
    /// Treat a non-zero exit as an error.
    pub fail_on_error: bool,
}

impl CommandRequest {
    pub fn new(op: Op) -> Self {
        Self {
            op,
            working_dir: None,
            fail_on_error: true,
        }
    }

    /// Run in `dir` (when it exists).
    pub fn in_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Return normally on a non-zero exit; the caller inspects the output.
    pub fn allow_failure(mut self) -> Self {
        self.fail_on_error = false;
        self
    }

    pub fn subcommand(&self) -> &'static str {
        self.op.subcommand()
    }

    pub fn args(&self) -> Vec<String> {
        self.op.args()
    }

    /// The command as it would be typed, for logs and error messages.
    pub fn command_line(&self) -> String {
        let mut line = format!("cleartool {}", self.subcommand());
        for arg in self.args() {
            line.push(' ');
            if arg.is_empty() || arg.chars().any(char::is_whitespace) {
                line.push('"');
                line.push_str(&arg);
                line.push('"');
            } else {
                line.push_str(&arg);
            }
        }
        line
    }
}

impl fmt::Display for CommandRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(op: Op) -> String {
        CommandRequest::new(op).command_line()
    }

    #[test]
    fn defaults() {
        let request = CommandRequest::new(Op::Update { path: "/v".into() });
        assert!(request.fail_on_error);
        assert!(request.working_dir.is_none());
        let request = request.allow_failure().in_dir("/tmp");
        assert!(!request.fail_on_error);
        assert_eq!(request.working_dir, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn mkstream_readonly_flag() {
        assert_eq!(
            line(Op::MakeStream {
                integration: "stream:int@\\pvob".into(),
                stream: "stream:b@\\pvob".into(),
                readonly: true,
            }),
            "cleartool mkstream -in stream:int@\\pvob -readonly stream:b@\\pvob"
        );
        assert_eq!(
            line(Op::MakeStream {
                integration: "i".into(),
                stream: "s".into(),
                readonly: false,
            }),
            "cleartool mkstream -in i s"
        );
    }

    #[test]
    fn mkview_snapshot_and_dynamic() {
        let snapshot = Op::MakeView {
            tag: "t".into(),
            stream: "s".into(),
            storage: Some("/vws/s.vws".into()),
            path: "/views/K/s".into(),
            snapshot: true,
        };
        assert_eq!(
            line(snapshot),
            "cleartool mkview -snapshot -tag t -stream s -vws /vws/s.vws /views/K/s"
        );

        let dynamic = Op::MakeView {
            tag: "t".into(),
            stream: "s".into(),
            storage: Some("/vws/s.vws".into()),
            path: "/views".into(),
            snapshot: false,
        };
        assert_eq!(line(dynamic), "cleartool mkview -tag t -stream s /vws/s.vws");
    }

    #[test]
    fn history_branch_optional() {
        let with = Op::History {
            format: "%u".into(),
            since: "01-Jan-24.00:00:00".into(),
            branch: Some("main".into()),
        };
        assert_eq!(with.args(), vec!["-fmt", "%u", "-nco", "-since", "01-Jan-24.00:00:00", "-branch", "main", "-r"]);
        let without = Op::History {
            format: "%u".into(),
            since: "x".into(),
            branch: Some(" ".into()),
        };
        assert!(!without.args().contains(&"-branch".to_string()));
    }

    #[test]
    fn quoting_in_command_line() {
        let op = Op::ListBaselines {
            format: "%d,%Xn\\n".into(),
            component: "component:Main@\\pvob".into(),
            stream: "stream:My Int@\\pvob".into(),
        };
        assert_eq!(
            line(op),
            "cleartool lsbl -fmt %d,%Xn\\n -component component:Main@\\pvob -stream \"stream:My Int@\\pvob\""
        );
    }

    #[test]
    fn subcommands_shared_by_update() {
        assert_eq!(Op::AddLoadRule { path: "p".into() }.subcommand(), "update");
        assert_eq!(Op::Update { path: "p".into() }.subcommand(), "update");
    }

    #[test]
    fn rebase_line() {
        insta::assert_snapshot!(
            line(Op::Rebase {
                baseline: "baseline:bl2@\\pvob".into(),
                stream: "stream:build_ro_P@\\pvob".into(),
                view: "build_ro_P".into(),
            }),
            @r"cleartool rebase -baseline baseline:bl2@\pvob -stream stream:build_ro_P@\pvob -complete -force -view build_ro_P"
        );
    }

    #[test]
    fn diffbl_line() {
        insta::assert_snapshot!(
            line(Op::DiffBaselines {
                first: "baseline:new@\\pvob".into(),
                second: "baseline:old@\\pvob".into(),
                versions: true,
            }),
            @r"cleartool diffbl -act -ver baseline:new@\pvob baseline:old@\pvob"
        );
    }
}
