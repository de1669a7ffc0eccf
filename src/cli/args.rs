//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--plan <file>`: Plan configuration (default `ccsync.toml`)
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::core::config::DEFAULT_PLAN_FILE;

/// ccsync - ClearCase UCM build view synchronization for CI servers
#[derive(Parser, Debug)]
#[command(name = "ccsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Plan configuration file
    #[arg(long, global = true, value_name = "FILE", default_value = DEFAULT_PLAN_FILE)]
    pub plan: PathBuf,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bring the build view up to date
    #[command(
        name = "sync",
        long_about = "Bring the build view up to date.\n\n\
            Creates the build stream and view when they are missing, then \
            either rebases onto the newest integration baseline (baseline \
            comparison) or updates the snapshot view (date comparison). \
            Prints the revision marker to record for the next build.",
        after_help = "\
EXAMPLES:
    # First build of a plan
    ccsync sync --build-key PROJ-NIGHTLY

    # Later builds pass the marker the previous build printed
    ccsync sync --build-key PROJ-NIGHTLY --marker 'baseline:Rel_1.2@\\pvob'"
    )]
    Sync {
        /// Key of the CI plan; nests the snapshot view location
        #[arg(long, value_name = "KEY")]
        build_key: String,

        /// Revision marker returned by the previous build
        #[arg(long, value_name = "MARKER")]
        marker: Option<String>,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report what changed since the last build
    #[command(
        name = "changes",
        long_about = "Report what changed since the last build.\n\n\
            Read-only. With baseline comparison this diffs the last built \
            baseline against the newest integration baseline; otherwise it \
            scans element history since the marker's timestamp."
    )]
    Changes {
        /// Key of the CI plan
        #[arg(long, value_name = "KEY")]
        build_key: String,

        /// Revision marker returned by the previous build
        #[arg(long, value_name = "MARKER")]
        marker: String,

        /// Print the change summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create the build stream and view if they are missing
    #[command(name = "provision")]
    Provision {
        /// Key of the CI plan
        #[arg(long, value_name = "KEY")]
        build_key: String,
    },

    /// Print the baseline the build stream was last rebased onto
    #[command(name = "last-baseline")]
    LastBaseline,

    /// Promote the last built baseline
    #[command(
        name = "label",
        long_about = "Promote the last built baseline.\n\n\
            Sets the promotion level of the build stream's foundation baseline \
            according to the build result. Does nothing unless the plan's \
            [labeller] table is enabled."
    )]
    Label {
        /// Outcome of the build
        #[arg(long, value_enum)]
        result: BuildResult,
    },

    /// Check or show the plan configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        long_about = "Generate shell completion scripts for tab-completion.\n\n\
            Outputs a completion script for the specified shell.",
        after_help = "\
EXAMPLES:
    # Bash
    ccsync completion bash > ~/.local/share/bash-completion/completions/ccsync

    # Zsh
    ccsync completion zsh > ~/.zfunc/_ccsync"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Validate the plan against ClearCase
    Check,
    /// Print the resolved settings
    Show,
}

/// Outcome of a build, for labelling.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildResult {
    Success,
    Failed,
}

/// Supported shells for completion
#[derive(ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
