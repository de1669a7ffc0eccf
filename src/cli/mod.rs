//! cli
//!
//! Command-line interface layer for ccsync.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Delegate to command handlers
//! - Does NOT run `cleartool` directly
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to the
//! [`crate::engine`] for execution. Every ClearCase command flows through
//! [`crate::cleartool::Cleartool`].

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use crate::engine;
use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "CCSYNC_LOG";

/// Run the CLI application.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.debug, cli.quiet);
    run_with(cli)
}

/// Install the stderr log subscriber.
///
/// `CCSYNC_LOG` wins over the flags when it holds a valid filter.
pub fn init_tracing(debug: bool, quiet: bool) {
    let default = if quiet {
        "warn"
    } else if debug {
        "debug"
    } else {
        "info"
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Run an already-parsed command line.
pub fn run_with(cli: Cli) -> Result<()> {
    let ctx = engine::Context {
        plan: cli.plan.clone(),
        debug: cli.debug,
        quiet: cli.quiet,
    };

    commands::dispatch(cli.command, &ctx)
}
