//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Loads the plan and resolves its settings
//! 2. Calls the engine to execute the command
//! 3. Formats and displays output
//!
//! Handlers do NOT run `cleartool` directly.

mod changes;
mod completion;
mod config_cmd;
mod label;
mod last_baseline;
mod provision;
mod sync;

// Re-export command functions for testing and direct invocation
pub use changes::changes;
pub use completion::completion;
pub use config_cmd::{check as config_check, show as config_show};
pub use label::label;
pub use last_baseline::last_baseline;
pub use provision::provision;
pub use sync::sync;

use crate::cleartool::{Cleartool, ProcessExecutor};
use crate::cli::args::{BuildResult, Command, ConfigAction};
use crate::core::config::Config;
use crate::engine::{Context, Settings};
use anyhow::{Context as _, Result};
use tracing::debug;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Sync {
            build_key,
            marker,
            json,
        } => sync::sync(ctx, &build_key, marker.as_deref(), json),
        Command::Changes {
            build_key,
            marker,
            json,
        } => changes::changes(ctx, &build_key, &marker, json),
        Command::Provision { build_key } => provision::provision(ctx, &build_key),
        Command::LastBaseline => last_baseline::last_baseline(ctx),
        Command::Label { result } => label::label(ctx, result == BuildResult::Success),
        Command::Config { action } => match action {
            ConfigAction::Check => config_cmd::check(ctx),
            ConfigAction::Show => config_cmd::show(ctx),
        },
        Command::Completion { shell } => completion::completion(shell),
    }
}

/// Load the plan named in `ctx` and build the executor it asks for.
pub(crate) fn open(ctx: &Context) -> Result<(Config, ProcessExecutor)> {
    let loaded = Config::load(&ctx.plan)
        .with_context(|| format!("Failed to load plan {}", ctx.plan.display()))?;
    let config = loaded.config;
    if let Some(path) = config.global_config_loaded_from() {
        debug!(path = %path.display(), "loaded global config");
    }

    let executor = ProcessExecutor::new(config.tool_home()).with_timeout(config.command_timeout());
    debug!(program = %executor.program().display(), "cleartool");
    Ok((config, executor))
}

/// Resolve and prepare the plan settings.
pub(crate) fn resolve(config: &Config, ct: &Cleartool<'_>) -> Result<Settings> {
    let mut settings = Settings::from_config(config).context("Invalid plan settings")?;
    settings
        .prepare(ct)
        .context("Failed to derive streams from the project")?;
    Ok(settings)
}
