//! changes command - Report what changed since the last build

use super::{open, resolve};
use crate::cleartool::Cleartool;
use crate::engine::{Context, Reconciler};
use crate::ui::output::{self, Verbosity};
use anyhow::{Context as _, Result};

/// Print the change summary and the marker to build next.
pub fn changes(ctx: &Context, build_key: &str, marker: &str, json: bool) -> Result<()> {
    let verbosity = Verbosity::from_flags(ctx.quiet, ctx.debug);
    let (config, executor) = open(ctx)?;
    let ct = Cleartool::new(&executor);
    let settings = resolve(&config, &ct)?;

    let changes = Reconciler::new(ct, &settings, build_key)
        .check_for_changes(marker)
        .context("Failed to collect changes")?;

    if json {
        output::json(&changes)?;
        return Ok(());
    }

    output::print(output::format_commits(&changes.commits), verbosity);
    output::result(&changes.marker);
    Ok(())
}
