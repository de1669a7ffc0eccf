//! sync command - Bring the build view up to date

use super::{open, resolve};
use crate::cleartool::Cleartool;
use crate::engine::{Context, Reconciler};
use crate::ui::output::{self, Verbosity};
use anyhow::{Context as _, Result};

/// Run `retrieve_source_code` and print the new revision marker.
pub fn sync(ctx: &Context, build_key: &str, marker: Option<&str>, json: bool) -> Result<()> {
    let verbosity = Verbosity::from_flags(ctx.quiet, ctx.debug);
    let (config, executor) = open(ctx)?;
    let ct = Cleartool::new(&executor);
    let settings = resolve(&config, &ct)?;

    let outcome = Reconciler::new(ct, &settings, build_key)
        .retrieve_source_code(marker)
        .context("Failed to retrieve source code")?;

    if json {
        output::json(&outcome)?;
        return Ok(());
    }

    if outcome.changed {
        output::print(format!("Source directory: {}", outcome.source_dir.display()), verbosity);
    } else {
        output::print("Integration baseline unchanged.", verbosity);
    }
    if !outcome.load_rules_added.is_empty() {
        output::print(
            format!("Added load rules:\n{}", output::format_list(&outcome.load_rules_added, "  ")),
            verbosity,
        );
    }
    if !outcome.commits.is_empty() {
        output::print(output::format_commits(&outcome.commits), verbosity);
    }
    output::result(&outcome.marker);
    Ok(())
}
