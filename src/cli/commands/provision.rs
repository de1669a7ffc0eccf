//! provision command - Create the build stream and view if missing

use super::{open, resolve};
use crate::cleartool::Cleartool;
use crate::engine::{Context, Reconciler};
use crate::ui::output::{self, Verbosity};
use anyhow::{Context as _, Result};

pub fn provision(ctx: &Context, build_key: &str) -> Result<()> {
    let verbosity = Verbosity::from_flags(ctx.quiet, ctx.debug);
    let (config, executor) = open(ctx)?;
    let ct = Cleartool::new(&executor);
    let settings = resolve(&config, &ct)?;

    let outcome = Reconciler::new(ct, &settings, build_key)
        .provision()
        .context("Failed to provision the build stream and view")?;

    match (outcome.stream_created, outcome.view_created) {
        (false, false) => output::print("Build stream and view already exist.", verbosity),
        (true, true) => output::success("Created build stream and view.", verbosity),
        (true, false) => output::success("Created build stream.", verbosity),
        (false, true) => output::success("Created build view.", verbosity),
    }
    output::print(
        format!("View: {}", settings.view_path(build_key)?.display()),
        verbosity,
    );
    Ok(())
}
