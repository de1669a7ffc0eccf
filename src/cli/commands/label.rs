//! label command - Promote the last built baseline

use super::{open, resolve};
use crate::cleartool::Cleartool;
use crate::engine::{Context, Labeller};
use crate::ui::output::{self, Verbosity};
use anyhow::{Context as _, Result};

pub fn label(ctx: &Context, success: bool) -> Result<()> {
    let verbosity = Verbosity::from_flags(ctx.quiet, ctx.debug);
    let (config, executor) = open(ctx)?;
    let ct = Cleartool::new(&executor);
    let settings = resolve(&config, &ct)?;

    let outcome = Labeller::new(ct, &settings)
        .label(success)
        .context("Failed to label the built baseline")?;

    match outcome {
        None => output::print("Baseline labeller is disabled for this plan.", verbosity),
        Some(outcome) => {
            output::success(
                format!("Promoted {} to {}", outcome.baseline, outcome.level),
                verbosity,
            );
            if outcome.recommended {
                output::success(format!("Recommended {}", outcome.baseline), verbosity);
            }
        }
    }
    Ok(())
}
