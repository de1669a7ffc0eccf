//! last-baseline command - Print the baseline the build stream was last rebased onto

use super::{open, resolve};
use crate::cleartool::Cleartool;
use crate::engine::{Context, Labeller};
use crate::ui::output;
use anyhow::{Context as _, Result};

pub fn last_baseline(ctx: &Context) -> Result<()> {
    let (config, executor) = open(ctx)?;
    let ct = Cleartool::new(&executor);
    let settings = resolve(&config, &ct)?;

    let baseline = Labeller::new(ct, &settings)
        .last_built_baseline()
        .context("Failed to determine the last built baseline")?;
    output::result(baseline);
    Ok(())
}
