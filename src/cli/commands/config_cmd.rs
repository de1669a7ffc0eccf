//! config command - Validate or show the plan configuration

use super::{open, resolve};
use crate::cleartool::Cleartool;
use crate::core::config::{Config, VcsType};
use crate::engine::{Context, EngineError, Settings};
use crate::ui::output::{self, Verbosity};
use anyhow::{bail, Context as _, Result};

/// Validate the plan against ClearCase and the filesystem.
pub fn check(ctx: &Context) -> Result<()> {
    let verbosity = Verbosity::from_flags(ctx.quiet, ctx.debug);
    let (config, executor) = open(ctx)?;
    let ct = Cleartool::new(&executor);
    let settings = resolve(&config, &ct)?;

    let issues = settings.validate(&ct).context("Failed to validate plan")?;
    if issues.is_empty() {
        output::success(format!("Plan {} is valid.", ctx.plan.display()), verbosity);
        return Ok(());
    }

    for issue in &issues {
        output::error(issue);
    }
    bail!("Plan {} has {} problem(s)", ctx.plan.display(), issues.len())
}

/// Print the resolved settings without contacting ClearCase.
pub fn show(ctx: &Context) -> Result<()> {
    let config = Config::load(&ctx.plan)
        .with_context(|| format!("Failed to load plan {}", ctx.plan.display()))?
        .config;
    let settings = Settings::from_config(&config).map_err(|e| match e {
        EngineError::Validation(issues) => {
            for issue in &issues {
                output::error(issue);
            }
            anyhow::anyhow!("Plan {} has invalid selectors", ctx.plan.display())
        }
        other => other.into(),
    })?;

    for (key, value) in describe(&config, &settings) {
        output::result(format!("{key} = {value}"));
    }
    if settings.vcs == VcsType::Ucm && settings.auto_create && settings.storage_dir().is_none() {
        output::warn(
            format!("view storage '{}' is unresolved; cleartool will pick one", settings.view_storage),
            Verbosity::from_flags(ctx.quiet, ctx.debug),
        );
    }
    Ok(())
}

fn describe(config: &Config, settings: &Settings) -> Vec<(&'static str, String)> {
    let opt = |value: Option<String>| value.unwrap_or_else(|| "(unset)".to_string());
    let mut lines = vec![
        ("vcs", settings.vcs.to_string()),
        ("compare_baselines", settings.compare_baselines.to_string()),
        ("auto_create", settings.auto_create.to_string()),
        ("build_prefix", settings.build_prefix.clone()),
        ("project", opt(settings.project.as_ref().map(ToString::to_string))),
        (
            "integration_stream",
            opt(settings.integration_stream.as_ref().map(ToString::to_string)),
        ),
        ("build_stream", opt(settings.build_stream.as_ref().map(ToString::to_string))),
        ("main_component", opt(settings.main_component.as_ref().map(ToString::to_string))),
        ("view_location", opt(settings.view_location.as_ref().map(|p| p.display().to_string()))),
        ("view_storage", settings.view_storage.clone()),
        ("view_tag", opt(settings.view_tag_override.clone())),
        ("dynamic_view", settings.dynamic_view.to_string()),
        ("disable_update", settings.disable_update.to_string()),
        ("load_rules", settings.extra_load_rules.join(", ")),
        ("branch", opt(settings.branch.clone())),
        (
            "base_view_location",
            opt(settings.base_view_location.as_ref().map(|p| p.display().to_string())),
        ),
        ("vob_dir", opt(settings.vob_dir.clone())),
        ("labeller.enabled", settings.labeller.enabled.to_string()),
    ];
    if let Some(path) = config.global_config_loaded_from() {
        lines.push(("global_config", path.display().to_string()));
    }
    lines
}
