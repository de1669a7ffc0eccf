//! engine::labeller
//!
//! Post-build promotion of the baseline that was just built.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::settings::Settings;
use super::EngineError;
use crate::cleartool::Cleartool;
use crate::core::types::Selector;

/// The first foundation baseline of `stream`.
///
/// A build stream should have exactly one; extra ones are logged and
/// ignored.
///
/// # Errors
///
/// `EngineError::NoFoundationBaselines` when the stream has none.
pub fn foundation_baseline(ct: &Cleartool<'_>, stream: &Selector) -> Result<String, EngineError> {
    let baselines = ct.foundation_baselines(stream)?;
    if baselines.len() > 1 {
        warn!(
            stream = %stream,
            baselines = ?baselines,
            "build stream has more than one foundation baseline, using the first"
        );
    }
    baselines
        .into_iter()
        .next()
        .ok_or_else(|| EngineError::NoFoundationBaselines {
            stream: stream.to_string(),
        })
}

/// What [`Labeller::label`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelOutcome {
    pub baseline: String,
    pub level: String,
    pub recommended: bool,
}

/// Promotes the last built baseline.
#[derive(Debug, Clone, Copy)]
pub struct Labeller<'a> {
    ct: Cleartool<'a>,
    settings: &'a Settings,
}

impl<'a> Labeller<'a> {
    pub fn new(ct: Cleartool<'a>, settings: &'a Settings) -> Self {
        Self { ct, settings }
    }

    /// The baseline the build stream was last rebased onto.
    pub fn last_built_baseline(&self) -> Result<String, EngineError> {
        foundation_baseline(&self.ct, self.settings.build_stream()?)
    }

    /// Set the promotion level of the last built baseline.
    ///
    /// Returns `None` when labelling is disabled. A successful build's
    /// baseline is also made the integration stream's recommended baseline
    /// when `recommend` is set.
    pub fn label(&self, success: bool) -> Result<Option<LabelOutcome>, EngineError> {
        let labeller = &self.settings.labeller;
        if !labeller.enabled {
            debug!("baseline labeller disabled");
            return Ok(None);
        }

        let baseline = self.last_built_baseline()?;
        let level = if success {
            labeller.success_level.clone()
        } else {
            labeller.failure_level.clone()
        };
        info!(baseline = %baseline, level = %level, "promoting baseline");
        self.ct.change_baseline_level(&baseline, &level)?;

        let recommended = success && labeller.recommend;
        if recommended {
            let integration = self.settings.integration_stream()?;
            info!(baseline = %baseline, stream = %integration, "recommending baseline");
            self.ct.recommend_baseline(&baseline, integration)?;
        }

        Ok(Some(LabelOutcome {
            baseline,
            level,
            recommended,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleartool::mock::MockCleartool;
    use crate::core::config::{Config, GlobalConfig, PlanConfig};

    fn settings(labeller: &str, ct: &Cleartool<'_>) -> Settings {
        let text = format!(
            "project = \"project:P@\\\\pvob\"\n\
             integration_stream = \"stream:P_int@\\\\pvob\"\n\
             main_component = \"component:Main@\\\\pvob\"\n\
             view_location = \"/views\"\n\
             [labeller]\n{labeller}"
        );
        let plan: PlanConfig = toml::from_str(&text).unwrap();
        let mut s = Settings::from_config(&Config::new(GlobalConfig::default(), plan)).unwrap();
        s.prepare(ct).unwrap();
        s
    }

    #[test]
    fn empty_foundation_is_fatal() {
        let mock = MockCleartool::new().reply("lsstream", "\n");
        let ct = Cleartool::new(&mock);
        let s = settings("enabled = true", &ct);
        let err = Labeller::new(ct, &s).last_built_baseline().unwrap_err();
        assert!(matches!(err, EngineError::NoFoundationBaselines { .. }));
    }

    #[test]
    fn first_foundation_wins() {
        let mock = MockCleartool::new().reply("lsstream", "baseline:bl2@\\pvob baseline:tools@\\pvob");
        let ct = Cleartool::new(&mock);
        let s = settings("", &ct);
        assert_eq!(Labeller::new(ct, &s).last_built_baseline().unwrap(), "baseline:bl2@\\pvob");
    }

    #[test]
    fn disabled_does_nothing() {
        let mock = MockCleartool::new();
        let ct = Cleartool::new(&mock);
        let s = settings("enabled = false", &ct);
        assert_eq!(Labeller::new(ct, &s).label(true).unwrap(), None);
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn success_promotes_and_recommends() {
        let mock = MockCleartool::new().reply("lsstream", "baseline:bl2@\\pvob\n");
        let ct = Cleartool::new(&mock);
        let s = settings("enabled = true\nrecommend = true", &ct);
        let outcome = Labeller::new(ct, &s).label(true).unwrap().unwrap();

        assert_eq!(outcome.level, "BUILT");
        assert!(outcome.recommended);
        assert_eq!(mock.subcommands(), vec!["lsstream", "chbl", "chstream"]);
        assert!(mock.command_lines()[1].contains("-level BUILT"));
    }

    #[test]
    fn failure_uses_custom_level_without_recommending() {
        let mock = MockCleartool::new().reply("lsstream", "baseline:bl2@\\pvob\n");
        let ct = Cleartool::new(&mock);
        let s = settings("enabled = true\nrecommend = true\nfailure_level = \"BROKEN\"", &ct);
        let outcome = Labeller::new(ct, &s).label(false).unwrap().unwrap();

        assert_eq!(outcome.level, "BROKEN");
        assert!(!outcome.recommended);
        assert_eq!(mock.count("chstream"), 0);
    }
}
