//! engine::settings
//!
//! Plan settings resolved into domain types.
//!
//! [`Settings::from_config`] parses every selector up front so that a typo
//! is reported before any command runs. [`Settings::prepare`] fills in the
//! values that can be derived from the VOB (integration stream, build
//! stream) and [`Settings::validate`] checks the result against it.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::EngineError;
use crate::cleartool::Cleartool;
use crate::core::config::{Config, VcsType};
use crate::core::paths::{
    base_source_dir, has_unresolved_variables, substitute_host_variables, view_storage_path, ViewPaths,
};
use crate::core::types::{Selector, SelectorKind};

/// One problem found while validating settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// The plan field the problem is about.
    pub field: &'static str,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Post-build labelling, resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabellerSettings {
    pub enabled: bool,
    pub recommend: bool,
    pub success_level: String,
    pub failure_level: String,
}

/// Resolved plan settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub vcs: VcsType,
    pub compare_baselines: bool,
    pub auto_create: bool,
    pub build_prefix: String,
    pub project: Option<Selector>,
    pub integration_stream: Option<Selector>,
    pub build_stream: Option<Selector>,
    pub main_component: Option<Selector>,
    pub view_location: Option<PathBuf>,
    /// Storage directory with host variables substituted.
    pub view_storage: String,
    pub view_tag_override: Option<String>,
    pub extra_load_rules: Vec<String>,
    pub dynamic_view: bool,
    pub drive_letter: Option<String>,
    pub disable_update: bool,
    pub branch: Option<String>,
    pub base_view_location: Option<PathBuf>,
    pub vob_dir: Option<String>,
    pub labeller: LabellerSettings,
}

impl Settings {
    /// Resolve settings from a loaded config.
    ///
    /// # Errors
    ///
    /// `EngineError::Validation` listing every selector that failed to parse.
    pub fn from_config(config: &Config) -> Result<Self, EngineError> {
        let plan = &config.plan;
        let mut issues = Vec::new();

        let mut selector = |field: &'static str, kind: SelectorKind, value: &Option<String>| {
            let text = non_blank(value)?;
            match Selector::typed(kind, text) {
                Ok(selector) => Some(selector),
                Err(e) => {
                    issues.push(ValidationIssue::new(field, e.to_string()));
                    None
                }
            }
        };

        let project = selector("project", SelectorKind::Project, &plan.project);
        let integration_stream = selector("integration_stream", SelectorKind::Stream, &plan.integration_stream);
        let build_stream = selector("build_stream", SelectorKind::Stream, &plan.build_stream);
        let main_component = selector("main_component", SelectorKind::Component, &plan.main_component);

        if !issues.is_empty() {
            return Err(EngineError::Validation(issues));
        }

        Ok(Self {
            vcs: config.vcs(),
            compare_baselines: config.compare_baselines(),
            auto_create: config.auto_create(),
            build_prefix: config.build_prefix().to_string(),
            project,
            integration_stream,
            build_stream,
            main_component,
            view_location: plan.view_location.clone(),
            view_storage: substitute_host_variables(config.view_storage(), &config.global.variables),
            view_tag_override: non_blank(&plan.view_tag).map(str::to_string),
            extra_load_rules: config.extra_load_rules(),
            dynamic_view: config.dynamic_view(),
            drive_letter: non_blank(&plan.drive_letter).map(str::to_string),
            disable_update: config.disable_update(),
            branch: non_blank(&plan.branch).map(str::to_string),
            base_view_location: plan.base_view_location.clone(),
            vob_dir: non_blank(&plan.vob_dir).map(str::to_string),
            labeller: LabellerSettings {
                enabled: config.labeller_enabled(),
                recommend: config.labeller_recommend(),
                success_level: config.success_level().to_string(),
                failure_level: config.failure_level().to_string(),
            },
        })
    }

    /// Derive the integration and build streams from the project.
    ///
    /// The integration stream is asked of `lsproject` when not configured.
    /// With auto-create on and a build prefix set, the build stream is
    /// `stream:<prefix><project name>` in the project's VOB.
    pub fn prepare(&mut self, ct: &Cleartool<'_>) -> Result<(), EngineError> {
        if self.vcs != VcsType::Ucm {
            return Ok(());
        }
        let Some(project) = self.project.clone() else {
            return Ok(());
        };

        if self.integration_stream.is_none() {
            let derived = ct.project_integration_stream(&project)?;
            if !derived.is_empty() {
                debug!(project = %project, stream = %derived, "derived integration stream");
                self.integration_stream = Some(Selector::typed(SelectorKind::Stream, &derived)?);
            }
        }

        if self.auto_create && !self.build_prefix.trim().is_empty() {
            let name = format!("{}{}", self.build_prefix.trim(), project.name());
            let stream = project.sibling(SelectorKind::Stream, name);
            debug!(stream = %stream, "derived build stream");
            self.build_stream = Some(stream);
        }

        Ok(())
    }

    /// Check the settings against the VOB and filesystem.
    ///
    /// Returns every problem found; an empty list means the plan is usable.
    /// Command failures other than "not found" are returned as errors.
    pub fn validate(&self, ct: &Cleartool<'_>) -> Result<Vec<ValidationIssue>, EngineError> {
        match self.vcs {
            VcsType::Ucm => self.validate_ucm(ct),
            VcsType::Base => Ok(self.validate_base()),
        }
    }

    /// [`Settings::validate`], turning any problem into an error.
    pub fn ensure_valid(&self, ct: &Cleartool<'_>) -> Result<(), EngineError> {
        let issues = self.validate(ct)?;
        if issues.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Validation(issues))
        }
    }

    fn validate_ucm(&self, ct: &Cleartool<'_>) -> Result<Vec<ValidationIssue>, EngineError> {
        let mut issues = Vec::new();

        if self.project.is_none() {
            issues.push(ValidationIssue::new("project", "a project selector is required"));
        }
        if self.main_component.is_none() {
            issues.push(ValidationIssue::new("main_component", "a main component selector is required"));
        }
        if self.view_location.is_none() {
            issues.push(ValidationIssue::new("view_location", "a view location is required"));
        }

        match &self.integration_stream {
            None => issues.push(ValidationIssue::new(
                "integration_stream",
                "no integration stream configured and none could be derived from the project",
            )),
            Some(stream) => {
                if !ct.stream_exists(stream)? {
                    issues.push(ValidationIssue::new(
                        "integration_stream",
                        format!("integration stream {} does not exist", stream),
                    ));
                }
            }
        }

        if self.auto_create {
            if self.build_prefix.trim().is_empty() {
                issues.push(ValidationIssue::new(
                    "build_prefix",
                    "a build prefix is required to create build streams",
                ));
            }
            if self.storage_dir().is_none() {
                issues.push(ValidationIssue::new(
                    "view_storage",
                    format!("view storage '{}' could not be resolved", self.view_storage),
                ));
            }
        } else {
            match &self.build_stream {
                None => issues.push(ValidationIssue::new(
                    "build_stream",
                    "a build stream is required when auto_create is off",
                )),
                Some(stream) => {
                    if !ct.stream_exists(stream)? {
                        issues.push(ValidationIssue::new(
                            "build_stream",
                            format!("build stream {} does not exist", stream),
                        ));
                    }
                }
            }
        }

        Ok(issues)
    }

    fn validate_base(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        match &self.base_view_location {
            None => issues.push(ValidationIssue::new("base_view_location", "a view location is required")),
            Some(dir) if !dir.is_dir() => issues.push(ValidationIssue::new(
                "base_view_location",
                format!("{} does not exist", dir.display()),
            )),
            Some(dir) => match &self.vob_dir {
                None => issues.push(ValidationIssue::new("vob_dir", "a VOB directory is required")),
                Some(vob) => {
                    let path = base_source_dir(dir, vob);
                    if !path.is_dir() {
                        issues.push(ValidationIssue::new(
                            "vob_dir",
                            format!("{} does not exist", path.display()),
                        ));
                    }
                }
            },
        }

        if self.branch.is_none() {
            issues.push(ValidationIssue::new("branch", "a branch is required"));
        }

        issues
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn build_stream(&self) -> Result<&Selector, EngineError> {
        self.build_stream.as_ref().ok_or(EngineError::MissingSetting("build_stream"))
    }

    pub fn integration_stream(&self) -> Result<&Selector, EngineError> {
        self.integration_stream
            .as_ref()
            .ok_or(EngineError::MissingSetting("integration_stream"))
    }

    pub fn main_component(&self) -> Result<&Selector, EngineError> {
        self.main_component
            .as_ref()
            .ok_or(EngineError::MissingSetting("main_component"))
    }

    /// The view tag in use: the override, else the build stream's name.
    pub fn view_tag(&self) -> Result<String, EngineError> {
        match &self.view_tag_override {
            Some(tag) => Ok(tag.clone()),
            None => Ok(self.build_stream()?.name().to_string()),
        }
    }

    pub fn view_paths(&self) -> Result<ViewPaths, EngineError> {
        let location = self
            .view_location
            .as_ref()
            .ok_or(EngineError::MissingSetting("view_location"))?;
        Ok(ViewPaths::new(location, self.dynamic_view, self.auto_create))
    }

    /// Where the build view for `build_key` lives.
    pub fn view_path(&self, build_key: &str) -> Result<PathBuf, EngineError> {
        let stream = self.build_stream()?;
        Ok(self.view_paths()?.view_path(build_key, stream.name()))
    }

    /// The directory builds read from.
    pub fn source_dir(&self, build_key: &str) -> Result<PathBuf, EngineError> {
        match self.vcs {
            VcsType::Base => self.base_source_dir(),
            VcsType::Ucm => {
                let stream = self.build_stream()?;
                Ok(self
                    .view_paths()?
                    .source_dir(build_key, stream.name(), self.drive_letter.as_deref()))
            }
        }
    }

    pub fn base_source_dir(&self) -> Result<PathBuf, EngineError> {
        let location = self
            .base_view_location
            .as_deref()
            .ok_or(EngineError::MissingSetting("base_view_location"))?;
        Ok(match &self.vob_dir {
            Some(vob) => base_source_dir(location, vob),
            None => location.to_path_buf(),
        })
    }

    /// The storage directory, if it resolved to something usable.
    pub fn storage_dir(&self) -> Option<&str> {
        let dir = self.view_storage.trim();
        (!dir.is_empty() && !has_unresolved_variables(dir)).then_some(dir)
    }

    /// `<storage>/<build stream>.vws`, if storage resolved.
    pub fn view_storage_path(&self) -> Result<Option<PathBuf>, EngineError> {
        let stream = self.build_stream()?;
        Ok(self.storage_dir().map(|dir| view_storage_path(dir, stream.name())))
    }

    /// `@<sep><pvob>` of the project, appended to bare activity ids.
    pub fn container_suffix(&self) -> String {
        self.project
            .as_ref()
            .map(Selector::container_suffix)
            .unwrap_or_default()
    }

    /// History scans happen on this branch, if any.
    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    pub fn vob_dir(&self) -> Option<&Path> {
        self.vob_dir.as_deref().map(Path::new)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleartool::mock::MockCleartool;
    use crate::core::config::{GlobalConfig, PlanConfig};
    use tempfile::TempDir;

    fn settings(toml_text: &str) -> Result<Settings, EngineError> {
        let plan: PlanConfig = toml::from_str(toml_text).unwrap();
        Settings::from_config(&Config::new(GlobalConfig::default(), plan))
    }

    const UCM: &str = r#"
        project = "project:Proj@\\pvob"
        main_component = "component:Main@\\pvob"
        view_location = "/views"
        view_storage = "/vws"
    "#;

    #[test]
    fn bad_selectors_are_all_reported() {
        let err = settings(
            r#"
            project = "stream:Proj@\\pvob"
            main_component = "baseline:Main@\\pvob"
            "#,
        )
        .unwrap_err();
        match err {
            EngineError::Validation(issues) => {
                let fields: Vec<_> = issues.iter().map(|i| i.field).collect();
                assert_eq!(fields, vec!["project", "main_component"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn storage_substitutes_host_variables() {
        let plan: PlanConfig = toml::from_str(r#"view_storage = "${host.view.storage}/ci""#).unwrap();
        let mut global = GlobalConfig::default();
        global.variables.insert("view.storage".into(), "/srv/vws".into());
        let s = Settings::from_config(&Config::new(global, plan)).unwrap();
        assert_eq!(s.view_storage, "/srv/vws/ci");
        assert_eq!(s.storage_dir(), Some("/srv/vws/ci"));
    }

    #[test]
    fn unresolved_storage_is_unusable() {
        let s = settings("").unwrap();
        assert_eq!(s.view_storage, "${host.view.storage}");
        assert_eq!(s.storage_dir(), None);
    }

    #[test]
    fn prepare_derives_streams() {
        let mut s = settings(UCM).unwrap();
        let mock = MockCleartool::new().reply("lsproject", "stream:Proj_int@\\pvob\n");
        s.prepare(&Cleartool::new(&mock)).unwrap();

        assert_eq!(s.integration_stream().unwrap().name(), "Proj_int");
        let build = s.build_stream().unwrap();
        assert_eq!(build.name(), "build_ro_Proj");
        assert_eq!(build.kind(), Some(SelectorKind::Stream));
        assert_eq!(build.container(), Some("pvob"));
        assert_eq!(s.view_tag().unwrap(), "build_ro_Proj");
    }

    #[test]
    fn prepare_keeps_configured_integration_stream() {
        let mut s = settings(&format!("{UCM}\nintegration_stream = \"stream:Int@\\\\pvob\"")).unwrap();
        let mock = MockCleartool::new();
        s.prepare(&Cleartool::new(&mock)).unwrap();
        assert_eq!(mock.count("lsproject"), 0);
        assert_eq!(s.integration_stream().unwrap().name(), "Int");
    }

    #[test]
    fn view_tag_override_wins() {
        let mut s = settings(&format!("{UCM}\nview_tag = \"ci_view\"")).unwrap();
        s.prepare(&Cleartool::new(&MockCleartool::new())).unwrap();
        assert_eq!(s.view_tag().unwrap(), "ci_view");
    }

    #[test]
    fn view_path_nests_build_key() {
        let mut s = settings(UCM).unwrap();
        s.prepare(&Cleartool::new(&MockCleartool::new())).unwrap();
        assert_eq!(
            s.view_path("PLAN-JOB").unwrap(),
            Path::new("/views").join("PLAN-JOB").join("build_ro_Proj")
        );
        assert_eq!(
            s.view_storage_path().unwrap(),
            Some(Path::new("/vws").join("build_ro_Proj.vws"))
        );
    }

    #[test]
    fn validate_ucm_reports_missing_streams() {
        let mut s = settings(&format!("{UCM}\nintegration_stream = \"stream:Int@\\\\pvob\"")).unwrap();
        let mock = MockCleartool::new().fail("lsstream", "cleartool: Error: Stream not found: \"Int\".");
        let ct = Cleartool::new(&mock);
        s.prepare(&ct).unwrap();

        let issues = s.validate(&ct).unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "integration_stream");
        assert!(matches!(s.ensure_valid(&ct), Err(EngineError::Validation(_))));
    }

    #[test]
    fn validate_ucm_without_auto_create_needs_build_stream() {
        let s = settings(&format!(
            "{UCM}\nauto_create = false\nintegration_stream = \"stream:Int@\\\\pvob\""
        ))
        .unwrap();
        let mock = MockCleartool::new();
        let issues = s.validate(&Cleartool::new(&mock)).unwrap();
        assert_eq!(issues, vec![ValidationIssue::new(
            "build_stream",
            "a build stream is required when auto_create is off"
        )]);
    }

    #[test]
    fn validate_propagates_hard_failures() {
        let s = settings(&format!("{UCM}\nintegration_stream = \"stream:Int@\\\\pvob\"")).unwrap();
        let mock = MockCleartool::new().fail("lsstream", "cleartool: Error: Unable to contact albd_server");
        assert!(matches!(
            s.validate(&Cleartool::new(&mock)),
            Err(EngineError::Cleartool(_))
        ));
    }

    #[test]
    fn validate_base() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("vob")).unwrap();
        let s = settings(&format!(
            "vcs = \"base\"\nbase_view_location = {:?}\nvob_dir = \"vob\"",
            dir.path().display().to_string()
        ))
        .unwrap();
        let issues = s.validate(&Cleartool::new(&MockCleartool::new())).unwrap();
        assert_eq!(issues, vec![ValidationIssue::new("branch", "a branch is required")]);
        assert_eq!(s.source_dir("K").unwrap(), dir.path().join("vob"));
    }
}
