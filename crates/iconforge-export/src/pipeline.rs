//! Build orchestration
//!
//! `Pending -> Exported -> {Validated | Failed}`, with cleanup as an
//! optional step after either terminal state. Missing settings or
//! template components abort before anything is written; failures
//! after that point are reported rather than returned.

use std::fs;
use std::path::{Path, PathBuf};

use iconforge_core::{ComponentKind, ToolRunner};
use iconforge_scene::{
    component_root, require_icon_template, scene_warnings, AnimationBaker, SceneGraph, SettingsStore, TransformBaker,
};
use tracing::{error, info, info_span, warn};

use crate::bundle::BundleAssembler;
use crate::config::PipelineConfig;
use crate::error::ExportResult;
use crate::exporter::ComponentExporter;
use crate::validator::{ValidationIssue, Validator};

/// Which optional stages to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Run the external validator after export
    pub validate: bool,
    /// Delete the exported icon folder once the build finishes
    pub cleanup: bool,
    /// Write the zip bundle after a successful build
    pub bundle: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            validate: true,
            cleanup: false,
            bundle: false,
        }
    }
}

/// Where a build ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    /// Preconditions checked, nothing exported yet
    Pending,
    /// Both components exported
    Exported,
    /// Exported and accepted by the validator
    Validated,
    /// Export failed or the validator reported errors
    Failed,
}

/// Outcome of one build
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Final state
    pub state: BuildState,
    /// Exported artifacts were deleted
    pub cleaned: bool,
    /// Icon folder the build wrote to
    pub icon_dir: PathBuf,
    /// Validator errors
    pub issues: Vec<ValidationIssue>,
    /// Advisory findings, never gate the build
    pub warnings: Vec<String>,
    /// Zip bundle, when one was written
    pub archive: Option<PathBuf>,
    /// Why the build failed, when it failed for a reason other than
    /// validation errors
    pub failure: Option<String>,
}

impl BuildReport {
    fn new(icon_dir: PathBuf) -> Self {
        Self {
            state: BuildState::Pending,
            cleaned: false,
            icon_dir,
            issues: Vec::new(),
            warnings: Vec::new(),
            archive: None,
            failure: None,
        }
    }

    fn fail(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        error!(reason = %reason, "Build failed");
        self.state = BuildState::Failed;
        self.failure = Some(reason);
    }

    /// Exported, and validated when validation ran
    pub fn succeeded(&self) -> bool {
        matches!(self.state, BuildState::Exported | BuildState::Validated)
    }
}

/// Sequences export, validation, bundling and cleanup
pub struct BuildOrchestrator<R: ToolRunner> {
    exporter: ComponentExporter,
    runner: R,
}

impl<R: ToolRunner> BuildOrchestrator<R> {
    /// Orchestrator with the default exporter
    pub fn new(config: PipelineConfig, runner: R) -> Self {
        Self {
            exporter: ComponentExporter::new(config),
            runner,
        }
    }

    /// Orchestrator with a preconfigured exporter
    pub fn with_exporter(exporter: ComponentExporter, runner: R) -> Self {
        Self { exporter, runner }
    }

    /// Pipeline configuration in use
    pub fn config(&self) -> &PipelineConfig {
        self.exporter.config()
    }

    /// Run a build against `scene`, which is never modified
    pub fn build(&self, scene: &SceneGraph, options: BuildOptions) -> ExportResult<BuildReport> {
        let _span = info_span!("build").entered();

        // Preconditions: nothing is written if these fail
        let settings = SettingsStore::load(scene);
        let icon_dir = self.config().icon_directory(settings.output_path()?);
        for kind in ComponentKind::ALL {
            component_root(scene, kind)?;
        }

        let mut report = BuildReport::new(icon_dir.clone());
        report.warnings.extend(scene_warnings(scene, &settings));

        // Pending -> Exported
        match self.prepare(scene, &settings.animation_takes) {
            Ok(prepared) => {
                let takes = settings.effective_takes();
                let exported = ComponentKind::ALL
                    .iter()
                    .map(|&kind| self.exporter.export(&prepared, kind, &icon_dir, &takes))
                    .fold(true, |all, ok| all && ok);
                if exported {
                    report.state = BuildState::Exported;
                    info!(path = %icon_dir.display(), "Icon exported");
                } else {
                    report.fail("component export failed");
                }
            }
            Err(e) => report.fail(format!("scene preparation failed: {}", e)),
        }

        // Exported -> Validated | Failed
        if report.state == BuildState::Exported && options.validate {
            match Validator::new(self.config(), &self.runner).validate(&icon_dir) {
                Ok(outcome) if outcome.ok => report.state = BuildState::Validated,
                Ok(outcome) => {
                    report.state = BuildState::Failed;
                    report.issues = outcome.issues;
                }
                Err(e) => report.fail(e.to_string()),
            }
        }

        if options.bundle && report.succeeded() {
            report.archive = Some(BundleAssembler::new(self.config()).assemble(&icon_dir)?);
        }

        if options.cleanup {
            report.cleaned = Self::cleanup(&icon_dir);
        }

        info!(state = ?report.state, cleaned = report.cleaned, "Build finished");
        Ok(report)
    }

    /// Clone the scene and bake it for export
    fn prepare(&self, scene: &SceneGraph, takes: &[iconforge_scene::AnimationTake]) -> ExportResult<SceneGraph> {
        let mut work = scene.clone();
        work.strip_namespaces();

        let template = require_icon_template(&work)?;
        TransformBaker::bake(&mut work, template)?;
        for kind in ComponentKind::ALL {
            let root = component_root(&work, kind)?;
            AnimationBaker::bake(&mut work, root, takes)?;
        }
        Ok(work)
    }

    fn cleanup(icon_dir: &Path) -> bool {
        match fs::remove_dir_all(icon_dir) {
            Ok(()) => {
                info!(path = %icon_dir.display(), "Cleaned up icon");
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => {
                warn!(path = %icon_dir.display(), error = %e, "Cleanup failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iconforge_core::{NodeKind, ToolOutput};
    use iconforge_scene::create_icon_template;

    struct Fixed(ToolOutput);

    impl ToolRunner for Fixed {
        fn run(&self, _: &Path, _: &[String]) -> std::io::Result<ToolOutput> {
            Ok(self.0.clone())
        }
    }

    fn scene_with_output(output: Option<&Path>) -> SceneGraph {
        let mut scene = SceneGraph::new();
        create_icon_template(&mut scene).unwrap();
        if let Some(output) = output {
            SettingsStore::set_output_path(&mut scene, output).unwrap();
        }
        let model = component_root(&scene, ComponentKind::Model).unwrap();
        scene.add_node("body", NodeKind::Mesh, Some(model)).unwrap();
        scene
    }

    #[test]
    fn test_missing_output_path_is_fatal() {
        let orchestrator = BuildOrchestrator::new(PipelineConfig::default(), Fixed(ToolOutput::ok("")));
        let err = orchestrator
            .build(&scene_with_output(None), BuildOptions::default())
            .unwrap_err();
        assert!(err.is_fatal_precondition());
    }

    #[test]
    fn test_missing_component_is_fatal_and_writes_nothing() {
        let out = tempfile::tempdir().unwrap();
        let mut scene = scene_with_output(Some(out.path()));
        let portal = component_root(&scene, ComponentKind::Portal).unwrap();
        scene.delete_subtree(portal).unwrap();

        let orchestrator = BuildOrchestrator::new(PipelineConfig::default(), Fixed(ToolOutput::ok("")));
        let err = orchestrator.build(&scene, BuildOptions::default()).unwrap_err();

        assert!(err.is_fatal_precondition());
        assert!(!out.path().join("Icon").exists());
    }

    #[test]
    fn test_validated_then_cleaned() {
        let out = tempfile::tempdir().unwrap();
        let scene = scene_with_output(Some(out.path()));
        let orchestrator = BuildOrchestrator::new(PipelineConfig::default(), Fixed(ToolOutput::ok("")));

        let report = orchestrator
            .build(
                &scene,
                BuildOptions {
                    validate: true,
                    cleanup: true,
                    bundle: false,
                },
            )
            .unwrap();

        assert_eq!(report.state, BuildState::Validated);
        assert!(report.cleaned);
        assert!(!out.path().join("Icon").exists());
    }

    #[test]
    fn test_validation_errors_fail_build_and_skip_bundle() {
        let out = tempfile::tempdir().unwrap();
        let scene = scene_with_output(Some(out.path()));
        let runner = Fixed(ToolOutput::failed(1, "{\"errors\":[{\"code\":\"E1\",\"message\":\"bad uv\"}]}"));
        let orchestrator = BuildOrchestrator::new(PipelineConfig::default(), runner);

        let report = orchestrator
            .build(
                &scene,
                BuildOptions {
                    validate: true,
                    cleanup: false,
                    bundle: true,
                },
            )
            .unwrap();

        assert_eq!(report.state, BuildState::Failed);
        assert_eq!(report.issues[0].code, "E1");
        assert!(report.failure.is_none());
        assert!(report.archive.is_none());
        assert!(out.path().join("Icon/Model/Model.kmat").is_file());
    }

    #[test]
    fn test_unreadable_validator_output_is_reported() {
        let out = tempfile::tempdir().unwrap();
        let scene = scene_with_output(Some(out.path()));
        let orchestrator = BuildOrchestrator::new(PipelineConfig::default(), Fixed(ToolOutput::failed(3, "boom")));

        let report = orchestrator.build(&scene, BuildOptions::default()).unwrap();
        assert_eq!(report.state, BuildState::Failed);
        assert!(report.failure.unwrap().contains("boom"));
    }
}
