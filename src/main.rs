//! iconforge CLI
//!
//! Command-line front end for the icon pipeline: set up the Icon Template,
//! edit build settings, check takes, build, bundle and preview.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

use iconforge_bridge::{DeviceBridge, PreviewRequest, Previewer, SDK_ENV};
use iconforge_core::{ComponentKind, ProcessRunner};
use iconforge_export::{BuildOptions, BuildOrchestrator, BuildReport, BundleAssembler, PipelineConfig};
use iconforge_scene::{
    create_icon_template, icon_template, load_scene, save_scene, scene_warnings, take_report, SceneGraph,
    SettingsStore, TakeEdit,
};

/// iconforge - build and validate Icon assets
#[derive(Parser)]
#[command(name = "iconforge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format for reports
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Directory holding icon-converter and asset-previewer
    #[arg(long, global = true, env = "ASSET_TOOLS_DATA")]
    tools_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create the Icon Template in a scene document
    Init(InitArgs),

    /// Show or edit the build settings stored on the Icon Template
    Settings(SettingsArgs),

    /// Check takes, scene units and animation placement
    Check(SceneArg),

    /// Export both components and validate the result
    Build(BuildArgs),

    /// Zip a previously exported icon
    Bundle(SceneArg),

    /// Build, bundle and send the icon to a connected device
    Preview(PreviewArgs),
}

#[derive(Args)]
struct SceneArg {
    /// Path to the scene document
    scene: PathBuf,
}

#[derive(Args)]
struct InitArgs {
    /// Path to the scene document, created if missing
    scene: PathBuf,

    /// Output directory to store in the new settings
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct SettingsArgs {
    #[command(subcommand)]
    action: SettingsAction,
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the current settings
    Show(SceneArg),

    /// Set the output directory
    Output {
        scene: PathBuf,
        path: PathBuf,
    },

    /// Set the SDK directory used for preview
    Sdk {
        scene: PathBuf,
        path: PathBuf,
    },

    /// Enable, update or disable an animation take
    Take(TakeArgs),
}

#[derive(Args)]
struct TakeArgs {
    scene: PathBuf,

    /// Clip name (idle, hover, activate, menu, loading)
    name: String,

    #[arg(long, default_value = "1")]
    start: i64,

    #[arg(long, default_value = "2")]
    end: i64,

    /// Remove the take instead of enabling it
    #[arg(long)]
    disable: bool,
}

#[derive(Args)]
struct BuildArgs {
    scene: PathBuf,

    /// Skip the external validator
    #[arg(long)]
    no_validate: bool,

    /// Delete the exported folder afterwards
    #[arg(long)]
    cleanup: bool,

    /// Write Icon.zip after a successful build
    #[arg(long)]
    bundle: bool,
}

#[derive(Args)]
struct PreviewArgs {
    scene: PathBuf,

    /// SDK directory, overrides the stored setting and MLSDK
    #[arg(long)]
    sdk_path: Option<PathBuf>,

    /// Skip the external validator
    #[arg(long)]
    no_validate: bool,
}

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= 2)
        .with_thread_ids(verbosity >= 3)
        .with_file(verbosity >= 3)
        .with_line_number(verbosity >= 3)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = match &cli.tools_dir {
        Some(dir) => PipelineConfig::default().with_tools_dir(dir),
        None => PipelineConfig::default(),
    };

    match cli.command {
        Commands::Init(args) => cmd_init(args),
        Commands::Settings(args) => cmd_settings(args, cli.format),
        Commands::Check(args) => cmd_check(args, cli.format),
        Commands::Build(args) => cmd_build(args, &config, cli.format),
        Commands::Bundle(args) => cmd_bundle(args, &config),
        Commands::Preview(args) => cmd_preview(args, &config, cli.format),
    }
}

fn open_scene(path: &Path) -> Result<SceneGraph> {
    load_scene(path).with_context(|| format!("Failed to load scene {}", path.display()))
}

fn persist_scene(scene: &SceneGraph, path: &Path) -> Result<()> {
    save_scene(scene, path).with_context(|| format!("Failed to save scene {}", path.display()))
}

fn cmd_init(args: InitArgs) -> Result<()> {
    let mut scene = if args.scene.exists() {
        open_scene(&args.scene)?
    } else {
        SceneGraph::new()
    };

    if icon_template(&scene).is_some() {
        bail!("Icon Template already exists in {}", args.scene.display());
    }
    create_icon_template(&mut scene).context("Failed to create Icon Template")?;

    if let Some(output) = args.output {
        SettingsStore::set_output_path(&mut scene, output)?;
    }

    persist_scene(&scene, &args.scene)?;
    println!("Created Icon Template in {}", args.scene.display());
    Ok(())
}

fn cmd_settings(args: SettingsArgs, format: OutputFormat) -> Result<()> {
    match args.action {
        SettingsAction::Show(arg) => {
            let scene = open_scene(&arg.scene)?;
            let settings = SettingsStore::load(&scene);

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&settings)?),
                OutputFormat::Text => {
                    let show = |p: &Option<PathBuf>| p.as_ref().map_or("(not set)".to_string(), |p| p.display().to_string());
                    println!("Output path: {}", show(&settings.output_path));
                    println!("SDK path:    {}", show(&settings.sdk_path));
                    println!("Takes:");
                    for take in &settings.animation_takes {
                        println!("  {:<10} {:>5} - {:<5}", take.name, take.start_frame, take.end_frame);
                    }
                }
            }
        }
        SettingsAction::Output { scene: path, path: output } => {
            let mut scene = open_scene(&path)?;
            SettingsStore::set_output_path(&mut scene, &output)?;
            persist_scene(&scene, &path)?;
            info!(output = %output.display(), "Output path saved");
        }
        SettingsAction::Sdk { scene: path, path: sdk } => {
            let mut scene = open_scene(&path)?;
            SettingsStore::set_sdk_path(&mut scene, &sdk)?;
            persist_scene(&scene, &path)?;
            info!(sdk = %sdk.display(), "SDK path saved");
        }
        SettingsAction::Take(take) => {
            let mut scene = open_scene(&take.scene)?;
            let edit = TakeEdit {
                name: take.name.clone(),
                enabled: !take.disable,
                start_frame: take.start,
                end_frame: take.end,
            };
            let change = SettingsStore::apply_take_edit(&mut scene, &edit)?;
            persist_scene(&scene, &take.scene)?;
            println!("{}: {:?}", take.name, change);
        }
    }
    Ok(())
}

fn cmd_check(args: SceneArg, format: OutputFormat) -> Result<()> {
    let scene = open_scene(&args.scene)?;
    let settings = SettingsStore::load(&scene);
    let takes = settings.effective_takes();

    let reports = takes
        .iter()
        .map(|take| take_report(&scene, take))
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to check takes")?;
    let warnings = scene_warnings(&scene, &settings);

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "takes": reports.iter().map(|r| serde_json::json!({
                    "name": r.take.name,
                    "startFrame": r.take.start_frame,
                    "endFrame": r.take.end_frame,
                    "ready": r.is_ready(),
                    "issues": r.issues.iter().map(|i| i.to_string()).collect::<Vec<_>>(),
                })).collect::<Vec<_>>(),
                "warnings": warnings,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            for report in &reports {
                let status = if report.is_ready() { "ready" } else { "not ready" };
                println!("{} [{}-{}]: {}", report.take.name, report.take.start_frame, report.take.end_frame, status);
                for issue in &report.issues {
                    println!("  - {}", issue);
                }
            }
            for warning in &warnings {
                println!("warning: {}", warning);
            }
        }
    }
    Ok(())
}

fn print_report(report: &BuildReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "state": format!("{:?}", report.state),
                "iconDir": report.icon_dir,
                "cleaned": report.cleaned,
                "archive": report.archive,
                "failure": report.failure,
                "warnings": report.warnings,
                "issues": report.issues,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!("Build {:?}: {}", report.state, report.icon_dir.display());
            for warning in &report.warnings {
                println!("warning: {}", warning);
            }
            for issue in &report.issues {
                println!("error: {}", issue);
            }
            if let Some(failure) = &report.failure {
                println!("failure: {}", failure);
            }
            if let Some(archive) = &report.archive {
                println!("Bundle: {}", archive.display());
            }
            if report.cleaned {
                println!("Exported files removed");
            }
        }
    }
    Ok(())
}

fn cmd_build(args: BuildArgs, config: &PipelineConfig, format: OutputFormat) -> Result<()> {
    let scene = open_scene(&args.scene)?;
    let options = BuildOptions {
        validate: !args.no_validate,
        cleanup: args.cleanup,
        bundle: args.bundle,
    };

    let report = BuildOrchestrator::new(config.clone(), ProcessRunner)
        .build(&scene, options)
        .context("Build could not start")?;
    print_report(&report, format)?;

    if !report.succeeded() {
        bail!("Icon build failed");
    }
    Ok(())
}

fn cmd_bundle(args: SceneArg, config: &PipelineConfig) -> Result<()> {
    let scene = open_scene(&args.scene)?;
    let settings = SettingsStore::load(&scene);
    let icon_dir = config.icon_directory(settings.output_path()?);

    if !icon_dir.is_dir() {
        bail!("No exported icon at {}, run build first", icon_dir.display());
    }
    let archive = BundleAssembler::new(config)
        .assemble(&icon_dir)
        .context("Failed to bundle icon")?;
    println!("Bundle: {}", archive.display());
    Ok(())
}

/// SDK directory from the command line, the stored settings, or the environment
fn resolve_sdk(explicit: Option<PathBuf>, stored: Option<PathBuf>, env: Option<PathBuf>) -> Option<PathBuf> {
    explicit.or(stored).or(env)
}

fn cmd_preview(args: PreviewArgs, config: &PipelineConfig, format: OutputFormat) -> Result<()> {
    let scene = open_scene(&args.scene)?;
    let settings = SettingsStore::load(&scene);

    let sdk = resolve_sdk(
        args.sdk_path,
        settings.sdk_path.clone(),
        std::env::var_os(SDK_ENV).map(PathBuf::from),
    )
    .ok_or(iconforge_bridge::BridgeError::SdkNotSet)?;

    let options = BuildOptions {
        validate: !args.no_validate,
        cleanup: false,
        bundle: true,
    };
    let report = BuildOrchestrator::new(config.clone(), ProcessRunner)
        .build(&scene, options)
        .context("Build could not start")?;
    print_report(&report, format)?;

    let succeeded = report.succeeded();
    let Some(archive) = report.archive.filter(|_| succeeded) else {
        bail!("Icon build failed, nothing to preview");
    };

    let request = PreviewRequest {
        manifest_model_folder: config.relative_component_path(ComponentKind::Model),
        manifest_portal_folder: config.relative_component_path(ComponentKind::Portal),
        zip_model_folder: config.component_folder(ComponentKind::Model).to_string(),
        zip_portal_folder: config.component_folder(ComponentKind::Portal).to_string(),
        ..Default::default()
    };

    let bridge = DeviceBridge::from_sdk(&sdk, ProcessRunner).context("Failed to start device bridge")?;
    let previewer = Previewer::new(config.tools_dir.as_deref(), ProcessRunner);
    match previewer.deploy(&bridge, &request, &archive) {
        Ok(device) => {
            println!("Icon sent to {}", device);
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "Preview failed");
            Err(e).context("Failed to preview icon")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_take_command() {
        let cli = Cli::try_parse_from(["iconforge", "settings", "take", "scene.json", "hover", "--start", "1", "--end", "120"])
            .unwrap();
        let Commands::Settings(SettingsArgs { action: SettingsAction::Take(take) }) = cli.command else {
            panic!("expected settings take");
        };
        assert_eq!(take.name, "hover");
        assert_eq!((take.start, take.end), (1, 120));
        assert!(!take.disable);
    }

    #[test]
    fn test_resolve_sdk_precedence() {
        let p = |s: &str| Some(PathBuf::from(s));
        assert_eq!(resolve_sdk(p("/a"), p("/b"), p("/c")), p("/a"));
        assert_eq!(resolve_sdk(None, p("/b"), p("/c")), p("/b"));
        assert_eq!(resolve_sdk(None, None, p("/c")), p("/c"));
        assert_eq!(resolve_sdk(None, None, None), None);
    }

    #[test]
    fn test_init_then_set_output() {
        let dir = tempfile::tempdir().unwrap();
        let scene_path = dir.path().join("scene.json");

        cmd_init(InitArgs {
            scene: scene_path.clone(),
            output: None,
        })
        .unwrap();
        cmd_settings(
            SettingsArgs {
                action: SettingsAction::Output {
                    scene: scene_path.clone(),
                    path: dir.path().join("out"),
                },
            },
            OutputFormat::Text,
        )
        .unwrap();

        let scene = load_scene(&scene_path).unwrap();
        let settings = SettingsStore::load(&scene);
        assert_eq!(settings.output_path().unwrap(), dir.path().join("out"));

        // a second init refuses to overwrite the template
        assert!(cmd_init(InitArgs {
            scene: scene_path,
            output: None,
        })
        .is_err());
    }
}
