//! Parallel Build - batch-mode editor build driver
//!
//! ## Commands
//!
//! - `build`: Run a batch-mode build, streaming output and progress
//! - `command`: Print the editor command line without launching it
//! - `locate`: Show the editor version a project needs and where it lives

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pbuild_core::{
    BuildOutcome, BuildRequest, BuildRunner, BuilderConfig, Platform, ProgressEvent,
    ProjectVersion, DEFAULT_EXPECTED_LINE_COUNT,
};
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(name = "pbuild")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Batch-mode game-engine build driver", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a batch-mode build of a project
    Build {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        editor: EditorArgs,

        /// Do not echo editor output to stdout
        #[arg(short, long)]
        quiet: bool,

        /// Print progress events and the final outcome as JSON lines
        #[arg(long, conflicts_with = "quiet")]
        events: bool,
    },

    /// Print the editor command line without launching it
    Command {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        editor: EditorArgs,
    },

    /// Show the editor version and executable a project resolves to
    Locate {
        /// Project root
        #[arg(default_value = ".")]
        project: PathBuf,

        #[command(flatten)]
        editor: EditorArgs,
    },
}

#[derive(Args)]
struct TargetArgs {
    /// Project root
    #[arg(default_value = ".")]
    project: PathBuf,

    /// Build output path (relative paths are taken from the project root)
    #[arg(short, long, default_value = "Build")]
    output: PathBuf,

    /// Fully qualified build method, e.g. Builds.Pipeline.BuildWebGL
    #[arg(short, long)]
    method: String,
}

/// What `pbuild build` writes to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Echo {
    Lines,
    Events,
    Quiet,
}

impl Echo {
    fn from_flags(quiet: bool, events: bool) -> Self {
        match (quiet, events) {
            (true, _) => Echo::Quiet,
            (false, true) => Echo::Events,
            (false, false) => Echo::Lines,
        }
    }
}

impl TargetArgs {
    fn request(&self) -> BuildRequest {
        BuildRequest::new(&self.project, &self.output, &self.method)
    }
}

#[derive(Args)]
struct EditorArgs {
    /// Lines a typical successful build prints (progress calibration)
    #[arg(long, env = "PBUILD_EXPECTED_LINES", default_value_t = DEFAULT_EXPECTED_LINE_COUNT)]
    expected_lines: u64,

    /// Editor install root (defaults to the platform's Hub location)
    #[arg(long, env = "PBUILD_EDITOR_ROOT")]
    editor_root: Option<PathBuf>,

    /// Install layout: windows, macos, or linux (defaults to the host)
    #[arg(long, env = "PBUILD_PLATFORM")]
    platform: Option<Platform>,
}

impl EditorArgs {
    fn config(&self) -> BuilderConfig {
        let mut config = BuilderConfig::default().with_expected_line_count(self.expected_lines);
        if let Some(platform) = self.platform {
            config = config.with_platform(platform);
        }
        if let Some(root) = &self.editor_root {
            config = config.with_editor_root(root);
        }
        config
    }

    fn runner(&self) -> Result<BuildRunner> {
        BuildRunner::new(self.config()).context("Invalid editor configuration")
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    pbuild_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Build {
            target,
            editor,
            quiet,
            events,
        } => cmd_build(&target, &editor, Echo::from_flags(quiet, events)).await,
        Commands::Command { target, editor } => cmd_command(&target, &editor),
        Commands::Locate { project, editor } => cmd_locate(&project, &editor),
    }
}

async fn cmd_build(target: &TargetArgs, editor: &EditorArgs, echo: Echo) -> Result<ExitCode> {
    let outcome = run_build(target, editor, echo, tokio::signal::ctrl_c()).await?;
    Ok(exit_code(&outcome))
}

/// Run a build to completion, terminating the editor once `interrupt` resolves.
async fn run_build<F: Future>(
    target: &TargetArgs,
    editor: &EditorArgs,
    echo: Echo,
    interrupt: F,
) -> Result<BuildOutcome> {
    let runner = editor.runner()?;
    let request = target.request();

    let mut invocation = runner.start(&request).with_context(|| {
        format!("Failed to start build of {}", request.project_path.display())
    })?;
    info!(
        build_path = %request.resolved_build_path().display(),
        method = %request.build_method,
        "Build started"
    );

    tokio::pin!(interrupt);
    let mut cancelled = false;
    let mut last_decile = None;

    loop {
        let next = tokio::select! {
            event = invocation.next_event() => Some(event),
            _ = &mut interrupt, if !cancelled => None,
        };

        let Some(event) = next else {
            warn!("Interrupted, terminating editor");
            cancelled = true;
            invocation.terminate()?;
            continue;
        };

        let Some(event) = event.context("Failed to read build output")? else {
            break;
        };

        match echo {
            Echo::Lines => println!("{}", event.line),
            Echo::Events => println!("{}", event_json(&event)?),
            Echo::Quiet => {}
        }
        let decile = (event.percentage / 10.0).floor() as u8;
        if last_decile != Some(decile) {
            last_decile = Some(decile);
            info!(progress = %format!("{:.0}%", event.percentage), "{}", event.line);
        }
    }

    let outcome = invocation.wait().await.context("Failed to reap build process")?;
    pbuild_core::log_outcome(&outcome);
    if echo == Echo::Events {
        println!("{}", outcome_json(&outcome)?);
    }
    Ok(outcome)
}

fn event_json(event: &ProgressEvent) -> Result<String> {
    serde_json::to_string(event).context("Failed to serialize progress event")
}

fn outcome_json(outcome: &BuildOutcome) -> Result<String> {
    serde_json::to_string(outcome).context("Failed to serialize build outcome")
}

fn exit_code(outcome: &BuildOutcome) -> ExitCode {
    if outcome.success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn cmd_command(target: &TargetArgs, editor: &EditorArgs) -> Result<ExitCode> {
    let command = editor
        .runner()?
        .prepare(&target.request())
        .context("Failed to assemble editor command")?;
    println!("{}", command.command_line());
    Ok(ExitCode::SUCCESS)
}

fn cmd_locate(project: &Path, editor: &EditorArgs) -> Result<ExitCode> {
    let runner = editor.runner()?;
    let version = ProjectVersion::load(project).context("Failed to read project version")?;
    let executable = runner.locator().executable(&version.editor_version);
    let installed = executable.exists();

    println!("Editor version: {}", version.editor_version);
    if let Some(revision) = &version.editor_version_with_revision {
        println!("Revision:       {revision}");
    }
    println!("Platform:       {}", runner.locator().platform());
    println!("Executable:     {}", executable.display());
    println!("Installed:      {}", if installed { "yes" } else { "no" });

    Ok(if installed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
