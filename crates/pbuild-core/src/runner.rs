//! Build process orchestration.
//!
//! [`BuildRunner::start`] resolves the editor for a project, spawns it in
//! batch mode and hands back a [`BuildInvocation`]. The caller drains the
//! invocation's output (each line yields a [`ProgressEvent`]) and then calls
//! [`BuildInvocation::wait`] for the exit status.
//!
//! ```ignore
//! let runner = BuildRunner::new(BuilderConfig::default())?;
//! let mut build = runner.start(&BuildRequest::new(project, "Build/WebGL", "Builds.WebGL"))?;
//! while let Some(event) = build.next_event().await? {
//!     println!("{:5.1}% {}", event.percentage, event.line);
//! }
//! let outcome = build.wait().await?;
//! ```
//!
//! The editor writes into OS pipes of bounded size. Output must be read for
//! the process to make progress, which is why the exit status is only
//! reachable through [`BuildInvocation::wait`]: it drains whatever is left
//! before reaping.

use std::process::Stdio;
use std::time::Instant;

use futures::stream::{self, Stream};
use serde::Serialize;
use tokio::io::BufReader;
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::command::{BuildCommand, BuildRequest};
use crate::config::BuilderConfig;
use crate::editor::EditorLocator;
use crate::error::BuildError;
use crate::lines::LineReader;
use crate::obs;
use crate::progress::{OutputParser, ProgressEvent};
use crate::version::ProjectVersion;
use crate::Result;

/// Lifecycle of one build invocation.
///
/// Before spawning, a build is just a [`BuildCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildStatus {
    Running,
    Succeeded,
    Failed,
}

/// Starts editor builds with a shared configuration.
#[derive(Debug, Clone)]
pub struct BuildRunner {
    config: BuilderConfig,
    locator: EditorLocator,
}

impl BuildRunner {
    /// Create a runner. Fails if `config` does not validate.
    pub fn new(config: BuilderConfig) -> Result<Self> {
        config.validate()?;
        let locator = config.locator();
        Ok(Self { config, locator })
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub fn locator(&self) -> &EditorLocator {
        &self.locator
    }

    /// Resolve the editor version and assemble the command without spawning.
    pub fn prepare(&self, request: &BuildRequest) -> Result<BuildCommand> {
        let version = ProjectVersion::load(&request.project_path)?;
        let program = self.locator.executable(&version.editor_version);
        Ok(BuildCommand::new(program, request))
    }

    /// Spawn the editor for `request`.
    ///
    /// Returns once the process is running. Must be called from within a
    /// Tokio runtime. Configuration problems are reported before anything
    /// is spawned.
    pub fn start(&self, request: &BuildRequest) -> Result<BuildInvocation> {
        let command = self.prepare(request)?;
        BuildInvocation::spawn(&command, self.config.expected_line_count)
    }
}

type StdoutLines = LineReader<BufReader<ChildStdout>>;

/// A running editor process and the state parsed from its output.
///
/// Single-owner: one consumer drains the output. Dropping the invocation
/// before [`wait`](Self::wait) kills the process.
#[derive(Debug)]
pub struct BuildInvocation {
    id: Uuid,
    child: Child,
    stdout: Option<StdoutLines>,
    stderr_task: Option<JoinHandle<()>>,
    parser: OutputParser,
    started_at: Instant,
    terminated: bool,
}

impl BuildInvocation {
    /// Spawn `command`, estimating progress against `expected_line_count`.
    pub fn spawn(command: &BuildCommand, expected_line_count: u64) -> Result<Self> {
        let id = Uuid::new_v4();
        debug!(invocation_id = %id, command = %command.command_line(), "Spawning editor");

        let mut child = Command::new(&command.program)
            .args(command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| {
                obs::emit_launch_failed(&command.program, &source);
                BuildError::ProcessLaunch {
                    program: command.program.clone(),
                    source,
                }
            })?;

        let stdout = child
            .stdout
            .take()
            .map(|out| LineReader::new(BufReader::new(out)));
        let stderr_task = child.stderr.take().map(|err| drain_stderr(id, err));

        obs::emit_build_started(
            id,
            &command.program,
            &command.build_method,
            &command.project_path,
            child.id(),
        );

        Ok(Self {
            id,
            child,
            stdout,
            stderr_task,
            parser: OutputParser::new(expected_line_count),
            started_at: Instant::now(),
            terminated: false,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// OS process id, while the process has not been reaped.
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Always [`BuildStatus::Running`]; the final state is on the outcome.
    pub fn status(&self) -> BuildStatus {
        BuildStatus::Running
    }

    /// Read the next line of output.
    ///
    /// Lines end at `\n`, `\r\n` or a bare `\r`. Returns `Ok(None)` once
    /// stdout is closed, and on every call after that. A read error also
    /// ends the sequence. Cancel-safe.
    pub async fn next_event(&mut self) -> Result<Option<ProgressEvent>> {
        let Some(lines) = self.stdout.as_mut() else {
            return Ok(None);
        };

        match lines.next_line().await {
            Ok(Some(bytes)) => {
                let raw = String::from_utf8_lossy(&bytes);
                let was_inside = self.parser.inside_failure_block();
                let event = self.parser.feed(&raw);
                if !was_inside && self.parser.inside_failure_block() {
                    obs::emit_failure_block(self.id, event.index);
                }
                Ok(Some(event))
            }
            Ok(None) => {
                debug!(
                    invocation_id = %self.id,
                    lines = self.parser.lines_seen(),
                    "Build output closed"
                );
                self.stdout = None;
                Ok(None)
            }
            Err(e) => {
                self.stdout = None;
                Err(BuildError::Output(e))
            }
        }
    }

    /// Output as a lazy, single-pass stream of progress events.
    pub fn output_lines(&mut self) -> impl Stream<Item = Result<ProgressEvent>> + '_ {
        stream::unfold(self, |invocation| async move {
            match invocation.next_event().await {
                Ok(Some(event)) => Some((Ok(event), invocation)),
                Ok(None) => None,
                Err(e) => Some((Err(e), invocation)),
            }
        })
    }

    /// Failure diagnostics collected so far. May be partial until drained.
    pub fn failure_message(&self) -> &str {
        self.parser.failure_message()
    }

    pub fn lines_read(&self) -> u64 {
        self.parser.lines_seen()
    }

    /// Whether stdout has been read to the end.
    pub fn is_drained(&self) -> bool {
        self.stdout.is_none()
    }

    /// Send a kill signal to the editor.
    ///
    /// The output sequence still ends on its own once the pipe closes;
    /// keep draining or call [`wait`](Self::wait) to reap the process.
    pub fn terminate(&mut self) -> Result<()> {
        if self.terminated {
            return Ok(());
        }
        self.child.start_kill().map_err(BuildError::Terminate)?;
        self.terminated = true;
        obs::emit_terminated(self.id);
        Ok(())
    }

    /// Drain remaining output, reap the process, and report the outcome.
    pub async fn wait(mut self) -> Result<BuildOutcome> {
        let mut discarded = 0u64;
        while self.next_event().await?.is_some() {
            discarded += 1;
        }
        if discarded > 0 {
            debug!(invocation_id = %self.id, discarded, "Drained unread output before wait");
        }

        let status = self.child.wait().await.map_err(BuildError::Wait)?;

        if let Some(task) = self.stderr_task.take() {
            if let Err(e) = task.await {
                debug!(invocation_id = %self.id, error = %e, "stderr reader ended abnormally");
            }
        }

        let duration_ms = self.started_at.elapsed().as_millis() as u64;
        let outcome = BuildOutcome {
            invocation_id: self.id,
            exit_code: status.code(),
            line_count: self.parser.lines_seen(),
            failure_message: std::mem::take(&mut self.parser).into_failure_message(),
            duration_ms,
            terminated: self.terminated,
        };

        obs::emit_build_finished(
            outcome.invocation_id,
            outcome.exit_code,
            outcome.line_count,
            outcome.duration_ms,
            outcome.success(),
        );
        Ok(outcome)
    }
}

fn drain_stderr(id: Uuid, stderr: ChildStderr) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = LineReader::new(BufReader::new(stderr));
        loop {
            match lines.next_line().await {
                Ok(Some(bytes)) => {
                    let line = String::from_utf8_lossy(&bytes);
                    let line = line.trim();
                    if !line.is_empty() {
                        obs::emit_stderr_line(id, line);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    debug!(invocation_id = %id, error = %e, "stderr read failed");
                    break;
                }
            }
        }
    })
}

/// Final result of a build invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildOutcome {
    pub invocation_id: Uuid,

    /// Exit code; `None` when the process was ended by a signal.
    pub exit_code: Option<i32>,

    /// Diagnostics captured from failure blocks. May be empty on failure.
    pub failure_message: String,

    /// Lines read from stdout.
    pub line_count: u64,

    pub duration_ms: u64,

    /// Whether [`BuildInvocation::terminate`] was called.
    pub terminated: bool,
}

impl BuildOutcome {
    /// Exit code 0.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn status(&self) -> BuildStatus {
        if self.success() {
            BuildStatus::Succeeded
        } else {
            BuildStatus::Failed
        }
    }

    /// Failure diagnostics without the trailing newline, if any were captured.
    pub fn failure_summary(&self) -> Option<&str> {
        let message = self.failure_message.trim_end();
        if message.is_empty() {
            None
        } else {
            Some(message)
        }
    }
}

impl std::fmt::Display for BuildOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.success(), self.exit_code) {
            (true, _) => write!(f, "build succeeded in {}ms", self.duration_ms),
            (false, Some(code)) => write!(f, "build failed with exit code {code}"),
            (false, None) => write!(f, "build terminated by signal"),
        }
    }
}

/// Log an outcome at the right level for a caller that only wants a summary.
pub fn log_outcome(outcome: &BuildOutcome) {
    match outcome.failure_summary() {
        Some(message) if !outcome.success() => {
            tracing::error!(invocation_id = %outcome.invocation_id, "{outcome}:\n{message}")
        }
        _ if !outcome.success() => {
            tracing::error!(invocation_id = %outcome.invocation_id, "{outcome}")
        }
        _ => info!(invocation_id = %outcome.invocation_id, "{outcome}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;
    use tracing_test::traced_test;

    fn outcome(exit_code: Option<i32>, failure_message: &str) -> BuildOutcome {
        BuildOutcome {
            invocation_id: Uuid::new_v4(),
            exit_code,
            failure_message: failure_message.to_string(),
            line_count: 10,
            duration_ms: 5,
            terminated: false,
        }
    }

    #[test]
    fn test_outcome_status() {
        assert_eq!(outcome(Some(0), "").status(), BuildStatus::Succeeded);
        assert_eq!(outcome(Some(1), "").status(), BuildStatus::Failed);
        assert_eq!(outcome(None, "").status(), BuildStatus::Failed);
    }

    #[test]
    fn test_failure_summary() {
        assert_eq!(outcome(Some(1), "").failure_summary(), None);
        assert_eq!(
            outcome(Some(1), "a\nb\n").failure_summary(),
            Some("a\nb")
        );
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(outcome(Some(2), "").to_string(), "build failed with exit code 2");
        assert_eq!(outcome(None, "").to_string(), "build terminated by signal");
    }

    #[test]
    #[traced_test]
    fn test_log_outcome_success_is_info() {
        log_outcome(&outcome(Some(0), ""));
        logs_assert(|lines: &[&str]| {
            match lines.iter().find(|l| l.contains("build succeeded in 5ms")) {
                Some(line) if line.contains("INFO") => Ok(()),
                Some(line) => Err(format!("not logged at info: {line}")),
                None => Err("success not logged".to_string()),
            }
        });
        assert!(!logs_contain("ERROR"));
    }

    #[test]
    #[traced_test]
    fn test_log_outcome_failure_includes_message() {
        let message = "Assets/Scripts/Player.cs(12,5): error CS1002: ; expected\n";
        log_outcome(&outcome(Some(1), message));
        logs_assert(|lines: &[&str]| {
            match lines.iter().find(|l| l.contains("build failed with exit code 1:")) {
                Some(line) if line.contains("ERROR") => Ok(()),
                Some(line) => Err(format!("not logged at error: {line}")),
                None => Err("failure not logged".to_string()),
            }
        });
        assert!(logs_contain("error CS1002: ; expected"));
    }

    #[test]
    #[traced_test]
    fn test_log_outcome_failure_without_message() {
        log_outcome(&outcome(None, ""));
        logs_assert(|lines: &[&str]| {
            match lines.iter().find(|l| l.contains("build terminated by signal")) {
                Some(line) if line.contains("ERROR") && !line.contains("signal:") => Ok(()),
                Some(line) => Err(format!("unexpected log line: {line}")),
                None => Err("failure not logged".to_string()),
            }
        });
    }

    #[test]
    fn test_runner_rejects_invalid_config() {
        let err = BuildRunner::new(BuilderConfig::default().with_expected_line_count(0))
            .unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_prepare_resolves_executable() {
        let project = tempdir().unwrap();
        let settings = project.path().join("ProjectSettings");
        std::fs::create_dir_all(&settings).unwrap();
        std::fs::write(
            settings.join("ProjectVersion.txt"),
            "m_EditorVersion: 2022.3.10f1\n",
        )
        .unwrap();

        let runner = BuildRunner::new(
            BuilderConfig::default()
                .with_platform(crate::Platform::Linux)
                .with_editor_root("/opt/unity"),
        )
        .unwrap();
        let command = runner
            .prepare(&BuildRequest::new(project.path(), "out", "Builds.Run"))
            .unwrap();

        assert_eq!(
            command.program,
            PathBuf::from("/opt/unity/Hub/Editor/2022.3.10f1/Editor/Unity")
        );
        assert_eq!(command.build_path, project.path().join("out"));
    }

    #[tokio::test]
    async fn test_start_without_version_file_spawns_nothing() {
        let project = tempdir().unwrap();
        let runner = BuildRunner::new(BuilderConfig::default()).unwrap();
        let err = runner
            .start(&BuildRequest::new(project.path(), "out", "Builds.Run"))
            .unwrap_err();
        assert!(matches!(err, BuildError::VersionFileMissing { .. }));
    }

    #[tokio::test]
    async fn test_start_with_missing_editor_is_launch_error() {
        let project = tempdir().unwrap();
        let settings = project.path().join("ProjectSettings");
        std::fs::create_dir_all(&settings).unwrap();
        std::fs::write(
            settings.join("ProjectVersion.txt"),
            "m_EditorVersion: 0.0.0f0\n",
        )
        .unwrap();
        let editors = tempdir().unwrap();

        let runner =
            BuildRunner::new(BuilderConfig::default().with_editor_root(editors.path())).unwrap();
        let err = runner
            .start(&BuildRequest::new(project.path(), "out", "Builds.Run"))
            .unwrap_err();
        assert!(err.is_launch_error(), "unexpected error: {err}");
    }
}
