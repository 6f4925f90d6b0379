//! Structured observability hooks for the build lifecycle.
//!
//! Events are emitted at `info!` level unless noted (configurable via
//! `RUST_LOG`). Every event carries `invocation_id` so interleaved builds
//! can be told apart.

use std::path::Path;

use tracing::{debug, info, warn};
use uuid::Uuid;

/// Emit event: editor process spawned.
pub fn emit_build_started(
    invocation_id: Uuid,
    program: &Path,
    build_method: &str,
    project_path: &Path,
    pid: Option<u32>,
) {
    info!(
        event = "build.started",
        invocation_id = %invocation_id,
        program = %program.display(),
        build_method = %build_method,
        project = %project_path.display(),
        pid = ?pid,
    );
}

/// Emit event: editor could not be started (warning level).
pub fn emit_launch_failed(program: &Path, error: &dyn std::fmt::Display) {
    warn!(event = "build.launch_failed", program = %program.display(), error = %error);
}

/// Emit event: the failure sentinel was seen at `line_index`.
pub fn emit_failure_block(invocation_id: Uuid, line_index: u64) {
    info!(event = "build.failure_block", invocation_id = %invocation_id, line_index = line_index);
}

/// Emit event: a line the editor wrote to stderr (debug level).
pub fn emit_stderr_line(invocation_id: Uuid, line: &str) {
    debug!(event = "build.stderr", invocation_id = %invocation_id, line = %line);
}

/// Emit event: kill signal sent to the editor (warning level).
pub fn emit_terminated(invocation_id: Uuid) {
    warn!(event = "build.terminated", invocation_id = %invocation_id);
}

/// Emit event: process reaped.
pub fn emit_build_finished(
    invocation_id: Uuid,
    exit_code: Option<i32>,
    line_count: u64,
    duration_ms: u64,
    success: bool,
) {
    info!(
        event = "build.finished",
        invocation_id = %invocation_id,
        exit_code = ?exit_code,
        line_count = line_count,
        duration_ms = duration_ms,
        success = success,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn test_emit_build_started_logs_method() {
        emit_build_started(
            Uuid::new_v4(),
            Path::new("/opt/unity/Editor/Unity"),
            "Builds.Pipeline.WebGL",
            Path::new("/work/proj"),
            Some(4242),
        );
        assert!(logs_contain("build.started"));
        assert!(logs_contain("Builds.Pipeline.WebGL"));
    }

    #[traced_test]
    #[test]
    fn test_emit_build_finished_logs_outcome() {
        emit_build_finished(Uuid::new_v4(), Some(1), 19, 1500, false);
        assert!(logs_contain("build.finished"));
        assert!(logs_contain("success=false"));
    }

    #[traced_test]
    #[test]
    fn test_emit_launch_failed_logs_warning() {
        let error = "No such file or directory";
        emit_launch_failed(Path::new("/missing/Unity"), &error);
        assert!(logs_contain("build.launch_failed"));
        assert!(logs_contain("No such file or directory"));
    }
}
