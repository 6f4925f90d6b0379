//! Parallel Build Core - batch-mode editor build orchestration
//!
//! Launches the game-engine editor as a subprocess and turns its console
//! output into progress estimates and failure diagnostics:
//! - Resolves the editor version from `ProjectSettings/ProjectVersion.txt`
//! - Assembles and spawns the batch-mode editor command
//! - Streams stdout as [`ProgressEvent`]s and captures failure blocks
//! - Reports the exit status once output is drained

pub mod command;
pub mod config;
pub mod editor;
pub mod error;
pub mod lines;
pub mod obs;
pub mod progress;
pub mod runner;
pub mod telemetry;
pub mod version;

// Re-export key types
pub use command::{resolve_build_path, BuildCommand, BuildRequest};
pub use config::BuilderConfig;
pub use editor::{EditorLocator, Platform};
pub use error::{BuildError, Result};
pub use lines::LineReader;
pub use progress::{
    estimate_percentage, OutputParser, ProgressEvent, DEFAULT_EXPECTED_LINE_COUNT,
    FAILURE_SENTINEL,
};
pub use runner::{log_outcome, BuildInvocation, BuildOutcome, BuildRunner, BuildStatus};
pub use telemetry::init_tracing;
pub use version::{ProjectVersion, PROJECT_VERSION_FILE};

/// Parallel Build version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
