//! Error types for build orchestration.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while preparing, launching, or driving a build.
///
/// A build that runs to completion and exits non-zero is *not* an error;
/// it is reported through [`crate::BuildOutcome`].
#[derive(Error, Debug)]
pub enum BuildError {
    /// The project version file could not be read.
    #[error("project version file not found at {}: {source}", path.display())]
    VersionFileMissing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The project version file was read but did not yield an editor version.
    #[error("malformed project version file {}: {reason}", path.display())]
    VersionFileMalformed { path: PathBuf, reason: String },

    /// Builder configuration rejected before anything was spawned.
    #[error("invalid builder configuration: {0}")]
    InvalidConfig(String),

    /// The editor executable could not be started.
    #[error("failed to launch {}: {source}", program.display())]
    ProcessLaunch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading the build's stdout failed mid-stream.
    #[error("failed to read build output: {0}")]
    Output(#[source] std::io::Error),

    /// The kill signal could not be delivered.
    #[error("failed to terminate build process: {0}")]
    Terminate(#[source] std::io::Error),

    /// Reaping the build process failed.
    #[error("failed to wait for build process: {0}")]
    Wait(#[source] std::io::Error),
}

impl BuildError {
    /// Whether this error stems from project metadata or builder settings.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            BuildError::VersionFileMissing { .. }
                | BuildError::VersionFileMalformed { .. }
                | BuildError::InvalidConfig(_)
        )
    }

    /// Whether the editor executable failed to start.
    pub fn is_launch_error(&self) -> bool {
        matches!(self, BuildError::ProcessLaunch { .. })
    }
}

/// Result type for build orchestration.
pub type Result<T> = std::result::Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let missing = BuildError::VersionFileMissing {
            path: PathBuf::from("ProjectSettings/ProjectVersion.txt"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(missing.is_configuration_error());
        assert!(!missing.is_launch_error());

        let launch = BuildError::ProcessLaunch {
            program: PathBuf::from("/nowhere/Unity"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(launch.is_launch_error());
        assert!(!launch.is_configuration_error());

        assert!(BuildError::InvalidConfig("zero".to_string()).is_configuration_error());
    }

    #[test]
    fn test_display_includes_path() {
        let err = BuildError::VersionFileMalformed {
            path: PathBuf::from("/proj/ProjectSettings/ProjectVersion.txt"),
            reason: "missing m_EditorVersion".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/proj/ProjectSettings/ProjectVersion.txt"));
        assert!(msg.contains("missing m_EditorVersion"));
    }
}
