//! Build request and editor command assembly.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// What to build: a project, where to put the output, and which
/// in-editor method performs the build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    /// Project root.
    pub project_path: PathBuf,

    /// Output location; relative paths are taken from the project root.
    pub build_path: PathBuf,

    /// Fully qualified static method, e.g. `Builds.Pipeline.BuildWebGL`.
    pub build_method: String,
}

impl BuildRequest {
    pub fn new(
        project_path: impl Into<PathBuf>,
        build_path: impl Into<PathBuf>,
        build_method: impl Into<String>,
    ) -> Self {
        Self {
            project_path: project_path.into(),
            build_path: build_path.into(),
            build_method: build_method.into(),
        }
    }

    /// Output location joined onto the project root unless already absolute.
    pub fn resolved_build_path(&self) -> PathBuf {
        resolve_build_path(&self.project_path, &self.build_path)
    }
}

/// Join `build_path` onto `project_path` unless it is already absolute.
pub fn resolve_build_path(project_path: &Path, build_path: &Path) -> PathBuf {
    if build_path.is_absolute() {
        build_path.to_path_buf()
    } else {
        project_path.join(build_path)
    }
}

/// Fully assembled editor invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCommand {
    pub program: PathBuf,
    pub project_path: PathBuf,
    pub build_path: PathBuf,
    pub build_method: String,
}

impl BuildCommand {
    /// Assemble the invocation for `request` against `program`.
    pub fn new(program: PathBuf, request: &BuildRequest) -> Self {
        Self {
            program,
            project_path: request.project_path.clone(),
            build_path: request.resolved_build_path(),
            build_method: request.build_method.clone(),
        }
    }

    /// Argument vector passed to the editor, in order.
    pub fn args(&self) -> Vec<OsString> {
        vec![
            "-quit".into(),
            "-batchmode".into(),
            "-projectpath".into(),
            self.project_path.clone().into_os_string(),
            "-logFile".into(),
            "-".into(),
            "-executeMethod".into(),
            self.build_method.clone().into(),
            "-buildpath".into(),
            self.build_path.clone().into_os_string(),
        ]
    }

    /// Single-line rendering with every path double-quoted.
    pub fn command_line(&self) -> String {
        [
            quote(&self.program),
            "-quit".to_string(),
            "-batchmode".to_string(),
            format!("-projectpath {}", quote(&self.project_path)),
            "-logFile -".to_string(),
            format!("-executeMethod {}", self.build_method),
            format!("-buildpath {}", quote(&self.build_path)),
        ]
        .join(" ")
    }
}

fn quote(path: &Path) -> String {
    format!("\"{}\"", path.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_build_path_joins_project() {
        let request = BuildRequest::new("P", "out", "Builder.Build");
        assert_eq!(request.resolved_build_path(), Path::new("P").join("out"));
    }

    #[cfg(unix)]
    #[test]
    fn test_absolute_build_path_unchanged() {
        let request = BuildRequest::new("/work/proj", "/srv/builds/web", "Builder.Build");
        assert_eq!(request.resolved_build_path(), PathBuf::from("/srv/builds/web"));
    }

    #[cfg(windows)]
    #[test]
    fn test_absolute_build_path_unchanged() {
        let request = BuildRequest::new(r"C:\work\proj", r"D:\builds\web", "Builder.Build");
        assert_eq!(request.resolved_build_path(), PathBuf::from(r"D:\builds\web"));
    }

    #[test]
    fn test_args_order() {
        let request = BuildRequest::new("/work/my proj", "Build/WebGL", "Builds.Pipeline.WebGL");
        let command = BuildCommand::new(PathBuf::from("/opt/unity/Editor/Unity"), &request);
        let args: Vec<String> = command
            .args()
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(args[0], "-quit");
        assert_eq!(args[1], "-batchmode");
        assert_eq!(args[2], "-projectpath");
        assert_eq!(args[3], "/work/my proj");
        assert_eq!(&args[4..6], &["-logFile", "-"]);
        assert_eq!(&args[6..8], &["-executeMethod", "Builds.Pipeline.WebGL"]);
        assert_eq!(args[8], "-buildpath");
        assert_eq!(
            PathBuf::from(&args[9]),
            Path::new("/work/my proj").join("Build/WebGL")
        );
    }

    #[test]
    fn test_command_line_quotes_paths() {
        let command = BuildCommand {
            program: PathBuf::from("/Applications/Unity Hub/Unity"),
            project_path: PathBuf::from("/work/my proj"),
            build_path: PathBuf::from("/work/my proj/out"),
            build_method: "Builds.Pipeline.WebGL".to_string(),
        };
        assert_eq!(
            command.command_line(),
            "\"/Applications/Unity Hub/Unity\" -quit -batchmode \
             -projectpath \"/work/my proj\" -logFile - \
             -executeMethod Builds.Pipeline.WebGL -buildpath \"/work/my proj/out\""
        );
    }
}
