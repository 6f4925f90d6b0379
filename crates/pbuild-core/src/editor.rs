//! Editor installation layout.
//!
//! Editors installed through the Hub live under
//! `<root>/Hub/Editor/<version>/`, with a platform-specific executable
//! path below that directory.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Host platform, selecting the install layout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Windows,
    Macos,
    Linux,
}

impl Platform {
    /// Platform this binary was compiled for. Unknown targets use the Linux layout.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::Macos
        } else {
            Platform::Linux
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::Macos => "macos",
            Platform::Linux => "linux",
        }
    }

    /// Default install root for the Hub.
    pub fn default_root(&self) -> PathBuf {
        match self {
            Platform::Windows => PathBuf::from(r"C:\Program Files\Unity"),
            Platform::Macos => PathBuf::from("/Applications/Unity"),
            Platform::Linux => std::env::var_os("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("/opt"))
                .join("Unity"),
        }
    }

    /// Path segments from the version directory to the executable.
    fn executable_segments(&self) -> &'static [&'static str] {
        match self {
            Platform::Windows => &["Editor", "Unity.exe"],
            Platform::Macos => &["Unity.app", "Contents", "MacOS", "Unity"],
            Platform::Linux => &["Editor", "Unity"],
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Platform::current()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "windows" | "win" => Ok(Platform::Windows),
            "macos" | "osx" | "mac" => Ok(Platform::Macos),
            "linux" => Ok(Platform::Linux),
            other => Err(format!("unknown platform: {other}")),
        }
    }
}

/// Resolves editor executables for a given version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorLocator {
    platform: Platform,
    root: PathBuf,
}

impl EditorLocator {
    /// Locator rooted at the platform's default install location.
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            root: platform.default_root(),
        }
    }

    /// Locator rooted at an explicit install location.
    pub fn with_root(platform: Platform, root: impl Into<PathBuf>) -> Self {
        Self {
            platform,
            root: root.into(),
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding a specific editor version.
    pub fn version_dir(&self, editor_version: &str) -> PathBuf {
        self.root.join("Hub").join("Editor").join(editor_version)
    }

    /// Executable for `editor_version`. The version is used verbatim.
    pub fn executable(&self, editor_version: &str) -> PathBuf {
        let mut path = self.version_dir(editor_version);
        for segment in self.platform.executable_segments() {
            path.push(segment);
        }
        path
    }
}
