//! Project version metadata.
//!
//! Every project declares the editor it was authored with in
//! `ProjectSettings/ProjectVersion.txt`, a small YAML document:
//!
//! ```text
//! m_EditorVersion: 2022.3.10f1
//! m_EditorVersionWithRevision: 2022.3.10f1 (ff3792e53c62)
//! ```

use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tracing::debug;

use crate::error::BuildError;
use crate::Result;

/// Location of the version file, relative to the project root.
pub const PROJECT_VERSION_FILE: &str = "ProjectSettings/ProjectVersion.txt";

const EDITOR_VERSION_KEY: &str = "m_EditorVersion";
const EDITOR_REVISION_KEY: &str = "m_EditorVersionWithRevision";

/// Editor version declared by a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectVersion {
    /// Version string, substituted verbatim into the install path.
    pub editor_version: String,

    /// Version with changeset suffix, when the file carries one.
    pub editor_version_with_revision: Option<String>,
}

impl ProjectVersion {
    /// Path of the version file for a project root.
    pub fn file_path(project_path: &Path) -> PathBuf {
        project_path.join("ProjectSettings").join("ProjectVersion.txt")
    }

    /// Read and parse the version file under `project_path`.
    pub fn load(project_path: &Path) -> Result<Self> {
        let path = Self::file_path(project_path);
        let content = std::fs::read_to_string(&path).map_err(|source| {
            BuildError::VersionFileMissing {
                path: path.clone(),
                source,
            }
        })?;

        let version = Self::parse(&content).map_err(|reason| BuildError::VersionFileMalformed {
            path: path.clone(),
            reason,
        })?;

        debug!(
            path = %path.display(),
            editor_version = %version.editor_version,
            revision = ?version.editor_version_with_revision,
            "Loaded project version"
        );
        Ok(version)
    }

    /// Parse the YAML content of a version file.
    pub fn parse(content: &str) -> std::result::Result<Self, String> {
        let doc: Value = serde_yaml::from_str(content).map_err(|e| e.to_string())?;
        let mapping = doc
            .as_mapping()
            .ok_or_else(|| "expected a key-value document".to_string())?;

        let editor_version = match mapping.get(EDITOR_VERSION_KEY) {
            Some(value) => scalar_to_string(value)
                .ok_or_else(|| format!("{EDITOR_VERSION_KEY} is not a scalar"))?,
            None => return Err(format!("missing {EDITOR_VERSION_KEY}")),
        };
        if editor_version.trim().is_empty() {
            return Err(format!("{EDITOR_VERSION_KEY} is empty"));
        }

        let editor_version_with_revision = mapping
            .get(EDITOR_REVISION_KEY)
            .and_then(scalar_to_string);

        Ok(ProjectVersion {
            editor_version: editor_version.trim().to_string(),
            editor_version_with_revision,
        })
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
