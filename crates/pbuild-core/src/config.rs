//! Builder configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::editor::{EditorLocator, Platform};
use crate::error::BuildError;
use crate::progress::DEFAULT_EXPECTED_LINE_COUNT;
use crate::Result;

/// Settings shared by every build a [`crate::BuildRunner`] starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BuilderConfig {
    /// Lines a typical successful build prints; progress reaches 100% here.
    pub expected_line_count: u64,

    /// Install layout to resolve the editor with.
    pub platform: Platform,

    /// Overrides the platform's default install root.
    pub editor_root: Option<PathBuf>,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            expected_line_count: DEFAULT_EXPECTED_LINE_COUNT,
            platform: Platform::current(),
            editor_root: None,
        }
    }
}

impl BuilderConfig {
    pub fn with_expected_line_count(mut self, expected_line_count: u64) -> Self {
        self.expected_line_count = expected_line_count;
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_editor_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.editor_root = Some(root.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.expected_line_count == 0 {
            return Err(BuildError::InvalidConfig(
                "expected_line_count must be greater than zero".to_string(),
            ));
        }
        if let Some(root) = &self.editor_root {
            if root.as_os_str().is_empty() {
                return Err(BuildError::InvalidConfig(
                    "editor_root must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Editor locator honouring the root override.
    pub fn locator(&self) -> EditorLocator {
        match &self.editor_root {
            Some(root) => EditorLocator::with_root(self.platform, root.clone()),
            None => EditorLocator::new(self.platform),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BuilderConfig::default();
        assert_eq!(config.expected_line_count, 3108);
        assert_eq!(config.platform, Platform::current());
        assert!(config.editor_root.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_line_count_rejected() {
        let err = BuilderConfig::default()
            .with_expected_line_count(0)
            .validate()
            .unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_empty_root_rejected() {
        let config = BuilderConfig::default().with_editor_root("");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_locator_uses_override() {
        let config = BuilderConfig::default()
            .with_platform(Platform::Linux)
            .with_editor_root("/srv/editors");
        assert_eq!(
            config.locator().executable("2022.3.1f1"),
            PathBuf::from("/srv/editors/Hub/Editor/2022.3.1f1/Editor/Unity")
        );
    }

    #[test]
    fn test_deserialize_partial() {
        let config: BuilderConfig =
            serde_json::from_str(r#"{"expected_line_count": 500, "platform": "macos"}"#).unwrap();
        assert_eq!(config.expected_line_count, 500);
        assert_eq!(config.platform, Platform::Macos);
        assert!(config.editor_root.is_none());
    }
}
