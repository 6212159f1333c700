//! Asset file filtering using globset

use std::path::Path;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::error::{Result, ReconcileError};

/// Matches asset files by extension, case-insensitively, and skips hidden entries
#[derive(Debug, Clone)]
pub struct ExtensionFilter {
    extension: String,
    set: GlobSet,
    include_hidden: bool,
}

impl ExtensionFilter {
    /// Create a filter for `extension`, with or without the leading dot
    pub fn new(extension: &str) -> Result<Self> {
        let extension = if extension.starts_with('.') {
            extension.to_string()
        } else {
            format!(".{}", extension)
        };

        if extension.len() < 2 {
            return Err(ReconcileError::Pattern(format!(
                "Invalid asset extension '{}'",
                extension
            )));
        }

        let set = Self::build_globset(&[format!("*{}", extension)])?;

        Ok(Self {
            extension,
            set,
            include_hidden: false,
        })
    }

    /// Also accept files and directories starting with a dot
    pub fn with_hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }

    /// The extension including its leading dot
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Check if a path relative to a walk root should be considered at all
    pub fn should_include(&self, relative_path: &Path) -> bool {
        if !self.include_hidden && is_hidden(relative_path) {
            return false;
        }
        relative_path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| self.set.is_match(name))
            .unwrap_or(false)
    }

    fn build_globset(patterns: &[String]) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();

        for pattern in patterns {
            let glob = GlobBuilder::new(pattern)
                .case_insensitive(true)
                .literal_separator(true)
                .build()
                .map_err(|e| {
                    ReconcileError::Pattern(format!("Failed to compile glob '{}': {}", pattern, e))
                })?;
            builder.add(glob);
        }

        builder
            .build()
            .map_err(|e| ReconcileError::Pattern(format!("Failed to build globset: {}", e)))
    }
}

/// Check if any component of a relative path is hidden
fn is_hidden(path: &Path) -> bool {
    path.components().any(|component| {
        component
            .as_os_str()
            .to_str()
            .map(|s| s.starts_with('.') && s != "." && s != "..")
            .unwrap_or(false)
    })
}
