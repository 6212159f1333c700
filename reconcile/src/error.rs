//! Error types for the reconciliation engine

use std::path::PathBuf;

/// Result type alias for reconciliation operations
pub type Result<T> = std::result::Result<T, ReconcileError>;

/// Error type for reconciliation operations.
///
/// Resolver misses are not errors; they surface as `None` and end up in the
/// unresolved report.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Path-related errors
    #[error("Path error at '{path}': {message}")]
    Path { path: PathBuf, message: String },

    /// A file name was normalized against an extension it does not carry
    #[error("'{file_name}' does not end with the extension '{extension}'")]
    MalformedIdentity { file_name: String, extension: String },

    /// Directory walking errors
    #[error("Directory scan error at '{path}': {message}")]
    DirectoryScan { path: PathBuf, message: String },

    /// File copying errors
    #[error("File copy error: {message}")]
    FileCopy { message: String },

    /// Report writing errors
    #[error("Report error at '{path}': {message}")]
    Report { path: PathBuf, message: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Extension filter or extraction pattern errors
    #[error("Pattern error: {0}")]
    Pattern(String),
}

impl ReconcileError {
    /// Create a new path error
    pub fn path_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Path {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new malformed identity error
    pub fn malformed(file_name: impl Into<String>, extension: impl Into<String>) -> Self {
        Self::MalformedIdentity {
            file_name: file_name.into(),
            extension: extension.into(),
        }
    }

    /// Create a new directory scan error
    pub fn scan_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::DirectoryScan {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new file copy error
    pub fn copy_error(
        source: impl AsRef<std::path::Path>,
        dest: impl AsRef<std::path::Path>,
        message: impl Into<String>,
    ) -> Self {
        let full_message = format!(
            "File copy error from '{}' to '{}': {}",
            source.as_ref().display(),
            dest.as_ref().display(),
            message.into()
        );
        Self::FileCopy {
            message: full_message,
        }
    }

    /// Create a new report error
    pub fn report_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Report {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether this error came from the file system rather than from bad input
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::FileCopy { .. } | Self::Report { .. } | Self::DirectoryScan { .. }
        )
    }
}
