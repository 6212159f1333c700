//! Asset tree walking using walkdir

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::{Result, ReconcileError};
use crate::filter::ExtensionFilter;
use crate::identity::AssetIdentity;

/// How a mod tree is walked, configurable under `[scan]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    /// Descend into symlinked directories
    pub follow_links: bool,
    /// Depth limit below the mod root, unlimited when unset
    pub max_depth: Option<usize>,
    /// Visit dot-files and dot-directories
    pub include_hidden: bool,
}

/// An asset file found during a walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Absolute directory containing the file
    pub dir: PathBuf,
    /// Directory relative to the tree root
    pub relative_dir: PathBuf,
    /// File name including the extension
    pub file_name: String,
}

impl TreeEntry {
    /// Absolute path of the file
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    /// Path of the file relative to the tree root
    pub fn relative_path(&self) -> PathBuf {
        self.relative_dir.join(&self.file_name)
    }

    /// Identity of the file for the given extension
    pub fn identity(&self, extension: &str) -> Result<AssetIdentity> {
        AssetIdentity::new(self.relative_dir.clone(), self.file_name.clone(), extension)
    }
}

/// A directory tree searched for assets of one file type.
///
/// Walks are lazy and restartable, and always visit directory entries in
/// lexicographic file-name order so that "first match" is well defined.
#[derive(Debug, Clone)]
pub struct CandidateTree {
    root: PathBuf,
    filter: ExtensionFilter,
    options: ScanOptions,
}

impl CandidateTree {
    /// Create a tree rooted at `root` holding files with `extension`
    pub fn new(root: impl Into<PathBuf>, extension: &str) -> Result<Self> {
        Self::with_options(root, extension, ScanOptions::default())
    }

    /// Create a tree walked with explicit scan options
    pub fn with_options(root: impl Into<PathBuf>, extension: &str, options: ScanOptions) -> Result<Self> {
        Ok(Self::with_filter(root, ExtensionFilter::new(extension)?, options))
    }

    fn with_filter(root: impl Into<PathBuf>, filter: ExtensionFilter, options: ScanOptions) -> Self {
        let filter = filter.with_hidden(options.include_hidden);
        Self {
            root: root.into(),
            filter,
            options,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extension(&self) -> &str {
        self.filter.extension()
    }

    /// Check that the root exists and is a directory
    pub fn ensure_exists(&self) -> Result<()> {
        if !self.root.exists() {
            return Err(ReconcileError::path_error(&self.root, "Directory does not exist"));
        }
        if !self.root.is_dir() {
            return Err(ReconcileError::path_error(&self.root, "Path is not a directory"));
        }
        Ok(())
    }

    /// Lazily walk the tree, yielding every file with the configured extension
    pub fn entries(&self) -> impl Iterator<Item = Result<TreeEntry>> + '_ {
        let mut builder = WalkDir::new(&self.root)
            .follow_links(self.options.follow_links)
            .sort_by_file_name();

        if let Some(max_depth) = self.options.max_depth {
            builder = builder.max_depth(max_depth);
        }

        let include_hidden = self.options.include_hidden;

        builder
            .into_iter()
            .filter_entry(move |entry| include_hidden || entry.depth() == 0 || !is_hidden_name(entry.file_name()))
            .filter_map(move |entry| match entry {
                Ok(entry) => {
                    if !entry.file_type().is_file() {
                        return None;
                    }
                    self.make_entry(entry.path()).transpose()
                }
                Err(e) => Some(Err(ReconcileError::scan_error(
                    &self.root,
                    format!("Walk error: {}", e),
                ))),
            })
    }

    /// Build a TreeEntry for a file, or None when it is not an asset
    fn make_entry(&self, path: &Path) -> Result<Option<TreeEntry>> {
        let relative_path = path.strip_prefix(&self.root).map_err(|e| {
            ReconcileError::path_error(path, format!("Failed to create relative path: {}", e))
        })?;

        if !self.filter.should_include(relative_path) {
            return Ok(None);
        }

        let Some(file_name) = relative_path.file_name().and_then(|name| name.to_str()) else {
            tracing::debug!("Skipping non UTF-8 file name {}", path.display());
            return Ok(None);
        };

        let relative_dir = relative_path.parent().map(Path::to_path_buf).unwrap_or_default();

        Ok(Some(TreeEntry {
            dir: self.root.join(&relative_dir),
            relative_dir,
            file_name: file_name.to_string(),
        }))
    }
}

fn is_hidden_name(name: &std::ffi::OsStr) -> bool {
    name.to_str().map(|name| name.starts_with('.')).unwrap_or(false)
}
