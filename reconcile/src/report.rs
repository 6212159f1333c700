//! Report files produced by a reconciliation run

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

use crate::error::{Result, ReconcileError};
use crate::role::RoleBucket;

/// Render a path with forward slashes
pub fn display_path(path: &Path) -> String {
    let mut out = String::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push_str(&prefix.as_os_str().to_string_lossy()),
            Component::RootDir => out.push('/'),
            other => {
                if !out.is_empty() && !out.ends_with('/') {
                    out.push('/');
                }
                out.push_str(&other.as_os_str().to_string_lossy());
            }
        }
    }
    out
}

/// Append-only "required but absent" list.
///
/// Each line is flushed as soon as it is recorded, so the file is complete
/// up to the last recorded entry however the run ends.
#[derive(Debug)]
pub struct MissingLog {
    path: PathBuf,
    file: File,
    entries: usize,
}

impl MissingLog {
    /// Create (or truncate) the report file
    pub async fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let file = File::create(&path).await.map_err(|e| {
            ReconcileError::report_error(&path, format!("Failed to create report: {}", e))
        })?;
        Ok(Self { path, file, entries: 0 })
    }

    pub async fn record(&mut self, relative_path: &Path) -> Result<()> {
        let line = format!("{}\n", display_path(relative_path));
        self.file.write_all(line.as_bytes()).await.map_err(|e| {
            ReconcileError::report_error(&self.path, format!("Failed to append: {}", e))
        })?;
        self.file.flush().await.map_err(|e| {
            ReconcileError::report_error(&self.path, format!("Failed to flush: {}", e))
        })?;
        self.entries += 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries
    }

    /// Sync the file to disk and release it
    pub async fn close(mut self) -> Result<()> {
        self.file.flush().await?;
        self.file.sync_all().await.map_err(|e| {
            ReconcileError::report_error(&self.path, format!("Failed to sync: {}", e))
        })
    }
}

/// Report partitioned into role sections, written at a checkpoint
#[derive(Debug, Clone, Default)]
pub struct RoleReport {
    buckets: BTreeMap<RoleBucket, Vec<PathBuf>>,
}

impl RoleReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mod-relative asset path to its role section
    pub fn push(&mut self, relative_path: impl Into<PathBuf>) {
        let relative_path = relative_path.into();
        self.buckets
            .entry(RoleBucket::of_path(&relative_path))
            .or_default()
            .push(relative_path);
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn entries(&self, bucket: RoleBucket) -> &[PathBuf] {
        self.buckets.get(&bucket).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every section, each headed by `"\n<role>:\n"`, one entry per line
    pub fn render(&self) -> String {
        let mut out = String::new();
        for bucket in RoleBucket::ALL {
            out.push('\n');
            out.push_str(bucket.label());
            out.push_str(":\n");
            for entry in self.entries(bucket) {
                out.push_str(&display_path(entry));
                out.push('\n');
            }
        }
        out
    }

    pub async fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, self.render()).await.map_err(|e| {
            ReconcileError::report_error(path, format!("Failed to write report: {}", e))
        })
    }
}

impl<P: Into<PathBuf>> Extend<P> for RoleReport {
    fn extend<I: IntoIterator<Item = P>>(&mut self, iter: I) {
        for path in iter {
            self.push(path);
        }
    }
}
