//! Additive output trees: copies never overwrite

use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::info;

use crate::error::{Result, ReconcileError};

/// Where a copied asset ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyOutcome {
    pub destination: PathBuf,
    /// The preferred name was taken and a suffixed name was used
    pub renamed: bool,
}

/// Destination tree for substitute assets
#[derive(Debug, Clone)]
pub struct OutputTree {
    root: PathBuf,
    extension: String,
}

impl OutputTree {
    pub fn new(root: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            root: root.into(),
            extension: extension.to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Copy `source` to `<root>/<relative_dir>/<file_name>`.
    ///
    /// When that name is taken, `suffix` is inserted before the extension; if
    /// the suffixed name is taken as well (or `suffix` is empty) a counter is
    /// appended until a free name is found. Existing files are never touched.
    /// Destinations that would leave the output root are refused.
    pub async fn place(
        &self,
        source: &Path,
        relative_dir: &Path,
        file_name: &str,
        suffix: &str,
    ) -> Result<CopyOutcome> {
        if !is_contained(relative_dir) || !is_plain_name(file_name) {
            return Err(ReconcileError::path_error(
                relative_dir.join(file_name),
                "Destination escapes the output tree",
            ));
        }

        let dir = self.root.join(relative_dir);
        fs::create_dir_all(&dir).await.map_err(|e| {
            ReconcileError::copy_error(source, &dir, format!("Failed to create parent directory: {}", e))
        })?;

        let (destination, renamed) = self.free_name(&dir, file_name, suffix).await?;

        fs::copy(source, &destination).await.map_err(|e| {
            ReconcileError::copy_error(source, &destination, format!("Failed to copy file: {}", e))
        })?;

        info!("Copied {} to {}", source.display(), destination.display());
        Ok(CopyOutcome { destination, renamed })
    }

    async fn free_name(&self, dir: &Path, file_name: &str, suffix: &str) -> Result<(PathBuf, bool)> {
        let preferred = dir.join(file_name);
        if !exists(&preferred).await? {
            return Ok((preferred, false));
        }

        if !suffix.is_empty() {
            let suffixed = dir.join(suffixed_name(file_name, &self.extension, suffix));
            if !exists(&suffixed).await? {
                return Ok((suffixed, true));
            }
        }

        let mut counter = 1usize;
        loop {
            let numbered = dir.join(suffixed_name(
                file_name,
                &self.extension,
                &format!("{}_{}", suffix, counter),
            ));
            if !exists(&numbered).await? {
                return Ok((numbered, true));
            }
            counter += 1;
        }
    }
}

/// Insert `suffix` before the extension of `file_name`
pub fn suffixed_name(file_name: &str, extension: &str, suffix: &str) -> String {
    match crate::identity::normalize(file_name, extension) {
        Ok(stem) => format!("{}{}{}", stem, suffix, &file_name[stem.len()..]),
        Err(_) => format!("{}{}", file_name, suffix),
    }
}

/// Only plain directory names, so joining stays below the base
pub fn is_contained(relative: &Path) -> bool {
    relative
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
}

fn is_plain_name(file_name: &str) -> bool {
    let mut components = Path::new(file_name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

async fn exists(path: &Path) -> Result<bool> {
    fs::try_exists(path)
        .await
        .map_err(|e| ReconcileError::path_error(path, format!("Failed to check existence: {}", e)))
}
