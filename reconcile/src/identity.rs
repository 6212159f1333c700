//! Asset identities: extension stripping and canonical name tails

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ReconcileError};
use crate::role::Role;

/// Surname particles that bind to the following token ("von_Bismarck")
pub const DEFAULT_NOBLE_PARTICLES: &[&str] = &["von", "van", "de", "ter", "du"];

/// Default number of trailing tokens compared by the tail policy
pub const DEFAULT_TAIL_LEN: usize = 2;

/// Check whether `file_name` carries `extension` (ASCII case-insensitive)
pub fn has_extension(file_name: &str, extension: &str) -> bool {
    extension_start(file_name, extension).is_some()
}

fn extension_start(file_name: &str, extension: &str) -> Option<usize> {
    let start = file_name.len().checked_sub(extension.len())?;
    if !file_name.is_char_boundary(start) {
        return None;
    }
    file_name[start..]
        .eq_ignore_ascii_case(extension)
        .then_some(start)
}

/// Strip exactly the trailing `extension` from `file_name`.
///
/// Callers are expected to pre-filter by extension; a name without it is a
/// [`ReconcileError::MalformedIdentity`].
pub fn normalize<'a>(file_name: &'a str, extension: &str) -> Result<&'a str> {
    extension_start(file_name, extension)
        .map(|start| &file_name[..start])
        .ok_or_else(|| ReconcileError::malformed(file_name, extension))
}

/// Join the last `tail_len` underscore-delimited tokens of `stem`.
///
/// When the token right before the last `tail_len - 1` tokens is a noble
/// particle, the tail grows by one so that `Otto_von_Bismarck` keeps the
/// particle together with the name in front of it.
pub fn canonical_tail<S: AsRef<str>>(stem: &str, tail_len: usize, particles: &[S]) -> String {
    let tokens: Vec<&str> = stem.split('_').collect();
    let mut len = tail_len.max(1);

    if len <= tokens.len() {
        let particle = tokens[tokens.len() - len];
        if particles
            .iter()
            .any(|p| p.as_ref().eq_ignore_ascii_case(particle))
        {
            len += 1;
        }
    }

    let start = tokens.len().saturating_sub(len);
    tokens[start..].join("_")
}

/// Normalized identity of an asset file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetIdentity {
    stem: String,
    key: String,
    relative_dir: PathBuf,
    file_name: String,
}

impl AssetIdentity {
    /// Derive an identity from a directory relative to its mod root and a file name
    pub fn new(
        relative_dir: impl Into<PathBuf>,
        file_name: impl Into<String>,
        extension: &str,
    ) -> Result<Self> {
        let file_name = file_name.into();
        let stem = normalize(&file_name, extension)?.to_string();
        let key = stem.to_lowercase();

        Ok(Self {
            stem,
            key,
            relative_dir: relative_dir.into(),
            file_name,
        })
    }

    /// Derive an identity from an absolute `path` located under `root`
    pub fn from_path(root: &Path, path: &Path, extension: &str) -> Result<Self> {
        let relative = path.strip_prefix(root).map_err(|e| {
            ReconcileError::path_error(path, format!("Failed to create relative path: {}", e))
        })?;
        let file_name = relative
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ReconcileError::path_error(path, "Path has no UTF-8 file name"))?;
        let relative_dir = relative.parent().map(Path::to_path_buf).unwrap_or_default();

        Self::new(relative_dir, file_name, extension)
    }

    /// File name with the extension stripped, original case
    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// Lower-cased stem used for comparisons
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Directory of the asset relative to its mod root
    pub fn relative_dir(&self) -> &Path {
        &self.relative_dir
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Path of the asset relative to its mod root
    pub fn relative_path(&self) -> PathBuf {
        self.relative_dir.join(&self.file_name)
    }

    /// Role encoded in the asset's directory, if any
    pub fn role(&self) -> Option<Role> {
        Role::of_dir(&self.relative_dir)
    }
}
