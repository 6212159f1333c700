//! Producers of required-asset identities
//!
//! Two strategies decide what the secondary mod must contain: walking every
//! asset of the primary mod, or mining portrait references out of the
//! primary mod's character definition files.

use std::path::{Path, PathBuf};
use regex::Regex;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::ExtractionRules;
use crate::error::{Result, ReconcileError};
use crate::scanner::{CandidateTree, TreeEntry};

/// Every asset file under the primary mod root
#[derive(Debug, Clone)]
pub struct TreeWalkEnumerator {
    tree: CandidateTree,
}

impl TreeWalkEnumerator {
    pub fn new(tree: CandidateTree) -> Self {
        Self { tree }
    }

    /// Lazily yield the required assets; every call starts a fresh walk
    pub fn required(&self) -> impl Iterator<Item = Result<TreeEntry>> + '_ {
        self.tree.entries()
    }
}

/// A portrait value declared in a definition file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortraitReference {
    /// Stem of the definition file that declared the value
    pub owner_stem: String,
    /// Key the value was assigned to (`small`, `large`, ...)
    pub key: String,
    /// Raw quoted value
    pub value: String,
}

impl PortraitReference {
    /// Expand the value into an asset path relative to the mod root.
    ///
    /// Idea icons map to the interface ideas directory, other graphics
    /// references map to the owner's leader directory, and literal paths pass
    /// through unchanged.
    pub fn expand(&self, rules: &ExtractionRules, extension: &str) -> PathBuf {
        if let Some(rest) = self.value.strip_prefix(rules.idea_sentinel.as_str()) {
            rules.ideas_dir.join(format!("{}{}", rest, extension))
        } else if let Some(rest) = self.value.strip_prefix(rules.graphics_sentinel.as_str()) {
            rules
                .leaders_dir
                .join(&self.owner_stem)
                .join(format!("{}{}", rest, extension))
        } else {
            PathBuf::from(&self.value)
        }
    }
}

/// Portrait references mined from `key = "value"` assignments
#[derive(Debug, Clone)]
pub struct TextExtractionEnumerator {
    mod_root: PathBuf,
    rules: ExtractionRules,
    extension: String,
    patterns: Vec<(String, Regex)>,
}

impl TextExtractionEnumerator {
    pub fn new(mod_root: impl Into<PathBuf>, rules: ExtractionRules, extension: &str) -> Result<Self> {
        let patterns = rules
            .keys
            .iter()
            .map(|key| Ok((key.clone(), key_pattern(key)?)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            mod_root: mod_root.into(),
            rules,
            extension: extension.to_string(),
            patterns,
        })
    }

    /// Directory holding the definition files
    pub fn characters_dir(&self) -> PathBuf {
        self.mod_root.join(&self.rules.characters_dir)
    }

    /// Extract references from one file's text, key by key, in file order
    pub fn parse_references(&self, owner_stem: &str, text: &str) -> Vec<PortraitReference> {
        self.patterns
            .iter()
            .flat_map(|(key, pattern)| {
                pattern.captures_iter(text).map(move |captures| PortraitReference {
                    owner_stem: owner_stem.to_string(),
                    key: key.clone(),
                    value: captures[1].to_string(),
                })
            })
            .collect()
    }

    /// Read every definition file and collect its references.
    ///
    /// A missing characters directory is not an error: it is logged and
    /// yields no references.
    pub async fn references(&self) -> Result<Vec<PortraitReference>> {
        let dir = self.characters_dir();
        if !dir.is_dir() {
            warn!("No characters directory at {}", dir.display());
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let mut read_dir = fs::read_dir(&dir).await.map_err(|e| {
            ReconcileError::scan_error(&dir, format!("Failed to list directory: {}", e))
        })?;
        while let Some(entry) = read_dir.next_entry().await? {
            if entry.file_type().await?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();

        let mut references = Vec::new();
        for path in files {
            let bytes = fs::read(&path).await.map_err(|e| {
                ReconcileError::path_error(&path, format!("Failed to read definition file: {}", e))
            })?;
            let text = String::from_utf8_lossy(&bytes);
            let found = self.parse_references(&owner_stem(&path), &text);
            debug!("{} portrait references in {}", found.len(), path.display());
            references.extend(found);
        }

        info!("Extracted {} portrait references from {}", references.len(), dir.display());
        Ok(references)
    }

    /// Absolute expected asset paths under the mod root, duplicates included
    pub async fn expected_paths(&self) -> Result<Vec<PathBuf>> {
        Ok(self
            .references()
            .await?
            .iter()
            .map(|reference| self.mod_root.join(reference.expand(&self.rules, &self.extension)))
            .collect())
    }

    pub fn mod_root(&self) -> &Path {
        &self.mod_root
    }
}

fn key_pattern(key: &str) -> Result<Regex> {
    Regex::new(&format!(r#"\b{}\s*=\s*"([^"]*)""#, regex::escape(key)))
        .map_err(|e| ReconcileError::Pattern(format!("Invalid extraction key '{}': {}", key, e)))
}

fn owner_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
