//! Run configuration, built once and passed by reference

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ReconcileError};
use crate::identity::{DEFAULT_NOBLE_PARTICLES, DEFAULT_TAIL_LEN};
use crate::scanner::ScanOptions;
use crate::similarity::SimilarityPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Directory holding one subdirectory per mod id
    #[serde(default = "default_game_root")]
    pub game_root: PathBuf,
    /// Asset file extension, including the dot
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Output trees are written to `<game_root>/<output_prefix><mod id>`
    #[serde(default = "default_output_prefix")]
    pub output_prefix: String,
    /// Suffix inserted before the extension for portrait copies that collide
    #[serde(default = "default_portrait_suffix")]
    pub portrait_suffix: String,
    /// Record failed copies as unresolved instead of aborting the run
    #[serde(default)]
    pub continue_on_error: bool,
    /// Resolve against an in-memory index instead of re-walking each tree
    #[serde(default)]
    pub indexed: bool,
    /// How mod trees are walked
    #[serde(default)]
    pub scan: ScanOptions,
    #[serde(default)]
    pub tail: TailSettings,
    #[serde(default)]
    pub reports: ReportPaths,
    #[serde(default)]
    pub extraction: ExtractionRules,
    #[serde(default)]
    pub mods: ModCatalog,
}

/// Settings of the tail-match policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TailSettings {
    #[serde(default = "default_tail_len")]
    pub tail_len: usize,
    #[serde(default = "default_particles")]
    pub noble_particles: Vec<String>,
    #[serde(default = "default_true")]
    pub role_guard: bool,
}

/// Report file locations, relative paths resolved against the game root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPaths {
    #[serde(default = "default_missing_report")]
    pub missing: PathBuf,
    #[serde(default = "default_parsed_report")]
    pub parsed: PathBuf,
    #[serde(default = "default_unresolved_report")]
    pub unresolved: PathBuf,
}

/// Where portrait references live and how their values expand
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRules {
    /// Definition file directory relative to a mod root
    #[serde(default = "default_characters_dir")]
    pub characters_dir: PathBuf,
    /// Keys whose quoted values are portrait references
    #[serde(default = "default_keys")]
    pub keys: Vec<String>,
    #[serde(default = "default_idea_sentinel")]
    pub idea_sentinel: String,
    #[serde(default = "default_graphics_sentinel")]
    pub graphics_sentinel: String,
    #[serde(default = "default_ideas_dir")]
    pub ideas_dir: PathBuf,
    #[serde(default = "default_leaders_dir")]
    pub leaders_dir: PathBuf,
}

/// Symbolic mod tags and the workshop ids they stand for
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModCatalog {
    #[serde(default = "default_tags")]
    pub tags: BTreeMap<String, String>,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            game_root: default_game_root(),
            extension: default_extension(),
            output_prefix: default_output_prefix(),
            portrait_suffix: default_portrait_suffix(),
            continue_on_error: false,
            indexed: false,
            scan: ScanOptions::default(),
            tail: TailSettings::default(),
            reports: ReportPaths::default(),
            extraction: ExtractionRules::default(),
            mods: ModCatalog::default(),
        }
    }
}

impl Default for TailSettings {
    fn default() -> Self {
        Self {
            tail_len: default_tail_len(),
            noble_particles: default_particles(),
            role_guard: true,
        }
    }
}

impl Default for ReportPaths {
    fn default() -> Self {
        Self {
            missing: default_missing_report(),
            parsed: default_parsed_report(),
            unresolved: default_unresolved_report(),
        }
    }
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Self {
            characters_dir: default_characters_dir(),
            keys: default_keys(),
            idea_sentinel: default_idea_sentinel(),
            graphics_sentinel: default_graphics_sentinel(),
            ideas_dir: default_ideas_dir(),
            leaders_dir: default_leaders_dir(),
        }
    }
}

impl Default for ModCatalog {
    fn default() -> Self {
        Self { tags: default_tags() }
    }
}

impl ModCatalog {
    /// Resolve a tag to its id; anything else is taken as a literal id
    pub fn resolve(&self, tag_or_id: &str) -> String {
        self.tags
            .get(tag_or_id)
            .cloned()
            .unwrap_or_else(|| tag_or_id.to_string())
    }

    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().map(String::as_str)
    }
}

impl ReconcileConfig {
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            ReconcileError::path_error(path, format!("Failed to read configuration: {}", e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ReconcileError::Config(e.to_string()))
    }

    pub async fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ReconcileError::Config(e.to_string()))?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !self.extension.starts_with('.') || self.extension.len() < 2 {
            return Err(ReconcileError::Config(format!(
                "Extension must start with a dot: '{}'",
                self.extension
            )));
        }
        if self.tail.tail_len == 0 {
            return Err(ReconcileError::Config("Tail length must be at least 1".to_string()));
        }
        if self.extraction.keys.is_empty() {
            return Err(ReconcileError::Config("At least one extraction key is required".to_string()));
        }
        if self.extraction.graphics_sentinel.is_empty() || self.extraction.idea_sentinel.is_empty() {
            return Err(ReconcileError::Config("Sentinels cannot be empty".to_string()));
        }
        if self.portrait_suffix.is_empty() {
            return Err(ReconcileError::Config("Portrait suffix cannot be empty".to_string()));
        }
        // An empty prefix would put output trees on top of the mods they are built from
        if self.output_prefix.is_empty() {
            return Err(ReconcileError::Config("Output prefix cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Resolve a relative game root against the working directory
    pub fn with_absolute_root(mut self) -> Result<Self> {
        if self.game_root.is_relative() {
            let cwd = std::env::current_dir().map_err(|e| {
                ReconcileError::path_error(&self.game_root, format!("Failed to resolve working directory: {}", e))
            })?;
            self.game_root = cwd
                .join(&self.game_root)
                .components()
                .filter(|component| !matches!(component, Component::CurDir))
                .collect();
        }
        Ok(self)
    }

    /// Root directory of a mod
    pub fn mod_root(&self, mod_id: &str) -> PathBuf {
        self.game_root.join(mod_id)
    }

    /// Root of the output tree for a target mod
    pub fn output_root(&self, mod_id: &str) -> PathBuf {
        self.game_root.join(format!("{}{}", self.output_prefix, mod_id))
    }

    /// Resolve a report path against the game root
    pub fn report_path(&self, path: &Path) -> PathBuf {
        self.game_root.join(path)
    }

    /// Tail policy built from the tail settings
    pub fn tail_policy(&self) -> SimilarityPolicy {
        SimilarityPolicy::Tail {
            tail_len: self.tail.tail_len,
            particles: self.tail.noble_particles.clone(),
            role_guard: self.tail.role_guard,
        }
    }
}

// Default value functions
fn default_game_root() -> PathBuf { PathBuf::from(".") }
fn default_extension() -> String { ".dds".to_string() }
fn default_output_prefix() -> String { "diff".to_string() }
fn default_portrait_suffix() -> String { "_alt".to_string() }
fn default_true() -> bool { true }

fn default_tail_len() -> usize { DEFAULT_TAIL_LEN }

fn default_particles() -> Vec<String> {
    DEFAULT_NOBLE_PARTICLES.iter().map(|p| p.to_string()).collect()
}

fn default_missing_report() -> PathBuf { PathBuf::from("missing_items.txt") }
fn default_parsed_report() -> PathBuf { PathBuf::from("parsed_items.txt") }
fn default_unresolved_report() -> PathBuf { PathBuf::from("unresolved_items.txt") }

fn default_characters_dir() -> PathBuf { PathBuf::from("common/characters") }
fn default_keys() -> Vec<String> { vec!["small".to_string(), "large".to_string()] }
fn default_idea_sentinel() -> String { "GFX_idea_".to_string() }
fn default_graphics_sentinel() -> String { "GFX_".to_string() }
fn default_ideas_dir() -> PathBuf { PathBuf::from("gfx/interface/ideas") }
fn default_leaders_dir() -> PathBuf { PathBuf::from("gfx/leaders") }

fn default_tags() -> BTreeMap<String, String> {
    [
        ("road_to_56", "820260968"),
        ("road_to_anime", "2129060088"),
        ("anime_history", "1862018480"),
    ]
    .into_iter()
    .map(|(tag, id)| (tag.to_string(), id.to_string()))
    .collect()
}
