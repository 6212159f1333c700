//! Mod Asset Reconciliation Library
//!
//! Finds substitute image assets for a secondary mod that mirrors a primary
//! mod:
//! - Asset identities normalized from file names
//! - Exact and tail-match similarity policies with a role guard
//! - Required assets from tree walks or character definition files
//! - First-match search over candidate trees, optionally indexed
//! - Additive output trees and role-partitioned reports

pub mod config;
pub mod engine;
pub mod enumerator;
pub mod error;
pub mod filter;
pub mod identity;
pub mod metrics;
pub mod output;
pub mod report;
pub mod resolver;
pub mod role;
pub mod scanner;
pub mod similarity;

// Re-export main types and functions
pub use config::{ExtractionRules, ModCatalog, ReconcileConfig, ReportPaths, TailSettings};
pub use engine::{CrawlPass, ModSelection, ReconcileEngine};
pub use enumerator::{PortraitReference, TextExtractionEnumerator, TreeWalkEnumerator};
pub use error::{ReconcileError, Result};
pub use filter::ExtensionFilter;
pub use identity::{canonical_tail, normalize, AssetIdentity};
pub use metrics::RunMetrics;
pub use output::{CopyOutcome, OutputTree};
pub use report::{MissingLog, RoleReport};
pub use resolver::{find_alternative, Candidate, CandidateIndex, Resolver};
pub use role::{Role, RoleBucket};
pub use scanner::{CandidateTree, ScanOptions, TreeEntry};
pub use similarity::SimilarityPolicy;

/// Run the tree-diff crawl for a primary/secondary pair
pub async fn crawl_mods(config: &ReconcileConfig, mods: &ModSelection) -> Result<RunMetrics> {
    ReconcileEngine::new(config)?.run_crawl(mods).await
}

/// Run portrait reconciliation for a primary/secondary pair
pub async fn reconcile_portraits(config: &ReconcileConfig, mods: &ModSelection) -> Result<RunMetrics> {
    ReconcileEngine::new(config)?.run_portraits(mods).await
}

// Test modules
#[cfg(test)]
mod engine_tests;
