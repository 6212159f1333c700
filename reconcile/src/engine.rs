//! Reconciliation engine that orchestrates enumeration, search and copying

use std::collections::BTreeSet;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::{ModCatalog, ReconcileConfig};
use crate::enumerator::{TextExtractionEnumerator, TreeWalkEnumerator};
use crate::error::{Result, ReconcileError};
use crate::identity::AssetIdentity;
use crate::metrics::RunMetrics;
use crate::output::{is_contained, OutputTree};
use crate::report::{MissingLog, RoleReport};
use crate::resolver::{Candidate, Resolver};
use crate::scanner::CandidateTree;
use crate::similarity::SimilarityPolicy;

/// The mods taking part in a run, with tags already resolved to ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModSelection {
    /// Mod defining the required assets
    pub primary: String,
    /// Mod that should provide them; output trees are named after it
    pub secondary: String,
    /// Trees searched for substitutes, in order; starts with the secondary mod
    pub crawl: Vec<String>,
}

impl ModSelection {
    pub fn resolve(catalog: &ModCatalog, primary: &str, secondary: &str, extra_crawl: &[String]) -> Self {
        let secondary = catalog.resolve(secondary);
        let mut crawl = vec![secondary.clone()];
        crawl.extend(extra_crawl.iter().map(|id| catalog.resolve(id)));

        Self {
            primary: catalog.resolve(primary),
            secondary,
            crawl,
        }
    }

    /// First tree searched for substitutes
    pub fn crawl_target(&self) -> &str {
        self.crawl.first().map(String::as_str).unwrap_or(&self.secondary)
    }
}

/// One search of a candidate tree within a tree-diff crawl
#[derive(Debug, Clone)]
pub struct CrawlPass {
    /// Mod id of the tree searched in this pass
    pub target: String,
    pub policy: SimilarityPolicy,
    /// Inserted before the extension when the destination name is taken
    pub suffix: String,
}

impl CrawlPass {
    /// Exact pass against the secondary mod, then one tail pass per crawl target
    pub fn default_passes(config: &ReconcileConfig, mods: &ModSelection) -> Vec<CrawlPass> {
        let mut passes = vec![CrawlPass {
            target: mods.secondary.clone(),
            policy: SimilarityPolicy::Exact,
            suffix: String::new(),
        }];

        passes.extend(mods.crawl.iter().enumerate().map(|(k, target)| CrawlPass {
            target: target.clone(),
            policy: config.tail_policy(),
            suffix: format!("_v{}", k),
        }));

        passes
    }
}

/// Runs the reconciliation workflows with one immutable configuration
pub struct ReconcileEngine {
    config: ReconcileConfig,
}

impl ReconcileEngine {
    /// Validate the configuration and pin the game root to an absolute path
    pub fn new(config: &ReconcileConfig) -> Result<Self> {
        config.validate()?;
        let config = config.clone().with_absolute_root()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Existing tree of a mod, walked with the configured scan options
    fn tree(&self, mod_id: &str) -> Result<CandidateTree> {
        let tree = CandidateTree::with_options(
            self.config.mod_root(mod_id),
            &self.config.extension,
            self.config.scan.clone(),
        )?;
        tree.ensure_exists()?;
        Ok(tree)
    }

    /// Tree-diff crawl with the default passes, writing the missing and
    /// unresolved reports
    pub async fn run_crawl(&self, mods: &ModSelection) -> Result<RunMetrics> {
        let passes = CrawlPass::default_passes(&self.config, mods);
        let mut missing = MissingLog::create(self.config.report_path(&self.config.reports.missing)).await?;
        let mut unresolved = RoleReport::new();

        let mut metrics = self.crawl(mods, &passes, &mut missing, &mut unresolved).await?;
        info!("{} substitutes recorded in the missing report", missing.len());
        missing.close().await?;
        self.write_unresolved(&unresolved).await?;

        metrics.complete();
        Ok(metrics)
    }

    /// Portrait reconciliation, writing the parsed and unresolved reports
    pub async fn run_portraits(&self, mods: &ModSelection) -> Result<RunMetrics> {
        let mut unresolved = RoleReport::new();
        let mut metrics = self.reconcile_portraits(mods, &mut unresolved).await?;
        self.write_unresolved(&unresolved).await?;

        metrics.complete();
        Ok(metrics)
    }

    /// Both workflows; the unresolved report holds the entries of both
    pub async fn run_all(&self, mods: &ModSelection) -> Result<RunMetrics> {
        let passes = CrawlPass::default_passes(&self.config, mods);
        let mut missing = MissingLog::create(self.config.report_path(&self.config.reports.missing)).await?;
        let mut unresolved = RoleReport::new();

        let mut metrics = self.crawl(mods, &passes, &mut missing, &mut unresolved).await?;
        missing.close().await?;

        let portraits = self.reconcile_portraits(mods, &mut unresolved).await?;
        metrics.merge(&portraits);
        self.write_unresolved(&unresolved).await?;

        metrics.complete();
        Ok(metrics)
    }

    /// Walk every asset of the primary mod and fill in the ones the secondary
    /// mod lacks.
    ///
    /// An asset counts as present when the secondary mod has a file at the
    /// same relative path. Missing assets are looked up pass by pass and the
    /// first hit is copied to `<output_prefix><secondary>/` under the
    /// directory it was found in, keeping the required file name.
    pub async fn crawl(
        &self,
        mods: &ModSelection,
        passes: &[CrawlPass],
        missing: &mut MissingLog,
        unresolved: &mut RoleReport,
    ) -> Result<RunMetrics> {
        let extension = self.config.extension.as_str();
        let primary = self.tree(&mods.primary)?;
        let secondary_root = self.config.mod_root(&mods.secondary);

        // One tree (and one index) per distinct target
        let mut targets: Vec<String> = Vec::new();
        for pass in passes {
            if !targets.contains(&pass.target) {
                targets.push(pass.target.clone());
            }
        }
        let trees = targets
            .iter()
            .map(|id| self.tree(id))
            .collect::<Result<Vec<_>>>()?;
        let resolvers = trees
            .iter()
            .map(|tree| Resolver::new(tree, self.config.indexed))
            .collect::<Result<Vec<_>>>()?;
        let slots: Vec<usize> = passes
            .iter()
            .map(|pass| targets.iter().position(|id| id == &pass.target).unwrap_or_default())
            .collect();

        let output = OutputTree::new(self.config.output_root(&mods.secondary), extension);
        let mut metrics = RunMetrics::new();

        info!("Crawl {} against {} pass(es)", mods.primary, passes.len());
        let enumerator = TreeWalkEnumerator::new(primary);

        for entry in enumerator.required() {
            let entry = entry?;
            metrics.record_required();

            if is_file(&secondary_root.join(entry.relative_path())).await {
                debug!("{} already present", entry.relative_path().display());
                metrics.record_present();
                continue;
            }

            let required = entry.identity(extension)?;
            let mut placed = false;

            for (k, (pass, &slot)) in passes.iter().zip(&slots).enumerate() {
                let Some(candidate) = resolvers[slot].resolve(&required, &pass.policy)? else {
                    continue;
                };

                debug!("Pass {} ({}) matched {}", k, pass.target, required.file_name());
                let found_dir = &candidate.entry.relative_dir;
                match self
                    .copy_candidate(&output, &candidate, found_dir, required.file_name(), &pass.suffix)
                    .await
                {
                    Ok(renamed) => {
                        metrics.record_resolved(renamed);
                        missing.record(&required.relative_path()).await?;
                        placed = true;
                    }
                    Err(e) => {
                        self.handle_copy_failure(e, &mut metrics)?;
                    }
                }
                break;
            }

            if !placed {
                metrics.record_unresolved();
                unresolved.push(required.relative_path());
            }
        }

        info!(
            "Crawl of {} finished: {} resolved, {} unresolved",
            mods.primary, metrics.assets.resolved, metrics.assets.unresolved
        );
        Ok(metrics)
    }

    /// Fill in the portraits that the primary mod's character definitions
    /// reference and the secondary mod lacks.
    ///
    /// The deduplicated absent set is written to the parsed report before any
    /// lookup. Hits are copied to `<output_prefix><secondary>/` under the
    /// required directory. References that leave the mod root (absolute
    /// paths, `..` segments) are never looked up and go to the unresolved
    /// report.
    pub async fn reconcile_portraits(
        &self,
        mods: &ModSelection,
        unresolved: &mut RoleReport,
    ) -> Result<RunMetrics> {
        let extension = self.config.extension.as_str();
        let primary_root = self.config.mod_root(&mods.primary);
        let secondary_root = self.config.mod_root(&mods.secondary);
        let mut metrics = RunMetrics::new();

        let enumerator =
            TextExtractionEnumerator::new(&primary_root, self.config.extraction.clone(), extension)?;

        let mut expected = BTreeSet::new();
        let mut escaping = BTreeSet::new();
        for path in enumerator.expected_paths().await? {
            match path.strip_prefix(&primary_root) {
                Ok(relative) if is_contained(relative) => {
                    expected.insert(relative.to_path_buf());
                }
                Ok(relative) => {
                    warn!("Ignoring reference leaving the mod: {}", relative.display());
                    escaping.insert(relative.to_path_buf());
                }
                Err(_) => {
                    warn!("Ignoring reference outside the mod: {}", path.display());
                    escaping.insert(path.clone());
                }
            }
        }
        for path in escaping {
            metrics.record_required();
            metrics.record_unresolved();
            unresolved.push(path);
        }

        let mut absent = BTreeSet::new();
        for relative in expected {
            metrics.record_required();
            if is_file(&secondary_root.join(&relative)).await {
                metrics.record_present();
            } else {
                absent.insert(relative);
            }
        }

        let mut parsed = RoleReport::new();
        parsed.extend(absent.iter().cloned());
        parsed
            .write(&self.config.report_path(&self.config.reports.parsed))
            .await?;
        info!("{} referenced portraits missing from {}", absent.len(), mods.secondary);

        if absent.is_empty() {
            return Ok(metrics);
        }

        let tree = self.tree(mods.crawl_target())?;
        let resolver = Resolver::new(&tree, self.config.indexed)?;
        let policy = self.config.tail_policy();
        let output = OutputTree::new(self.config.output_root(&mods.secondary), extension);

        for relative in absent {
            let relative_dir = relative.parent().map(Path::to_path_buf).unwrap_or_default();
            let file_name = relative
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();

            let required = match AssetIdentity::new(relative_dir.clone(), file_name, extension) {
                Ok(required) => required,
                Err(e) => {
                    warn!("Cannot match {}: {}", relative.display(), e);
                    metrics.record_unresolved();
                    unresolved.push(relative);
                    continue;
                }
            };

            let Some(candidate) = resolver.resolve(&required, &policy)? else {
                metrics.record_unresolved();
                unresolved.push(relative);
                continue;
            };

            match self
                .copy_candidate(
                    &output,
                    &candidate,
                    &relative_dir,
                    required.file_name(),
                    &self.config.portrait_suffix,
                )
                .await
            {
                Ok(renamed) => metrics.record_resolved(renamed),
                Err(e) => {
                    self.handle_copy_failure(e, &mut metrics)?;
                    metrics.record_unresolved();
                    unresolved.push(relative);
                }
            }
        }

        Ok(metrics)
    }

    async fn copy_candidate(
        &self,
        output: &OutputTree,
        candidate: &Candidate,
        relative_dir: &Path,
        file_name: &str,
        suffix: &str,
    ) -> Result<bool> {
        let outcome = output
            .place(&candidate.path(), relative_dir, file_name, suffix)
            .await?;
        Ok(outcome.renamed)
    }

    /// Abort on a failed copy unless the run continues on errors
    fn handle_copy_failure(&self, error: ReconcileError, metrics: &mut RunMetrics) -> Result<()> {
        if self.config.continue_on_error {
            metrics.record_error(error.to_string(), false);
            Ok(())
        } else {
            metrics.record_error(error.to_string(), true);
            Err(error)
        }
    }

    async fn write_unresolved(&self, unresolved: &RoleReport) -> Result<()> {
        let path = self.config.report_path(&self.config.reports.unresolved);
        unresolved.write(&path).await?;
        info!("{} unresolved assets written to {}", unresolved.len(), path.display());
        Ok(())
    }
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|metadata| metadata.is_file())
        .unwrap_or(false)
}
