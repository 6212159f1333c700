//! Locating substitute assets in candidate trees
//!
//! The first acceptable candidate in traversal order wins; there is no
//! scoring. [`find_alternative`] re-walks the tree on every call, which costs
//! one full walk per missing asset. [`CandidateIndex`] walks once and answers
//! the same queries from memory with identical results, since it keeps the
//! entries in walk order.

use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::error::Result;
use crate::identity::AssetIdentity;
use crate::scanner::{CandidateTree, TreeEntry};
use crate::similarity::SimilarityPolicy;

/// A substitute found for a required asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub entry: TreeEntry,
    pub identity: AssetIdentity,
}

impl Candidate {
    pub fn path(&self) -> PathBuf {
        self.entry.path()
    }
}

/// Walk `tree` and return the first asset `policy` accepts for `required`
pub fn find_alternative(
    required: &AssetIdentity,
    tree: &CandidateTree,
    policy: &SimilarityPolicy,
) -> Result<Option<Candidate>> {
    for entry in tree.entries() {
        let entry = entry?;
        let identity = entry.identity(tree.extension())?;
        if policy.matches_identity(required, &identity) {
            info!(
                "Found {} as alternative to {}",
                entry.path().display(),
                required.relative_path().display()
            );
            return Ok(Some(Candidate { entry, identity }));
        }
    }

    debug!("No alternative for {} in {}", required.relative_path().display(), tree.root().display());
    Ok(None)
}

/// In-memory view of a candidate tree built from a single walk
#[derive(Debug, Clone)]
pub struct CandidateIndex {
    candidates: Vec<Candidate>,
    by_key: HashMap<String, usize>,
}

impl CandidateIndex {
    /// Walk the tree once and remember every asset in traversal order
    pub fn build(tree: &CandidateTree) -> Result<Self> {
        let mut candidates = Vec::new();
        let mut by_key = HashMap::new();

        for entry in tree.entries() {
            let entry = entry?;
            let identity = entry.identity(tree.extension())?;
            by_key.entry(identity.key().to_string()).or_insert(candidates.len());
            candidates.push(Candidate { entry, identity });
        }

        info!("Indexed {} assets under {}", candidates.len(), tree.root().display());
        Ok(Self { candidates, by_key })
    }

    /// First candidate `policy` accepts for `required`
    pub fn find(&self, required: &AssetIdentity, policy: &SimilarityPolicy) -> Option<&Candidate> {
        let found = if policy.is_exact() {
            self.by_key.get(required.key()).map(|&index| &self.candidates[index])
        } else {
            self.candidates
                .iter()
                .find(|candidate| policy.matches_identity(required, &candidate.identity))
        };

        if let Some(candidate) = found {
            info!(
                "Found {} as alternative to {}",
                candidate.path().display(),
                required.relative_path().display()
            );
        }
        found
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Either resolution strategy behind one interface
#[derive(Debug)]
pub enum Resolver<'a> {
    /// Re-walk the tree for every lookup
    Walk(&'a CandidateTree),
    /// Answer lookups from an index built up front
    Indexed(CandidateIndex),
}

impl<'a> Resolver<'a> {
    pub fn new(tree: &'a CandidateTree, indexed: bool) -> Result<Self> {
        if indexed {
            Ok(Self::Indexed(CandidateIndex::build(tree)?))
        } else {
            Ok(Self::Walk(tree))
        }
    }

    pub fn resolve(&self, required: &AssetIdentity, policy: &SimilarityPolicy) -> Result<Option<Candidate>> {
        match self {
            Self::Walk(tree) => find_alternative(required, tree, policy),
            Self::Indexed(index) => Ok(index.find(required, policy).cloned()),
        }
    }
}
