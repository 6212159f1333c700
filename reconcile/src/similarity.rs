//! Naming-similarity policies used to pick substitute assets

use std::path::Path;
use serde::{Deserialize, Serialize};

use crate::identity::{canonical_tail, AssetIdentity, DEFAULT_NOBLE_PARTICLES, DEFAULT_TAIL_LEN};
use crate::role::Role;

/// Policy deciding whether a candidate asset can stand in for a required one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SimilarityPolicy {
    /// Case-insensitive equality of the full stems
    Exact,
    /// The required stem's tail must appear in the candidate stem
    Tail {
        #[serde(default = "default_tail_len")]
        tail_len: usize,
        #[serde(default = "default_particles")]
        particles: Vec<String>,
        #[serde(default = "default_role_guard")]
        role_guard: bool,
    },
}

impl Default for SimilarityPolicy {
    fn default() -> Self {
        Self::Exact
    }
}

impl SimilarityPolicy {
    /// Tail policy with the default tail length, particles and role guard
    pub fn tail() -> Self {
        Self::Tail {
            tail_len: default_tail_len(),
            particles: default_particles(),
            role_guard: default_role_guard(),
        }
    }

    /// Compare two stems with optional role contexts (mod-relative directories)
    pub fn matches(
        &self,
        required: &str,
        candidate: &str,
        required_dir: Option<&Path>,
        candidate_dir: Option<&Path>,
    ) -> bool {
        match self {
            Self::Exact => required.to_lowercase() == candidate.to_lowercase(),
            Self::Tail { tail_len, particles, role_guard } => {
                if *role_guard && crosses_role(required_dir, candidate_dir) {
                    return false;
                }
                let key = canonical_tail(required, *tail_len, particles).to_lowercase();
                !key.is_empty() && candidate.to_lowercase().contains(&key)
            }
        }
    }

    /// Compare two identities, using their directories as role contexts
    pub fn matches_identity(&self, required: &AssetIdentity, candidate: &AssetIdentity) -> bool {
        self.matches(
            required.stem(),
            candidate.stem(),
            Some(required.relative_dir()),
            Some(candidate.relative_dir()),
        )
    }

    /// Whether equal keys are the only possible matches
    pub fn is_exact(&self) -> bool {
        matches!(self, Self::Exact)
    }
}

/// The candidate sits under a role directory the required asset is not in
fn crosses_role(required_dir: Option<&Path>, candidate_dir: Option<&Path>) -> bool {
    let (Some(required_dir), Some(candidate_dir)) = (required_dir, candidate_dir) else {
        return false;
    };
    match Role::of_dir(candidate_dir) {
        Some(role) => !role.is_named_by(required_dir),
        None => false,
    }
}

fn default_tail_len() -> usize { DEFAULT_TAIL_LEN }

fn default_particles() -> Vec<String> {
    DEFAULT_NOBLE_PARTICLES.iter().map(|p| p.to_string()).collect()
}

fn default_role_guard() -> bool { true }
