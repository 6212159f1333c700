//! Character roles encoded in asset directories

use std::fmt;
use std::path::{Component, Path};
use serde::{Deserialize, Serialize};

/// Coarse asset category taken from a directory segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Leaders,
    Ministers,
    Advisors,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Leaders, Role::Ministers, Role::Advisors];

    /// Directory segment naming this role
    pub fn segment(self) -> &'static str {
        match self {
            Role::Leaders => "leaders",
            Role::Ministers => "ministers",
            Role::Advisors => "advisors",
        }
    }

    /// First role named by a directory segment of `dir`.
    ///
    /// `dir` must be relative to the mod root so that the location of the mod
    /// itself cannot leak a role. Segments are compared exactly.
    pub fn of_dir(dir: &Path) -> Option<Role> {
        dir.components().find_map(|component| match component {
            Component::Normal(segment) => {
                let segment = segment.to_str()?;
                Role::ALL.into_iter().find(|role| role.segment() == segment)
            }
            _ => None,
        })
    }

    /// Whether `dir` has a segment naming this role
    pub fn is_named_by(self, dir: &Path) -> bool {
        dir.components()
            .any(|component| component.as_os_str() == self.segment())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

/// Report bucket: one per role plus a catch-all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleBucket {
    Role(Role),
    Misc,
}

impl RoleBucket {
    /// Buckets in report order
    pub const ALL: [RoleBucket; 4] = [
        RoleBucket::Role(Role::Leaders),
        RoleBucket::Role(Role::Ministers),
        RoleBucket::Role(Role::Advisors),
        RoleBucket::Misc,
    ];

    pub fn of_path(path: &Path) -> Self {
        let dir = path.parent().unwrap_or(Path::new(""));
        Role::of_dir(dir).map_or(RoleBucket::Misc, RoleBucket::Role)
    }

    pub fn label(self) -> &'static str {
        match self {
            RoleBucket::Role(role) => role.segment(),
            RoleBucket::Misc => "misc",
        }
    }
}
