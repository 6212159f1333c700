//! Counters for a reconciliation run

use std::time::Duration;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Outcome counters and timing for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Unique session identifier
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration: Duration,
    pub assets: AssetStats,
    pub errors: ErrorStats,
}

/// Per-asset outcome counts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetStats {
    /// Required assets enumerated (after deduplication where it applies)
    pub required: usize,
    /// Required assets already present in the target tree
    pub present: usize,
    /// Missing assets for which a substitute was found
    pub resolved: usize,
    /// Missing assets with no acceptable substitute
    pub unresolved: usize,
    /// Files written to output trees
    pub copied: usize,
    /// Copies that had to take a suffixed name
    pub renamed: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorStats {
    pub total_errors: usize,
    /// Errors that stopped the run
    pub critical_errors: Vec<String>,
    /// Per-item errors recorded as unresolved
    pub recoverable_errors: Vec<String>,
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RunMetrics {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            duration: Duration::default(),
            assets: AssetStats::default(),
            errors: ErrorStats::default(),
        }
    }

    pub fn record_required(&mut self) {
        self.assets.required += 1;
    }

    pub fn record_present(&mut self) {
        self.assets.present += 1;
    }

    pub fn record_resolved(&mut self, renamed: bool) {
        self.assets.resolved += 1;
        self.assets.copied += 1;
        if renamed {
            self.assets.renamed += 1;
        }
    }

    pub fn record_unresolved(&mut self) {
        self.assets.unresolved += 1;
    }

    pub fn record_error(&mut self, message: impl Into<String>, is_critical: bool) {
        let message = message.into();
        if is_critical {
            error!(message = %message, "Reconciliation aborted");
            self.errors.critical_errors.push(message);
        } else {
            warn!(message = %message, "Item failed, recorded as unresolved");
            self.errors.recoverable_errors.push(message);
        }
        self.errors.total_errors += 1;
    }

    /// Fold the counters of another run phase into this one
    pub fn merge(&mut self, other: &RunMetrics) {
        self.assets.required += other.assets.required;
        self.assets.present += other.assets.present;
        self.assets.resolved += other.assets.resolved;
        self.assets.unresolved += other.assets.unresolved;
        self.assets.copied += other.assets.copied;
        self.assets.renamed += other.assets.renamed;
        self.errors.total_errors += other.errors.total_errors;
        self.errors.critical_errors.extend(other.errors.critical_errors.iter().cloned());
        self.errors.recoverable_errors.extend(other.errors.recoverable_errors.iter().cloned());
    }

    /// Mark the run as finished and log the totals
    pub fn complete(&mut self) {
        let now = Utc::now();
        self.duration = (now - self.started_at).to_std().unwrap_or_default();
        self.finished_at = Some(now);

        info!(
            session_id = %self.session_id,
            duration_secs = self.duration.as_secs_f64(),
            required = self.assets.required,
            present = self.assets.present,
            resolved = self.assets.resolved,
            unresolved = self.assets.unresolved,
            copied = self.assets.copied,
            renamed = self.assets.renamed,
            errors = self.errors.total_errors,
            "Reconciliation completed"
        );
    }

    /// One-line human readable summary
    pub fn summary(&self) -> String {
        format!(
            "{} required, {} present, {} resolved ({} renamed), {} unresolved, {} errors in {:.2}s",
            self.assets.required,
            self.assets.present,
            self.assets.resolved,
            self.assets.renamed,
            self.assets.unresolved,
            self.errors.total_errors,
            self.duration.as_secs_f64(),
        )
    }
}
