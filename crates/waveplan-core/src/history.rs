use crate::drift::{Alignment, DriftComponents, DriftResult};
use crate::error::Result;
use crate::paths;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// DriftSnapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftSnapshot {
    pub recorded_at: DateTime<Utc>,
    /// `"all"` or a normalized phase number.
    pub scope: String,
    pub score: u32,
    pub alignment: Alignment,
    pub components: DriftComponents,
    pub uncovered_outcomes: usize,
    pub untraced_plans: usize,
}

impl DriftSnapshot {
    pub fn from_result(scope: impl Into<String>, result: &DriftResult) -> Self {
        Self {
            recorded_at: Utc::now(),
            scope: scope.into(),
            score: result.score,
            alignment: result.alignment,
            components: result.components.clone(),
            uncovered_outcomes: result.signals.uncovered.len(),
            untraced_plans: result.signals.untraced_plans.len(),
        }
    }
}

// ---------------------------------------------------------------------------
// DriftHistory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriftHistory {
    #[serde(default)]
    pub snapshots: Vec<DriftSnapshot>,
}

impl DriftHistory {
    pub fn load(root: &Path) -> Result<Self> {
        crate::io::read_json_or_default(&paths::drift_history_path(root))
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        crate::io::write_json(&paths::drift_history_path(root), self)
    }

    /// Append a snapshot, dropping the oldest entries beyond `max`.
    pub fn push(&mut self, snapshot: DriftSnapshot, max: usize) {
        self.snapshots.push(snapshot);
        if self.snapshots.len() > max {
            let excess = self.snapshots.len() - max;
            self.snapshots.drain(..excess);
        }
    }

    /// Load, append, trim and save in one step.
    pub fn record(root: &Path, snapshot: DriftSnapshot, max: usize) -> Result<Self> {
        let mut history = Self::load(root)?;
        history.push(snapshot, max);
        history.save(root)?;
        Ok(history)
    }

    pub fn latest(&self, scope: &str) -> Option<&DriftSnapshot> {
        self.snapshots.iter().rev().find(|s| s.scope == scope)
    }

    /// How far `score` moved from the latest snapshot of `scope`.
    pub fn change_from_latest(&self, scope: &str, score: u32) -> Option<i64> {
        self.latest(scope)
            .map(|prev| i64::from(score) - i64::from(prev.score))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
