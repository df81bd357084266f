use crate::error::Result;
use crate::intent::validate_outcome_id;
use crate::paths;
use crate::plan::normalize_plan_id;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// TraceStore
// ---------------------------------------------------------------------------

/// Plan → outcome links kept outside the plan files, keyed by normalized
/// phase number and bare plan id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceStore {
    #[serde(default)]
    pub phases: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl TraceStore {
    pub fn load(root: &Path) -> Result<Self> {
        crate::io::read_json_or_default(&paths::trace_path(root))
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        crate::io::write_json(&paths::trace_path(root), self)
    }

    pub fn outcomes_for(&self, phase: &str, plan: &str) -> &[String] {
        self.phases
            .get(phase)
            .and_then(|plans| plans.get(plan))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Link a plan to outcomes. Already-present links are skipped; returns
    /// how many were added.
    pub fn link(&mut self, phase: &str, plan: &str, outcomes: &[String]) -> Result<usize> {
        for id in outcomes {
            validate_outcome_id(id)?;
        }
        let phase = paths::normalize_phase(phase)?;
        let entry = self
            .phases
            .entry(phase)
            .or_default()
            .entry(normalize_plan_id(plan))
            .or_default();

        let mut added = 0;
        for id in outcomes {
            if !entry.contains(id) {
                entry.push(id.clone());
                added += 1;
            }
        }
        Ok(added)
    }

    /// Remove one link. Returns `false` if it was not present. Empty plan and
    /// phase entries are pruned.
    pub fn unlink(&mut self, phase: &str, plan: &str, outcome: &str) -> Result<bool> {
        let phase = paths::normalize_phase(phase)?;
        let key = normalize_plan_id(plan);
        let Some(plans) = self.phases.get_mut(&phase) else {
            return Ok(false);
        };
        let Some(links) = plans.get_mut(&key) else {
            return Ok(false);
        };
        let before = links.len();
        links.retain(|id| id != outcome);
        let removed = links.len() < before;
        if links.is_empty() {
            plans.remove(&key);
        }
        if plans.is_empty() {
            self.phases.remove(&phase);
        }
        Ok(removed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
