//! Intent drift: how far the planned work has wandered from the desired
//! outcomes in the intent document.
//!
//! The score is 0–100, higher meaning worse alignment, built from four
//! independent signals with fixed weights.

use crate::error::{Result, WaveplanError};
use crate::intent::{validate_outcomes, OutcomeRecord, Priority};
use crate::plan::PlanRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

pub const COVERAGE_GAP_WEIGHT: f64 = 40.0;
pub const OBJECTIVE_MISMATCH_WEIGHT: f64 = 25.0;
pub const FEATURE_CREEP_WEIGHT: f64 = 15.0;
pub const PRIORITY_INVERSION_WEIGHT: f64 = 20.0;

// ---------------------------------------------------------------------------
// Alignment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    Excellent,
    Good,
    Moderate,
    Poor,
}

impl Alignment {
    pub fn from_score(score: u32) -> Self {
        match score {
            0..=15 => Alignment::Excellent,
            16..=35 => Alignment::Good,
            36..=60 => Alignment::Moderate,
            _ => Alignment::Poor,
        }
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Alignment::Excellent => "excellent",
            Alignment::Good => "good",
            Alignment::Moderate => "moderate",
            Alignment::Poor => "poor",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Per-signal scores, each rounded to one decimal place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftComponents {
    pub coverage_gap: f64,
    pub objective_mismatch: f64,
    pub feature_creep: f64,
    pub priority_inversion: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncoveredOutcome {
    pub id: String,
    pub priority: Priority,
    pub text: String,
}

/// A plan reference to an outcome id that the intent document does not define.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidRef {
    pub plan: String,
    pub outcome: String,
}

/// An uncovered P1 outcome while a lower-priority outcome has work against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityInversion {
    pub uncovered: String,
    pub covered: String,
    pub covered_priority: Priority,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftSignals {
    pub uncovered: Vec<UncoveredOutcome>,
    pub untraced_plans: Vec<String>,
    pub invalid_refs: Vec<InvalidRef>,
    pub inversions: Vec<PriorityInversion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftTotals {
    pub outcomes: usize,
    pub covered_outcomes: usize,
    pub plans: usize,
    pub traced_plans: usize,
    pub references: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftResult {
    pub score: u32,
    pub alignment: Alignment,
    pub components: DriftComponents,
    pub signals: DriftSignals,
    pub totals: DriftTotals,
}

// ---------------------------------------------------------------------------
// compute_drift()
// ---------------------------------------------------------------------------

/// Score drift of `plans` against `outcomes`.
///
/// Returns [`WaveplanError::NoOutcomes`] when there is nothing to measure
/// against. Plan ids need not be unique here, so callers scoring several
/// phases together should qualify them first.
pub fn compute_drift(outcomes: &[OutcomeRecord], plans: &[PlanRecord]) -> Result<DriftResult> {
    if outcomes.is_empty() {
        return Err(WaveplanError::NoOutcomes);
    }
    validate_outcomes(outcomes)?;
    for plan in plans {
        plan.validate()?;
    }

    let known: HashSet<&str> = outcomes.iter().map(|o| o.id.as_str()).collect();
    let referenced: HashSet<&str> = plans
        .iter()
        .flat_map(|p| p.outcome_ids.iter().map(|id| id.as_str()))
        .collect();
    let is_covered = |o: &OutcomeRecord| referenced.contains(o.id.as_str());

    let mut signals = DriftSignals::default();

    // 1. Coverage gap, weighted by priority
    let total_weight: u32 = outcomes.iter().map(|o| o.priority.weight()).sum();
    let mut uncovered_weight = 0u32;
    for o in outcomes.iter().filter(|&o| !is_covered(o)) {
        uncovered_weight += o.priority.weight();
        signals.uncovered.push(UncoveredOutcome {
            id: o.id.clone(),
            priority: o.priority,
            text: o.text.clone(),
        });
    }
    let coverage_gap = if total_weight == 0 {
        0.0
    } else {
        COVERAGE_GAP_WEIGHT * f64::from(uncovered_weight) / f64::from(total_weight)
    };

    // 2. Objective mismatch: plans traced to nothing
    signals.untraced_plans = plans
        .iter()
        .filter(|p| p.outcome_ids.is_empty())
        .map(|p| p.id.clone())
        .collect();
    let objective_mismatch = ratio(signals.untraced_plans.len(), plans.len())
        * OBJECTIVE_MISMATCH_WEIGHT;

    // 3. Feature creep: references to outcomes that do not exist
    let mut references = 0usize;
    for plan in plans {
        for id in &plan.outcome_ids {
            references += 1;
            if !known.contains(id.as_str()) {
                signals.invalid_refs.push(InvalidRef {
                    plan: plan.id.clone(),
                    outcome: id.clone(),
                });
            }
        }
    }
    let feature_creep = ratio(signals.invalid_refs.len(), references) * FEATURE_CREEP_WEIGHT;

    // 4. Priority inversion: binary score, every pair reported
    for high in outcomes
        .iter()
        .filter(|&o| o.priority == Priority::P1 && !is_covered(o))
    {
        for low in outcomes
            .iter()
            .filter(|&o| o.priority != Priority::P1 && is_covered(o))
        {
            signals.inversions.push(PriorityInversion {
                uncovered: high.id.clone(),
                covered: low.id.clone(),
                covered_priority: low.priority,
            });
        }
    }
    let priority_inversion = if signals.inversions.is_empty() {
        0.0
    } else {
        PRIORITY_INVERSION_WEIGHT
    };

    let raw = coverage_gap + objective_mismatch + feature_creep + priority_inversion;
    let score = raw.clamp(0.0, 100.0).round() as u32;

    let totals = DriftTotals {
        outcomes: outcomes.len(),
        covered_outcomes: outcomes.len() - signals.uncovered.len(),
        plans: plans.len(),
        traced_plans: plans.len() - signals.untraced_plans.len(),
        references,
    };

    tracing::debug!(score, outcomes = totals.outcomes, plans = totals.plans, "drift computed");

    Ok(DriftResult {
        score,
        alignment: Alignment::from_score(score),
        components: DriftComponents {
            coverage_gap: round1(coverage_gap),
            objective_mismatch: round1(objective_mismatch),
            feature_creep: round1(feature_creep),
            priority_inversion: round1(priority_inversion),
        },
        signals,
        totals,
    })
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
