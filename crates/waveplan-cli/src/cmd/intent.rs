use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;
use waveplan_core::{
    config::Config,
    drift::{compute_drift, DriftResult},
    history::{DriftHistory, DriftSnapshot},
    intent::Intent,
    paths,
    plan::{list_phases, load_phase_plans, normalize_plan_id, PlanRecord},
    trace::TraceStore,
    WaveplanError,
};

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum IntentSubcommand {
    /// Show the objective and desired outcomes
    Show,

    /// Score how far the plans have drifted from the desired outcomes
    Drift {
        /// Limit to one phase (default: every phase)
        phase: Option<String>,
        /// Append the result to the drift history
        #[arg(long)]
        record: bool,
    },

    /// Link a plan to one or more outcomes
    Trace {
        phase: String,
        plan: String,
        /// Outcome ids (DO-1 DO-2 ...)
        #[arg(required = true)]
        outcomes: Vec<String>,
    },

    /// Remove a plan → outcome link
    Untrace {
        phase: String,
        plan: String,
        outcome: String,
    },

    /// Show recorded drift snapshots
    History {
        /// Only snapshots for this scope ("all" or a phase number)
        #[arg(long)]
        scope: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: IntentSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        IntentSubcommand::Show => show(root, json),
        IntentSubcommand::Drift { phase, record } => drift(root, phase.as_deref(), record, json),
        IntentSubcommand::Trace {
            phase,
            plan,
            outcomes,
        } => trace(root, &phase, &plan, &outcomes, json),
        IntentSubcommand::Untrace {
            phase,
            plan,
            outcome,
        } => untrace(root, &phase, &plan, &outcome, json),
        IntentSubcommand::History { scope } => history(root, scope.as_deref(), json),
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(root: &Path, json: bool) -> anyhow::Result<()> {
    let intent = Intent::load(root).context("failed to load intent")?;

    if json {
        return print_json(&intent);
    }

    if let Some(title) = &intent.title {
        println!("{title}");
        println!();
    }
    if let Some(objective) = &intent.objective {
        println!("Objective:");
        for line in objective.lines() {
            println!("  {line}");
        }
        println!();
    }
    if intent.outcomes.is_empty() {
        println!("No desired outcomes defined.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = intent
        .outcomes
        .iter()
        .map(|o| vec![o.id.clone(), o.priority.to_string(), o.text.clone()])
        .collect();
    print_table(&["ID", "PRIORITY", "OUTCOME"], rows);
    Ok(())
}

// ---------------------------------------------------------------------------
// drift
// ---------------------------------------------------------------------------

fn drift(root: &Path, phase: Option<&str>, record: bool, json: bool) -> anyhow::Result<()> {
    let config = Config::load_or_default(root).context("failed to load config")?;
    let intent = Intent::load(root).context("failed to load intent")?;
    let (scope, plans) = collect_plans(root, phase)?;

    let result = match compute_drift(&intent.outcomes, &plans) {
        Ok(r) => r,
        Err(WaveplanError::NoOutcomes) => {
            if json {
                print_json(&serde_json::json!({
                    "status": "no_outcomes",
                    "scope": scope,
                    "message": "no outcomes defined",
                }))?;
            } else {
                println!(
                    "No desired outcomes defined in {}. Add bullets like \
                     '- DO-1 [P1]: ...' under '## Desired Outcomes'.",
                    paths::INTENT_FILE
                );
            }
            return Ok(());
        }
        Err(e) => return Err(e).context("drift scoring failed"),
    };

    let mut history = DriftHistory::load(root).context("failed to load drift history")?;
    let change = history.change_from_latest(&scope, result.score);

    if record || config.drift.record_history {
        if config.drift.max_history == 0 {
            tracing::warn!("drift.max_history is 0; snapshot not recorded");
        } else {
            history = DriftHistory::record(
                root,
                DriftSnapshot::from_result(&scope, &result),
                config.drift.max_history,
            )
            .context("failed to record drift snapshot")?;
            tracing::debug!(snapshots = history.snapshots.len(), "drift snapshot recorded");
        }
    }

    if json {
        return print_json(&serde_json::json!({
            "status": "ok",
            "scope": scope,
            "change": change,
            "result": result,
        }));
    }

    print_drift(&scope, &result, change);
    Ok(())
}

/// Plans for one phase, or for every phase with ids qualified as
/// `<phase>-<plan>` so they stay unique.
fn collect_plans(root: &Path, phase: Option<&str>) -> anyhow::Result<(String, Vec<PlanRecord>)> {
    if let Some(phase) = phase {
        let loaded = load_phase_plans(root, phase)
            .with_context(|| format!("failed to load phase '{phase}'"))?;
        return Ok((loaded.phase, loaded.plans));
    }

    let mut plans = Vec::new();
    for p in list_phases(root).context("failed to list phases")? {
        let loaded = load_phase_plans(root, &p.number)
            .with_context(|| format!("failed to load phase {}", p.number))?;
        plans.extend(loaded.plans.into_iter().map(|mut plan| {
            plan.id = format!("{}-{}", loaded.phase, plan.id);
            plan
        }));
    }
    Ok(("all".to_string(), plans))
}

fn print_drift(scope: &str, result: &DriftResult, change: Option<i64>) {
    let label = if scope == "all" {
        "all phases".to_string()
    } else {
        format!("phase {scope}")
    };
    println!(
        "Intent drift ({label}): {}/100 ({})",
        result.score, result.alignment
    );
    if let Some(change) = change {
        println!("  change since last snapshot: {change:+}");
    }

    let c = &result.components;
    println!("  coverage gap        {:>5.1} / 40", c.coverage_gap);
    println!("  objective mismatch  {:>5.1} / 25", c.objective_mismatch);
    println!("  feature creep       {:>5.1} / 15", c.feature_creep);
    println!("  priority inversion  {:>5.1} / 20", c.priority_inversion);

    let s = &result.signals;
    if !s.uncovered.is_empty() {
        println!("Uncovered outcomes:");
        for o in &s.uncovered {
            println!("  {} [{}] {}", o.id, o.priority, o.text);
        }
    }
    if !s.untraced_plans.is_empty() {
        println!("Untraced plans: {}", s.untraced_plans.join(", "));
    }
    if !s.invalid_refs.is_empty() {
        println!("Unknown outcome references:");
        for r in &s.invalid_refs {
            println!("  plan {} -> {}", r.plan, r.outcome);
        }
    }
    if !s.inversions.is_empty() {
        println!("Priority inversions:");
        for i in &s.inversions {
            println!(
                "  {} (P1) is uncovered while {} ({}) has work",
                i.uncovered, i.covered, i.covered_priority
            );
        }
    }
}

// ---------------------------------------------------------------------------
// trace / untrace
// ---------------------------------------------------------------------------

fn trace(
    root: &Path,
    phase: &str,
    plan: &str,
    outcomes: &[String],
    json: bool,
) -> anyhow::Result<()> {
    let loaded =
        load_phase_plans(root, phase).with_context(|| format!("failed to load phase '{phase}'"))?;
    let plan_id = normalize_plan_id(plan);
    if !loaded.plans.iter().any(|p| p.id == plan_id) {
        anyhow::bail!("plan '{plan_id}' not found in phase {}", loaded.phase);
    }

    match Intent::load(root) {
        Ok(intent) => {
            for id in outcomes {
                if intent.outcome(id).is_none() {
                    tracing::warn!(outcome = %id, "outcome is not defined in the intent document");
                }
            }
        }
        Err(e) => tracing::warn!(error = %e, "could not check outcomes against intent"),
    }

    let mut store = TraceStore::load(root).context("failed to load trace store")?;
    let added = store
        .link(&loaded.phase, &plan_id, outcomes)
        .context("failed to link outcomes")?;
    store.save(root).context("failed to save trace store")?;

    let linked = store.outcomes_for(&loaded.phase, &plan_id);
    if json {
        print_json(&serde_json::json!({
            "phase": loaded.phase,
            "plan": plan_id,
            "added": added,
            "outcomes": linked,
        }))?;
    } else {
        println!(
            "Plan {}-{} traced to {} ({} new).",
            loaded.phase,
            plan_id,
            linked.join(", "),
            added
        );
    }
    Ok(())
}

fn untrace(root: &Path, phase: &str, plan: &str, outcome: &str, json: bool) -> anyhow::Result<()> {
    let mut store = TraceStore::load(root).context("failed to load trace store")?;
    let removed = store
        .unlink(phase, plan, outcome)
        .context("failed to unlink outcome")?;
    if removed {
        store.save(root).context("failed to save trace store")?;
    }

    if json {
        print_json(&serde_json::json!({ "removed": removed }))?;
    } else if removed {
        println!("Removed link {plan} -> {outcome}.");
    } else {
        println!("No link {plan} -> {outcome} in phase {phase}.");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// history
// ---------------------------------------------------------------------------

fn history(root: &Path, scope: Option<&str>, json: bool) -> anyhow::Result<()> {
    let history = DriftHistory::load(root).context("failed to load drift history")?;
    let snapshots: Vec<&DriftSnapshot> = history
        .snapshots
        .iter()
        .filter(|s| scope.map_or(true, |want| s.scope == want))
        .collect();

    if json {
        return print_json(&snapshots);
    }
    if snapshots.is_empty() {
        println!("No drift snapshots recorded.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = snapshots
        .iter()
        .map(|s| {
            vec![
                s.recorded_at.format("%Y-%m-%d %H:%M").to_string(),
                s.scope.clone(),
                s.score.to_string(),
                s.alignment.to_string(),
            ]
        })
        .collect();
    print_table(&["RECORDED", "SCOPE", "SCORE", "ALIGNMENT"], rows);
    Ok(())
}
