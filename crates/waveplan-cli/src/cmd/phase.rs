use crate::output::{join_or_dash, print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;
use waveplan_core::plan::{list_phases, load_phase_plans};

#[derive(Subcommand)]
pub enum PhaseSubcommand {
    /// List phase directories
    List,
    /// Show the parsed plan records of a phase
    Plans {
        /// Phase number (3, 03, 03.1 or 03-name)
        phase: String,
    },
}

pub fn run(root: &Path, subcmd: PhaseSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        PhaseSubcommand::List => list(root, json),
        PhaseSubcommand::Plans { phase } => plans(root, &phase, json),
    }
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let phases = list_phases(root).context("failed to list phases")?;

    let mut rows = Vec::with_capacity(phases.len());
    let mut items = Vec::with_capacity(phases.len());
    for p in &phases {
        let loaded = load_phase_plans(root, &p.number)
            .with_context(|| format!("failed to load phase {}", p.number))?;
        rows.push(vec![
            p.number.clone(),
            p.name.clone(),
            loaded.plans.len().to_string(),
        ]);
        items.push(serde_json::json!({
            "phase": p.number,
            "dir": p.name,
            "plan_count": loaded.plans.len(),
        }));
    }

    if json {
        return print_json(&items);
    }
    if phases.is_empty() {
        println!("No phases.");
        return Ok(());
    }
    print_table(&["PHASE", "DIRECTORY", "PLANS"], rows);
    Ok(())
}

fn plans(root: &Path, phase: &str, json: bool) -> anyhow::Result<()> {
    let loaded =
        load_phase_plans(root, phase).with_context(|| format!("failed to load phase '{phase}'"))?;

    if json {
        return print_json(&loaded);
    }
    if loaded.plans.is_empty() {
        println!("Phase {} has no plans.", loaded.phase);
        return Ok(());
    }

    println!("Phase {} ({})", loaded.phase, loaded.dir);
    let rows: Vec<Vec<String>> = loaded
        .plans
        .iter()
        .map(|p| {
            vec![
                p.id.clone(),
                p.wave.to_string(),
                join_or_dash(&p.depends_on),
                p.files_modified.len().to_string(),
                join_or_dash(&p.outcome_ids),
            ]
        })
        .collect();
    print_table(&["PLAN", "WAVE", "DEPENDS ON", "FILES", "OUTCOMES"], rows);
    Ok(())
}
