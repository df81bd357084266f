use crate::output::print_json;
use anyhow::Context;
use clap::{Args, Subcommand};
use serde::Serialize;
use std::path::Path;
use waveplan_core::{
    config::Config,
    graph::{self, GraphReport, Verdict, WaveReport},
    plan::{load_phase_plans, PhasePlans},
};

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct PhaseArgs {
    /// Phase number (3, 03, 03.1 or 03-name)
    phase: String,
    /// Exit non-zero when any issue is found
    #[arg(long)]
    strict: bool,
}

#[derive(Subcommand)]
pub enum ValidateSubcommand {
    /// Group plans by wave and report files written by two plans of one wave
    Waves(PhaseArgs),
    /// Check dependencies for cycles, dangling references and needless waves
    Deps(PhaseArgs),
    /// Run both checks
    All(PhaseArgs),
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: ValidateSubcommand, json: bool) -> anyhow::Result<()> {
    let config = Config::load_or_default(root).context("failed to load config")?;
    let (args, verdict) = match subcmd {
        ValidateSubcommand::Waves(args) => {
            let loaded = load(root, &args.phase)?;
            let report = graph::analyze_wave_conflicts(&loaded.plans)
                .context("wave analysis failed")?;
            if json {
                print_json(&Scoped::new(&loaded, &report))?;
            } else {
                print_waves(&loaded, &report);
                print_verdict(report.verdict);
            }
            (args, report.verdict)
        }
        ValidateSubcommand::Deps(args) => {
            let loaded = load(root, &args.phase)?;
            let report = graph::analyze_dependency_graph(&loaded.plans)
                .context("dependency analysis failed")?;
            if json {
                print_json(&Scoped::new(&loaded, &report))?;
            } else {
                print_deps(&loaded, &report);
                print_verdict(report.verdict);
            }
            (args, report.verdict)
        }
        ValidateSubcommand::All(args) => {
            let loaded = load(root, &args.phase)?;
            let analysis = graph::analyze_phase(&loaded.plans).context("phase analysis failed")?;
            if json {
                print_json(&Scoped::new(&loaded, &analysis))?;
            } else {
                print_waves(&loaded, &analysis.waves);
                println!();
                print_deps(&loaded, &analysis.dependencies);
                print_verdict(analysis.verdict);
            }
            (args, analysis.verdict)
        }
    };

    let strict = args.strict || config.validation.strict;
    if strict && !verdict.is_clean() {
        anyhow::bail!("phase {} failed validation", args.phase);
    }
    Ok(())
}

fn load(root: &Path, phase: &str) -> anyhow::Result<PhasePlans> {
    load_phase_plans(root, phase).with_context(|| format!("failed to load phase '{phase}'"))
}

/// JSON envelope: the report's own fields plus the phase it describes.
#[derive(Serialize)]
struct Scoped<'a, T: Serialize> {
    phase: &'a str,
    plan_count: usize,
    #[serde(flatten)]
    report: &'a T,
}

impl<'a, T: Serialize> Scoped<'a, T> {
    fn new(loaded: &'a PhasePlans, report: &'a T) -> Self {
        Self {
            phase: &loaded.phase,
            plan_count: loaded.plans.len(),
            report,
        }
    }
}

// ---------------------------------------------------------------------------
// Text rendering
// ---------------------------------------------------------------------------

fn print_waves(loaded: &PhasePlans, report: &WaveReport) {
    println!("Phase {} waves:", loaded.phase);
    if report.waves.is_empty() {
        println!("  (no plans)");
    }
    for (wave, ids) in &report.waves {
        println!("  wave {wave}: {}", ids.join(", "));
    }
    if report.conflicts.is_empty() {
        println!("No file conflicts.");
        return;
    }
    println!("File conflicts:");
    for c in &report.conflicts {
        println!("  [wave {}] {}: {}", c.wave, c.file, c.plans.join(", "));
    }
}

fn print_deps(loaded: &PhasePlans, report: &GraphReport) {
    println!("Phase {} dependencies:", loaded.phase);
    for (id, deps) in &report.graph {
        if deps.is_empty() {
            println!("  {id}");
        } else {
            println!("  {id} <- {}", deps.join(", "));
        }
    }
    if report.issues.is_empty() {
        println!("No dependency issues.");
        return;
    }
    println!("Issues:");
    for issue in &report.issues {
        println!("  [{}] {}", issue.kind(), issue.describe());
    }
}

fn print_verdict(verdict: Verdict) {
    println!("Verdict: {verdict}");
}
