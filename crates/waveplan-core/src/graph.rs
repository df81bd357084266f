//! Dependency-graph validation and wave-conflict detection for the plans of
//! one phase.
//!
//! Both analyses are pure functions of their input slice. Input order is
//! significant: it fixes the DFS root order and therefore which cycle gets
//! reported, so the same slice always yields the same report.

use crate::error::Result;
use crate::plan::{normalize_dep_ref, normalize_plan_id, validate_plans, PlanRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Clean,
    IssuesFound,
}

impl Verdict {
    pub fn from_findings(count: usize) -> Self {
        if count == 0 {
            Verdict::Clean
        } else {
            Verdict::IssuesFound
        }
    }

    pub fn is_clean(self) -> bool {
        self == Verdict::Clean
    }

    /// Both halves must be clean for the combined verdict to be clean.
    pub fn and(self, other: Verdict) -> Verdict {
        if self.is_clean() && other.is_clean() {
            Verdict::Clean
        } else {
            Verdict::IssuesFound
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Clean => "clean",
            Verdict::IssuesFound => "issues_found",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Wave conflicts
// ---------------------------------------------------------------------------

/// A file written by more than one plan of the same wave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub wave: u32,
    pub file: String,
    pub plans: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveReport {
    /// Wave number → plan ids in input order.
    pub waves: BTreeMap<u32, Vec<String>>,
    pub conflicts: Vec<Conflict>,
    pub verdict: Verdict,
}

pub fn analyze_wave_conflicts(plans: &[PlanRecord]) -> Result<WaveReport> {
    validate_plans(plans)?;

    let mut by_wave: BTreeMap<u32, Vec<&PlanRecord>> = BTreeMap::new();
    for plan in plans {
        by_wave.entry(plan.wave).or_default().push(plan);
    }

    let mut conflicts = Vec::new();
    for (&wave, members) in &by_wave {
        let mut writers: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for plan in members {
            for file in &plan.files_modified {
                let key = file_key(file);
                if key.is_empty() {
                    continue;
                }
                let list = writers.entry(key).or_default();
                if list.last() != Some(&plan.id) {
                    list.push(plan.id.clone());
                }
            }
        }
        for (file, ids) in writers {
            if ids.len() > 1 {
                conflicts.push(Conflict {
                    wave,
                    file: file.to_string(),
                    plans: ids,
                });
            }
        }
    }

    let waves: BTreeMap<u32, Vec<String>> = by_wave
        .into_iter()
        .map(|(wave, members)| (wave, members.iter().map(|p| p.id.clone()).collect()))
        .collect();

    tracing::debug!(
        plans = plans.len(),
        conflicts = conflicts.len(),
        "wave conflict analysis complete"
    );

    Ok(WaveReport {
        verdict: Verdict::from_findings(conflicts.len()),
        waves,
        conflicts,
    })
}

fn file_key(file: &str) -> &str {
    let file = file.trim();
    file.strip_prefix("./").unwrap_or(file)
}

// ---------------------------------------------------------------------------
// Dependency graph
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GraphIssue {
    /// `cycle` is the traversal path, e.g. `"03 → 05 → 03"`.
    Cycle { cycle: String, plans: Vec<String> },
    /// `dep` is the reference exactly as written on the plan.
    Unreachable { plan: String, dep: String },
    UnnecessarySerialization {
        plan: String,
        wave: u32,
        message: String,
    },
}

impl GraphIssue {
    pub fn kind(&self) -> &'static str {
        match self {
            GraphIssue::Cycle { .. } => "cycle",
            GraphIssue::Unreachable { .. } => "unreachable",
            GraphIssue::UnnecessarySerialization { .. } => "unnecessary_serialization",
        }
    }

    pub fn describe(&self) -> String {
        match self {
            GraphIssue::Cycle { cycle, .. } => format!("dependency cycle: {cycle}"),
            GraphIssue::Unreachable { plan, dep } => {
                format!("plan {plan} depends on '{dep}' which is not in this phase")
            }
            GraphIssue::UnnecessarySerialization { message, .. } => message.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphReport {
    /// Plan id → normalized dependency ids, dangling ones included.
    pub graph: BTreeMap<String, Vec<String>>,
    pub issues: Vec<GraphIssue>,
    pub verdict: Verdict,
}

impl GraphReport {
    pub fn cycles(&self) -> impl Iterator<Item = &GraphIssue> {
        self.issues
            .iter()
            .filter(|i| matches!(i, GraphIssue::Cycle { .. }))
    }
}

pub fn analyze_dependency_graph(plans: &[PlanRecord]) -> Result<GraphReport> {
    validate_plans(plans)?;

    // Keyed by canonical id so `1`, `01` and `03-01` all find plan `01`.
    let mut index: HashMap<String, usize> = HashMap::with_capacity(plans.len());
    for (i, p) in plans.iter().enumerate() {
        index.entry(normalize_plan_id(&p.id)).or_insert(i);
    }

    let mut issues = Vec::new();
    let mut graph = BTreeMap::new();
    let mut edges: Vec<Vec<usize>> = Vec::with_capacity(plans.len());

    for plan in plans {
        let mut deps = Vec::with_capacity(plan.depends_on.len());
        let mut known = Vec::new();
        for raw in &plan.depends_on {
            match index.get(&normalize_plan_id(raw)) {
                Some(&i) => {
                    known.push(i);
                    deps.push(plans[i].id.clone());
                }
                None => {
                    issues.push(GraphIssue::Unreachable {
                        plan: plan.id.clone(),
                        dep: raw.clone(),
                    });
                    deps.push(normalize_dep_ref(raw).to_string());
                }
            }
        }
        graph.insert(plan.id.clone(), deps);
        edges.push(known);
    }

    for cycle in find_cycles(&edges) {
        let ids: Vec<&str> = cycle.iter().map(|&i| plans[i].id.as_str()).collect();
        let members = ids[..ids.len() - 1].iter().map(|s| s.to_string()).collect();
        issues.push(GraphIssue::Cycle {
            cycle: ids.join(" → "),
            plans: members,
        });
    }

    for plan in plans {
        if plan.wave > 1 && plan.depends_on.is_empty() {
            issues.push(GraphIssue::UnnecessarySerialization {
                plan: plan.id.clone(),
                wave: plan.wave,
                message: format!(
                    "plan {} is in wave {} but has no dependencies; it could run in wave 1",
                    plan.id, plan.wave
                ),
            });
        }
    }

    tracing::debug!(
        plans = plans.len(),
        issues = issues.len(),
        "dependency graph analysis complete"
    );

    Ok(GraphReport {
        verdict: Verdict::from_findings(issues.len()),
        graph,
        issues,
    })
}

// ---------------------------------------------------------------------------
// Cycle search
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq)]
enum Color {
    White,
    Gray,
    Black,
}

struct CycleSearch<'a> {
    edges: &'a [Vec<usize>],
    color: Vec<Color>,
    stack: Vec<usize>,
}

impl<'a> CycleSearch<'a> {
    fn visit(&mut self, node: usize) -> Option<Vec<usize>> {
        self.color[node] = Color::Gray;
        self.stack.push(node);

        let edges = self.edges;
        for &dep in &edges[node] {
            match self.color[dep] {
                Color::Gray => {
                    if let Some(start) = self.stack.iter().position(|&n| n == dep) {
                        let mut cycle = self.stack[start..].to_vec();
                        cycle.push(dep);
                        return Some(cycle);
                    }
                }
                Color::White => {
                    if let Some(cycle) = self.visit(dep) {
                        return Some(cycle);
                    }
                }
                Color::Black => {}
            }
        }

        self.stack.pop();
        self.color[node] = Color::Black;
        None
    }
}

/// One cycle per DFS root, each closed by repeating its first node.
///
/// When a root's search stops at a cycle, the nodes still on the stack are
/// retired as black so later roots cannot mistake them for back edges.
fn find_cycles(edges: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let mut search = CycleSearch {
        edges,
        color: vec![Color::White; edges.len()],
        stack: Vec::new(),
    };
    let mut cycles = Vec::new();
    for root in 0..edges.len() {
        if search.color[root] != Color::White {
            continue;
        }
        if let Some(cycle) = search.visit(root) {
            cycles.push(cycle);
        }
        for node in search.stack.drain(..) {
            search.color[node] = Color::Black;
        }
    }
    cycles
}

// ---------------------------------------------------------------------------
// Combined phase analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseAnalysis {
    pub waves: WaveReport,
    pub dependencies: GraphReport,
    pub verdict: Verdict,
}

pub fn analyze_phase(plans: &[PlanRecord]) -> Result<PhaseAnalysis> {
    let waves = analyze_wave_conflicts(plans)?;
    let dependencies = analyze_dependency_graph(plans)?;
    Ok(PhaseAnalysis {
        verdict: waves.verdict.and(dependencies.verdict),
        waves,
        dependencies,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
