use crate::error::{Result, WaveplanError};
use crate::paths;
use crate::trace::TraceStore;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// PlanRecord
// ---------------------------------------------------------------------------

/// One plan within a phase, as consumed by the graph analyzer and the drift
/// scorer. Built fresh from the plan file on every invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRecord {
    pub id: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    pub wave: u32,
    #[serde(default)]
    pub files_modified: Vec<String>,
    #[serde(default)]
    pub outcome_ids: Vec<String>,
}

impl PlanRecord {
    pub fn new(id: impl Into<String>, wave: u32) -> Self {
        Self {
            id: id.into(),
            depends_on: Vec::new(),
            wave,
            files_modified: Vec::new(),
            outcome_ids: Vec::new(),
        }
    }

    /// Check the record against the input contract.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(WaveplanError::InvalidPlanRecord {
                plan: self.id.clone(),
                reason: "plan id is empty".to_string(),
            });
        }
        if self.wave == 0 {
            return Err(WaveplanError::InvalidPlanRecord {
                plan: self.id.clone(),
                reason: "wave must be 1 or greater".to_string(),
            });
        }
        if self.depends_on.iter().any(|d| d.trim().is_empty()) {
            return Err(WaveplanError::InvalidPlanRecord {
                plan: self.id.clone(),
                reason: "depends_on contains an empty reference".to_string(),
            });
        }
        Ok(())
    }
}

/// Validate every record and reject duplicate ids.
pub fn validate_plans(plans: &[PlanRecord]) -> Result<()> {
    let mut seen = HashSet::new();
    for plan in plans {
        plan.validate()?;
        if !seen.insert(plan.id.as_str()) {
            return Err(WaveplanError::DuplicatePlanId(plan.id.clone()));
        }
    }
    Ok(())
}

static DEP_REF_RE: OnceLock<Regex> = OnceLock::new();

fn dep_ref_re() -> &'static Regex {
    DEP_REF_RE.get_or_init(|| Regex::new(r"(\d+[a-z]?)(?:-PLAN(?:\.md)?)?$").unwrap())
}

/// Reduce a dependency reference to its trailing plan number:
/// `"03-02"`, `"03-02-PLAN"` and `"plan-02"` all become `"02"`. A reference
/// without trailing digits is returned trimmed.
pub fn normalize_dep_ref(dep: &str) -> &str {
    let dep = dep.trim();
    match dep_ref_re().captures(dep).and_then(|c| c.get(1)) {
        Some(m) => m.as_str(),
        None => dep,
    }
}

/// Canonical plan id: `"1"` → `"01"`, `"03-02"` → `"02"`. Plan ids read from
/// file names and dependency lookups both go through this.
pub fn normalize_plan_id(plan: &str) -> String {
    let bare = normalize_dep_ref(plan);
    match bare.parse::<u32>() {
        Ok(n) if bare.chars().all(|c| c.is_ascii_digit()) => format!("{n:02}"),
        _ => bare.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Frontmatter parsing
// ---------------------------------------------------------------------------

/// Return the YAML between the leading `---` fence and the closing `---`.
pub fn extract_frontmatter(content: &str) -> Option<&str> {
    let rest = content.strip_prefix("---")?;
    let rest = if let Some(r) = rest.strip_prefix('\n') {
        r
    } else if let Some(r) = rest.strip_prefix("\r\n") {
        r
    } else {
        return None;
    };
    if rest.starts_with("---") {
        return Some("");
    }
    let end = rest.find("\n---")?;
    Some(&rest[..end])
}

static PLAN_FILE_RE: OnceLock<Regex> = OnceLock::new();

fn plan_file_re() -> &'static Regex {
    PLAN_FILE_RE
        .get_or_init(|| Regex::new(r"^(\d+(?:\.\d+)?)-(\d+[a-z]?)-PLAN\.md$").unwrap())
}

/// Extract the plan id from a file name like `03-02-PLAN.md`.
pub fn plan_id_from_file_name(file_name: &str) -> Option<&str> {
    plan_file_re()
        .captures(file_name)
        .and_then(|c| c.get(2))
        .map(|m| m.as_str())
}

/// Parse one plan file into a [`PlanRecord`]. `path` is only used in errors.
pub fn parse_plan(path: &Path, content: &str) -> Result<PlanRecord> {
    let invalid = |reason: String| WaveplanError::InvalidPlan {
        path: path.to_path_buf(),
        reason,
    };

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let id = plan_id_from_file_name(&file_name)
        .map(normalize_plan_id)
        .ok_or_else(|| invalid("file name must look like <phase>-<plan>-PLAN.md".to_string()))?;

    let fm = extract_frontmatter(content)
        .ok_or_else(|| invalid("missing YAML frontmatter".to_string()))?;
    let map: Mapping = if fm.trim().is_empty() {
        Mapping::new()
    } else {
        serde_yaml::from_str(fm).map_err(|e| invalid(format!("bad frontmatter: {e}")))?
    };

    let wave = match map.get("wave") {
        None | Some(Value::Null) => return Err(invalid("missing required field 'wave'".into())),
        Some(v) => wave_value(v).ok_or_else(|| {
            invalid(format!("'wave' must be a positive integer, got {}", describe(v)))
        })?,
    };

    let depends_on = string_list(&map, "depends_on").map_err(invalid)?;
    let files_modified = string_list(&map, "files_modified").map_err(invalid)?;
    let outcome_ids = string_list(&map, "outcomes").map_err(invalid)?;

    let record = PlanRecord {
        id,
        depends_on,
        wave,
        files_modified,
        outcome_ids,
    };
    record.validate().map_err(|e| invalid(e.to_string()))?;
    Ok(record)
}

fn wave_value(v: &Value) -> Option<u32> {
    let n = match v {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    u32::try_from(n).ok().filter(|w| *w >= 1)
}

/// Read an optional list of scalars. Numbers keep the text YAML gives them
/// (`1` stays `"1"`); matching them to padded plan ids is the graph's job.
fn string_list(map: &Mapping, key: &str) -> std::result::Result<Vec<String>, String> {
    let items = match map.get(key) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Sequence(items)) => items,
        Some(other) => {
            return Err(format!(
                "'{key}' must be a list, got {}",
                describe(other)
            ))
        }
    };
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => Ok(s.trim().to_string()),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(format!(
                "'{key}' entries must be strings, got {}",
                describe(other)
            )),
        })
        .collect()
}

fn describe(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

// ---------------------------------------------------------------------------
// Phase discovery
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseDir {
    /// Normalized phase number, e.g. `"03"`.
    pub number: String,
    /// Directory name, e.g. `"03-auth"`.
    pub name: String,
    pub path: PathBuf,
}

/// All phase directories under `.planning/phases`, ordered by phase number.
pub fn list_phases(root: &Path) -> Result<Vec<PhaseDir>> {
    let dir = paths::phases_dir(root);
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut phases = Vec::new();
    for entry in std::fs::read_dir(&dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        match paths::normalize_phase(&name) {
            Ok(number) => phases.push(PhaseDir {
                number,
                name,
                path: entry.path(),
            }),
            Err(_) => tracing::warn!(dir = %name, "skipping non-phase directory"),
        }
    }
    phases.sort_by(|a, b| {
        phase_order(&a.number)
            .cmp(&phase_order(&b.number))
            .then_with(|| a.name.cmp(&b.name))
    });
    Ok(phases)
}

/// Numeric sort key for a normalized phase number: `"03.10"` → `(3, Some(10))`.
/// A whole phase sorts before its decimal inserts.
fn phase_order(number: &str) -> (u32, Option<u32>) {
    let (major, minor) = match number.split_once('.') {
        Some((major, minor)) => (major, Some(minor)),
        None => (number, None),
    };
    (
        major.parse().unwrap_or(u32::MAX),
        minor.and_then(|m| m.parse().ok()),
    )
}

pub fn find_phase_dir(root: &Path, phase: &str) -> Result<PhaseDir> {
    let number = paths::normalize_phase(phase)?;
    list_phases(root)?
        .into_iter()
        .find(|p| p.number == number)
        .ok_or(WaveplanError::PhaseNotFound(number))
}

// ---------------------------------------------------------------------------
// PhasePlans
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhasePlans {
    pub phase: String,
    pub dir: String,
    pub plans: Vec<PlanRecord>,
}

/// Load every plan in a phase, ordered by file name, with trace-store
/// outcome links merged into `outcome_ids`.
pub fn load_phase_plans(root: &Path, phase: &str) -> Result<PhasePlans> {
    let phase_dir = find_phase_dir(root, phase)?;
    let trace = TraceStore::load(root)?;

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in std::fs::read_dir(&phase_dir.path)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !entry.file_type()?.is_file() || !name.ends_with(paths::PLAN_SUFFIX) {
            continue;
        }
        files.push(entry.path());
    }
    files.sort();

    let mut plans = Vec::with_capacity(files.len());
    for path in files {
        let content = std::fs::read_to_string(&path)?;
        let mut plan = parse_plan(&path, &content)?;
        for outcome in trace.outcomes_for(&phase_dir.number, &plan.id) {
            if !plan.outcome_ids.contains(outcome) {
                plan.outcome_ids.push(outcome.clone());
            }
        }
        tracing::debug!(phase = %phase_dir.number, plan = %plan.id, "loaded plan");
        plans.push(plan);
    }

    validate_plans(&plans)?;
    Ok(PhasePlans {
        phase: phase_dir.number,
        dir: phase_dir.name,
        plans,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
