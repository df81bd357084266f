use crate::error::{Result, WaveplanError};
use crate::paths;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    P1,
    P2,
    P3,
}

impl Priority {
    /// Coverage weight used by the drift model.
    pub fn weight(self) -> u32 {
        match self {
            Priority::P1 => 3,
            Priority::P2 => 2,
            Priority::P3 => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::P1 => "P1",
            Priority::P2 => "P2",
            Priority::P3 => "P3",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "P1" => Some(Priority::P1),
            "P2" => Some(Priority::P2),
            "P3" => Some(Priority::P3),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// OutcomeRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub id: String,
    pub priority: Priority,
    #[serde(default)]
    pub text: String,
}

impl OutcomeRecord {
    pub fn new(id: impl Into<String>, priority: Priority, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            priority,
            text: text.into(),
        }
    }
}

static OUTCOME_ID_RE: OnceLock<Regex> = OnceLock::new();

fn outcome_id_re() -> &'static Regex {
    OUTCOME_ID_RE.get_or_init(|| Regex::new(r"^DO-\d+$").unwrap())
}

pub fn validate_outcome_id(id: &str) -> Result<()> {
    if !outcome_id_re().is_match(id) {
        return Err(WaveplanError::InvalidOutcome {
            id: id.to_string(),
            reason: "id must look like DO-<number>".to_string(),
        });
    }
    Ok(())
}

/// Check ids are well-formed and unique.
pub fn validate_outcomes(outcomes: &[OutcomeRecord]) -> Result<()> {
    let mut seen = HashSet::new();
    for o in outcomes {
        validate_outcome_id(&o.id)?;
        if !seen.insert(o.id.as_str()) {
            return Err(WaveplanError::DuplicateOutcomeId(o.id.clone()));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Intent document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Intent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective: Option<String>,
    pub outcomes: Vec<OutcomeRecord>,
}

impl Intent {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::intent_path(root);
        if !path.exists() {
            return Err(WaveplanError::IntentNotFound(path));
        }
        let content = std::fs::read_to_string(&path)?;
        parse_intent(&content)
    }

    pub fn outcome(&self, id: &str) -> Option<&OutcomeRecord> {
        self.outcomes.iter().find(|o| o.id == id)
    }
}

#[derive(PartialEq)]
enum Section {
    Preamble,
    Objective,
    Outcomes,
    Other,
}

static BULLET_RE: OnceLock<Regex> = OnceLock::new();

fn bullet_re() -> &'static Regex {
    BULLET_RE.get_or_init(|| {
        Regex::new(r"^\s*[-*]\s+(?:\*\*)?(DO-[^\s\[:*]*)(?:\*\*)?\s*(?:\[([^\]]*)\])?\s*:?\s*(.*)$")
            .unwrap()
    })
}

/// Parse an intent document.
///
/// Outcomes are bullets under `## Desired Outcomes` shaped like
/// `- DO-1 [P1]: description`. Other bullets in that section are ignored;
/// an outcome bullet with a bad id or priority is an error.
pub fn parse_intent(content: &str) -> Result<Intent> {
    let mut intent = Intent::default();
    let mut objective: Vec<&str> = Vec::new();
    let mut section = Section::Preamble;

    for line in content.lines() {
        if let Some(heading) = line.strip_prefix("## ") {
            let heading = heading.trim().to_ascii_lowercase();
            section = if heading.contains("outcome") {
                Section::Outcomes
            } else if heading.contains("objective") {
                Section::Objective
            } else {
                Section::Other
            };
            continue;
        }
        if let Some(title) = line.strip_prefix("# ") {
            if intent.title.is_none() {
                intent.title = Some(title.trim().to_string());
            }
            continue;
        }

        match section {
            Section::Objective => {
                if !line.trim().is_empty() {
                    objective.push(line.trim());
                }
            }
            Section::Outcomes => {
                if let Some(caps) = bullet_re().captures(line) {
                    let id = caps[1].to_string();
                    validate_outcome_id(&id)?;
                    let priority = match caps.get(2) {
                        Some(p) => Priority::parse(p.as_str()).ok_or_else(|| {
                            WaveplanError::InvalidOutcome {
                                id: id.clone(),
                                reason: format!("unknown priority '{}'", p.as_str()),
                            }
                        })?,
                        None => {
                            return Err(WaveplanError::InvalidOutcome {
                                id,
                                reason: "missing priority, expected [P1], [P2] or [P3]"
                                    .to_string(),
                            })
                        }
                    };
                    let text = caps[3].trim().to_string();
                    intent.outcomes.push(OutcomeRecord { id, priority, text });
                }
            }
            Section::Preamble | Section::Other => {}
        }
    }

    if !objective.is_empty() {
        intent.objective = Some(objective.join("\n"));
    }
    validate_outcomes(&intent.outcomes)?;
    Ok(intent)
}

/// Starter document written by `waveplan init`.
pub fn intent_template(project: &str) -> String {
    format!(
        "# {project} Intent\n\n\
## Objective\n\n\
Describe what this project must achieve.\n\n\
## Desired Outcomes\n\n\
<!-- One bullet per outcome: - DO-<n> [P1|P2|P3]: description -->\n"
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
