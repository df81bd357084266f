use crate::error::{Result, WaveplanError};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const PLANNING_DIR: &str = ".planning";
pub const PHASES_DIR: &str = ".planning/phases";
pub const INTENT_DIR: &str = ".planning/intent";

pub const CONFIG_FILE: &str = ".planning/config.yaml";
pub const INTENT_FILE: &str = ".planning/INTENT.md";
pub const TRACE_FILE: &str = ".planning/intent/trace.json";
pub const DRIFT_HISTORY_FILE: &str = ".planning/intent/drift-history.json";

pub const PLAN_SUFFIX: &str = "-PLAN.md";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn phases_dir(root: &Path) -> PathBuf {
    root.join(PHASES_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn intent_path(root: &Path) -> PathBuf {
    root.join(INTENT_FILE)
}

pub fn trace_path(root: &Path) -> PathBuf {
    root.join(TRACE_FILE)
}

pub fn drift_history_path(root: &Path) -> PathBuf {
    root.join(DRIFT_HISTORY_FILE)
}

// ---------------------------------------------------------------------------
// Phase numbers
// ---------------------------------------------------------------------------

static PHASE_RE: OnceLock<Regex> = OnceLock::new();

fn phase_re() -> &'static Regex {
    PHASE_RE.get_or_init(|| Regex::new(r"^(\d+)(\.\d+)?(?:-.*)?$").unwrap())
}

/// Normalize a phase argument or directory name to its zero-padded number.
///
/// `"3"` → `"03"`, `"3.1"` → `"03.1"`, `"03-auth"` → `"03"`.
pub fn normalize_phase(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let caps = phase_re()
        .captures(trimmed)
        .ok_or_else(|| WaveplanError::InvalidPhase(raw.to_string()))?;
    let major: u32 = caps[1]
        .parse()
        .map_err(|_| WaveplanError::InvalidPhase(raw.to_string()))?;
    let minor = caps.get(2).map(|m| m.as_str()).unwrap_or("");
    Ok(format!("{major:02}{minor}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_phase_pads_and_strips_slug() {
        assert_eq!(normalize_phase("3").unwrap(), "03");
        assert_eq!(normalize_phase("03").unwrap(), "03");
        assert_eq!(normalize_phase("3.1").unwrap(), "03.1");
        assert_eq!(normalize_phase("03-auth-flow").unwrap(), "03");
        assert_eq!(normalize_phase("12").unwrap(), "12");
    }

    #[test]
    fn normalize_phase_rejects_garbage() {
        for raw in ["", "auth", "-3", "v2"] {
            assert!(normalize_phase(raw).is_err(), "expected invalid: {raw}");
        }
    }

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            config_path(root),
            PathBuf::from("/tmp/proj/.planning/config.yaml")
        );
        assert_eq!(
            trace_path(root),
            PathBuf::from("/tmp/proj/.planning/intent/trace.json")
        );
        assert_eq!(
            intent_path(root),
            PathBuf::from("/tmp/proj/.planning/INTENT.md")
        );
    }
}
