use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WaveplanError {
    #[error("not initialized: run 'waveplan init'")]
    NotInitialized,

    #[error("phase not found: {0}")]
    PhaseNotFound(String),

    #[error("invalid phase '{0}': expected a number like 3, 03 or 03.1")]
    InvalidPhase(String),

    #[error("invalid plan {}: {reason}", path.display())]
    InvalidPlan { path: PathBuf, reason: String },

    #[error("invalid plan record '{plan}': {reason}")]
    InvalidPlanRecord { plan: String, reason: String },

    #[error("duplicate plan id: {0}")]
    DuplicatePlanId(String),

    #[error("intent document not found: {}", .0.display())]
    IntentNotFound(PathBuf),

    #[error("invalid outcome '{id}': {reason}")]
    InvalidOutcome { id: String, reason: String },

    #[error("duplicate outcome id: {0}")]
    DuplicateOutcomeId(String),

    #[error("no outcomes defined")]
    NoOutcomes,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WaveplanError>;
