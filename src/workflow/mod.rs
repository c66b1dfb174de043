//! Incident lifecycle -- a per-incident state machine over the fixed
//! Detection -> Analysis -> Containment -> Recovery sequence.
//!
//! Stage advances use an optimistic compare-and-set on `current_stage`, so
//! concurrent advances on the same incident serialize and exactly one of
//! two simultaneous calls wins. Unrelated incidents never contend.

mod manager;

pub use manager::{Incident, IncidentManager, TimelineEntry, WorkflowSummary};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classify::Severity;

/// Workflow stages in lifecycle order. `Recovery` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Detection,
    Analysis,
    Containment,
    Recovery,
}

impl Stage {
    /// The immediate successor stage, or `None` at the terminal stage.
    pub fn successor(&self) -> Option<Stage> {
        match self {
            Stage::Detection => Some(Stage::Analysis),
            Stage::Analysis => Some(Stage::Containment),
            Stage::Containment => Some(Stage::Recovery),
            Stage::Recovery => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Detection => "Detection",
            Stage::Analysis => "Analysis",
            Stage::Containment => "Containment",
            Stage::Recovery => "Recovery",
        }
    }

    pub const ALL: [Stage; 4] =
        [Stage::Detection, Stage::Analysis, Stage::Containment, Stage::Recovery];
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Detection" => Ok(Stage::Detection),
            "Analysis" => Ok(Stage::Analysis),
            "Containment" => Ok(Stage::Containment),
            "Recovery" => Ok(Stage::Recovery),
            other => Err(WorkflowError::UnknownStage(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("incident {0} not found")]
    NotFound(i64),

    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: Stage, to: Stage },

    #[error("unknown stage '{0}'")]
    UnknownStage(String),

    #[error("storage error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("storage error: {0}")]
    Db(#[from] rusqlite::Error),
}

/// Incident-creation policy: only Medium and High severity anomalies become
/// tracked incidents.
pub fn warrants_incident(severity: Severity) -> bool {
    matches!(severity, Severity::Medium | Severity::High)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successor_chain() {
        assert_eq!(Stage::Detection.successor(), Some(Stage::Analysis));
        assert_eq!(Stage::Analysis.successor(), Some(Stage::Containment));
        assert_eq!(Stage::Containment.successor(), Some(Stage::Recovery));
        assert_eq!(Stage::Recovery.successor(), None);
    }

    #[test]
    fn test_stage_round_trip() {
        for stage in Stage::ALL {
            assert_eq!(stage.as_str().parse::<Stage>().unwrap(), stage);
        }
        assert!("Triage".parse::<Stage>().is_err());
    }

    #[test]
    fn test_incident_policy() {
        assert!(warrants_incident(Severity::High));
        assert!(warrants_incident(Severity::Medium));
        assert!(!warrants_incident(Severity::Low));
        assert!(!warrants_incident(Severity::Pending));
    }
}
