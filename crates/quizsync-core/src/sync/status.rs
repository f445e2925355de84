//! Run status and events
//!
//! Each direction publishes a [`RunStatus`] on a watch channel; every
//! notable step is also emitted as a [`SyncEvent`].

use std::fmt;

use serde::Serialize;

use crate::schema::FieldError;

/// Sync direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Pull,
    Push,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Pull => f.write_str("pull"),
            Direction::Push => f.write_str("push"),
        }
    }
}

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    // pull
    Fetching,
    Validating,
    Replacing,
    // push
    Reading,
    Batching,
    Committing,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Fetching => "fetching",
            Phase::Validating => "validating",
            Phase::Replacing => "replacing",
            Phase::Reading => "reading",
            Phase::Batching => "batching",
            Phase::Committing => "committing",
        };
        f.write_str(name)
    }
}

/// Result of a completed pull
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PullReport {
    /// Records now in the cache
    pub cached: usize,
    /// How many of them failed validation
    pub unvalidated: usize,
    /// Documents left out because they had no key
    pub skipped: usize,
}

/// Result of a completed push
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PushReport {
    /// Records included in the committed batch
    pub written: usize,
    /// Records left out for lack of an identity
    pub skipped: usize,
}

/// How the last run of a direction ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum RunOutcome {
    Pulled(PullReport),
    Pushed(PushReport),
    Failed { message: String },
}

/// Observable state of one direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunStatus {
    pub phase: Phase,
    pub last_outcome: Option<RunOutcome>,
}

impl RunStatus {
    pub fn is_running(&self) -> bool {
        self.phase != Phase::Idle
    }
}

impl Default for RunStatus {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            last_outcome: None,
        }
    }
}

/// A pulled record that did not conform to its contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDiagnostic {
    pub collection: String,
    pub record_id: String,
    pub errors: Vec<FieldError>,
}

impl fmt::Display for ValidationDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}: ", self.collection, self.record_id)?;
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

/// Events emitted by the sync engine
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    PhaseChanged { direction: Direction, phase: Phase },
    /// A pulled record was admitted unvalidated
    ValidationWarning(ValidationDiagnostic),
    /// A local record without identity was left out of a push
    RecordSkipped { collection: String, reason: String },
    PullCompleted(PullReport),
    PushCompleted(PushReport),
    RunFailed { direction: Direction, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Problem;

    #[test]
    fn test_default_status_is_idle() {
        let status = RunStatus::default();
        assert_eq!(status.phase, Phase::Idle);
        assert!(!status.is_running());
        assert!(status.last_outcome.is_none());
    }

    #[test]
    fn test_diagnostic_display() {
        let diagnostic = ValidationDiagnostic {
            collection: "questions".to_string(),
            record_id: "q9".to_string(),
            errors: vec![
                FieldError::new("answer", Problem::Missing),
                FieldError::new("version", Problem::Missing),
            ],
        };
        assert_eq!(
            diagnostic.to_string(),
            "questions/q9: answer: missing required field; version: missing required field"
        );
    }

    #[test]
    fn test_outcome_serializes_tagged() {
        let outcome = RunOutcome::Pushed(PushReport {
            written: 3,
            skipped: 1,
        });
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            serde_json::json!({ "outcome": "pushed", "written": 3, "skipped": 1 })
        );
    }
}
