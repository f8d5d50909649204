//! Stage, outcome and run-state enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A step of the daily pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Retrieve the transcript.
    Fetch,
    /// Produce the short summary.
    Summarize,
    /// Produce the HTML study notes.
    GenerateNotes,
    /// Archive to the document store.
    Persist,
    /// Email the recipient.
    Notify,
}

impl PipelineStage {
    /// All stages in execution order.
    pub const ORDER: [Self; 5] = [
        Self::Fetch,
        Self::Summarize,
        Self::GenerateNotes,
        Self::Persist,
        Self::Notify,
    ];

    /// The run state while this stage executes.
    #[must_use]
    pub fn running_state(&self) -> RunState {
        match self {
            Self::Fetch => RunState::Fetching,
            Self::Summarize => RunState::Summarizing,
            Self::GenerateNotes => RunState::GeneratingNotes,
            Self::Persist => RunState::Persisting,
            Self::Notify => RunState::Notifying,
        }
    }

    /// Returns the stage name used in logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Summarize => "summarize",
            Self::GenerateNotes => "generate_notes",
            Self::Persist => "persist",
            Self::Notify => "notify",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a stage finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageOutcome {
    /// The stage produced its real output.
    Success,
    /// The stage failed but the run continued with substitute output.
    DegradedSuccess {
        /// Whether a fallback artifact replaced the real output.
        fallback_used: bool,
    },
    /// The stage did not produce its output.
    Failed,
}

impl StageOutcome {
    /// Returns true for a clean success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns true if a fallback artifact was used.
    #[must_use]
    pub fn used_fallback(&self) -> bool {
        matches!(self, Self::DegradedSuccess { fallback_used: true })
    }
}

impl fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::DegradedSuccess { fallback_used: true } => write!(f, "degraded (fallback)"),
            Self::DegradedSuccess { fallback_used: false } => write!(f, "degraded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Created, no stage started yet.
    #[default]
    Init,
    /// Fetching the transcript.
    Fetching,
    /// Summarizing.
    Summarizing,
    /// Generating study notes.
    GeneratingNotes,
    /// Writing to the document store.
    Persisting,
    /// Sending the email.
    Notifying,
    /// All stages ran.
    Done,
    /// The run stopped early.
    Aborted,
}

impl RunState {
    /// Returns true once the run can no longer change.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::Fetching => write!(f, "fetching"),
            Self::Summarizing => write!(f, "summarizing"),
            Self::GeneratingNotes => write!(f, "generating_notes"),
            Self::Persisting => write!(f, "persisting"),
            Self::Notifying => write!(f, "notifying"),
            Self::Done => write!(f, "done"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_is_sorted() {
        let mut sorted = PipelineStage::ORDER;
        sorted.sort();
        assert_eq!(sorted, PipelineStage::ORDER);
    }

    #[test]
    fn test_running_state() {
        assert_eq!(PipelineStage::Fetch.running_state(), RunState::Fetching);
        assert_eq!(PipelineStage::GenerateNotes.running_state(), RunState::GeneratingNotes);
        assert_eq!(PipelineStage::Notify.running_state(), RunState::Notifying);
    }

    #[test]
    fn test_run_state_is_terminal() {
        assert!(RunState::Done.is_terminal());
        assert!(RunState::Aborted.is_terminal());
        assert!(!RunState::Init.is_terminal());
        assert!(!RunState::Persisting.is_terminal());
    }

    #[test]
    fn test_outcome_serialize() {
        let json = serde_json::to_string(&StageOutcome::DegradedSuccess { fallback_used: true }).unwrap();
        assert_eq!(json, r#"{"status":"degraded_success","fallback_used":true}"#);

        let back: StageOutcome = serde_json::from_str(&json).unwrap();
        assert!(back.used_fallback());
        assert!(!back.is_success());
    }

    #[test]
    fn test_display() {
        assert_eq!(PipelineStage::GenerateNotes.to_string(), "generate_notes");
        assert_eq!(RunState::Aborted.to_string(), "aborted");
        assert_eq!(StageOutcome::Failed.to_string(), "failed");
    }
}
