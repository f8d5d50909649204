//! Per-stage failure handling.
//!
//! Decides what a stage failure does to the run and whether it alerts.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::PipelineStage;
use crate::errors::TerminalFailure;

/// What the run does after a stage fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureAction {
    /// Stop the run; later stages do not execute.
    Abort,
    /// Substitute a fallback artifact and continue.
    Degrade,
    /// Record the failure and continue without substitute output.
    Continue,
}

/// Maps each stage to its [`FailureAction`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailurePolicy {
    actions: HashMap<PipelineStage, FailureAction>,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        let actions = PipelineStage::ORDER
            .into_iter()
            .map(|stage| (stage, Self::default_action(stage)))
            .collect();
        Self { actions }
    }
}

impl FailurePolicy {
    /// Creates the standard policy: fetch aborts, generation degrades,
    /// persistence and delivery continue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn default_action(stage: PipelineStage) -> FailureAction {
        match stage {
            PipelineStage::Fetch => FailureAction::Abort,
            PipelineStage::Summarize | PipelineStage::GenerateNotes => FailureAction::Degrade,
            PipelineStage::Persist | PipelineStage::Notify => FailureAction::Continue,
        }
    }

    /// Overrides the action for a stage.
    #[must_use]
    pub fn with_action(mut self, stage: PipelineStage, action: FailureAction) -> Self {
        self.actions.insert(stage, action);
        self
    }

    /// Returns the action for a stage.
    #[must_use]
    pub fn action_for(&self, stage: PipelineStage) -> FailureAction {
        self.actions
            .get(&stage)
            .copied()
            .unwrap_or_else(|| Self::default_action(stage))
    }

    /// Returns true if the failure warrants an operator alert: every
    /// non-transient failure and every exhausted transient one.
    #[must_use]
    pub fn should_alert(&self, failure: &TerminalFailure) -> bool {
        failure.is_notifiable()
    }
}
