//! The in-memory record of a single daily run.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{PipelineStage, RunState, StageOutcome};
use crate::classify::FailureCategory;
use crate::errors::{DigestflowError, Result};

/// Outcome of one stage, appended to the run when the stage finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    /// Which stage.
    pub stage: PipelineStage,
    /// How it finished.
    pub outcome: StageOutcome,
    /// Failure category, when the stage failed on a classified error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<FailureCategory>,
    /// Short failure description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// When the stage started.
    pub started_at: DateTime<Utc>,
    /// When the stage finished.
    pub ended_at: DateTime<Utc>,
}

impl StageRecord {
    /// Creates a record ending now.
    #[must_use]
    pub fn new(stage: PipelineStage, outcome: StageOutcome, started_at: DateTime<Utc>) -> Self {
        Self {
            stage,
            outcome,
            category: None,
            message: None,
            started_at,
            ended_at: Utc::now(),
        }
    }

    /// Attaches a failure category.
    #[must_use]
    pub fn with_category(mut self, category: FailureCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Attaches a failure message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Stage duration in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.ended_at - self.started_at).num_milliseconds()
    }
}

/// State of one pipeline run. Lives for the duration of the process only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    /// Unique id of this run.
    pub run_id: Uuid,
    /// The date the run executes on.
    pub run_date: NaiveDate,
    /// Transcript URL.
    pub source_url: String,
    /// Transcript title.
    pub title: String,
    /// Fetched transcript text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_content: Option<String>,
    /// Page title reported by the fetcher, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_title: Option<String>,
    /// Summary, real or fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_text: Option<String>,
    /// Study notes, real or fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes_html: Option<String>,
    /// Document-store page id, when persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,
    /// Why the run aborted, if it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abort_reason: Option<String>,
    state: RunState,
    stages: Vec<StageRecord>,
}

impl PipelineRun {
    /// Creates a run in the `Init` state.
    #[must_use]
    pub fn new(run_date: NaiveDate, source_url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            run_date,
            source_url: source_url.into(),
            title: title.into(),
            raw_content: None,
            page_title: None,
            summary_text: None,
            notes_html: None,
            page_id: None,
            abort_reason: None,
            state: RunState::Init,
            stages: Vec::new(),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Stage records in the order they were appended.
    #[must_use]
    pub fn stages(&self) -> &[StageRecord] {
        &self.stages
    }

    /// Returns the recorded outcome of a stage.
    #[must_use]
    pub fn outcome_of(&self, stage: PipelineStage) -> Option<StageOutcome> {
        self.stages.iter().find(|r| r.stage == stage).map(|r| r.outcome)
    }

    /// Moves the run into the running state of `stage`.
    ///
    /// Fails if the run is terminal or the stage does not come after every
    /// stage already recorded.
    pub fn enter(&mut self, stage: PipelineStage) -> Result<()> {
        self.ensure_open()?;
        self.ensure_after_last(stage)?;
        self.state = stage.running_state();
        Ok(())
    }

    /// Appends a stage record. Each stage is recorded at most once and in
    /// pipeline order.
    pub fn record(&mut self, record: StageRecord) -> Result<()> {
        self.ensure_open()?;
        self.ensure_after_last(record.stage)?;
        self.stages.push(record);
        Ok(())
    }

    /// Marks the run as completed.
    pub fn finish(&mut self) {
        if !self.state.is_terminal() {
            self.state = RunState::Done;
        }
    }

    /// Marks the run as aborted, keeping partial results.
    pub fn abort(&mut self, reason: impl Into<String>) {
        if !self.state.is_terminal() {
            self.state = RunState::Aborted;
            self.abort_reason = Some(reason.into());
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state.is_terminal() {
            return Err(DigestflowError::Internal(format!(
                "run {} is already {}",
                self.run_id, self.state
            )));
        }
        Ok(())
    }

    fn ensure_after_last(&self, stage: PipelineStage) -> Result<()> {
        match self.stages.last() {
            Some(last) if last.stage >= stage => Err(DigestflowError::Internal(format!(
                "stage {stage} cannot run after {}",
                last.stage
            ))),
            _ => Ok(()),
        }
    }
}
