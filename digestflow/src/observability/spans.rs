//! Structured tracing helpers for pipeline runs.

use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::core::{PipelineRun, StageOutcome, StageRecord};

/// Span attributes for a pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSpanAttributes {
    /// Run id.
    pub run_id: String,
    /// Date the run executes on.
    pub run_date: String,
    /// Transcript title, once resolved.
    pub title: Option<String>,
}

impl RunSpanAttributes {
    /// Captures the attributes of a run.
    #[must_use]
    pub fn from_run(run: &PipelineRun) -> Self {
        Self {
            run_id: run.run_id.to_string(),
            run_date: run.run_date.to_string(),
            title: (!run.title.is_empty()).then(|| run.title.clone()),
        }
    }

    /// Creates the tracing span wrapping a run.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!("digest_run", run_id = %self.run_id, run_date = %self.run_date)
    }
}

/// Span attributes for a finished stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSpanAttributes {
    /// Stage name.
    pub stage: String,
    /// Outcome label.
    pub outcome: String,
    /// Duration in milliseconds.
    pub duration_ms: f64,
    /// Failure category, if any.
    pub category: Option<String>,
    /// Failure message, if any.
    pub error: Option<String>,
}

impl StageSpanAttributes {
    /// Builds attributes from a stage record and a measured duration.
    #[must_use]
    pub fn from_record(record: &StageRecord, duration_ms: f64) -> Self {
        Self {
            stage: record.stage.to_string(),
            outcome: record.outcome.to_string(),
            duration_ms,
            category: record.category.map(|c| c.to_string()),
            error: record.message.clone(),
        }
    }
}

/// Logs a finished stage at a level matching its outcome.
pub fn log_stage(record: &StageRecord, duration_ms: f64) {
    let attrs = StageSpanAttributes::from_record(record, duration_ms);
    match record.outcome {
        StageOutcome::Success => tracing::info!(
            stage = %attrs.stage,
            outcome = %attrs.outcome,
            duration_ms,
            "Stage completed"
        ),
        StageOutcome::DegradedSuccess { .. } => tracing::warn!(
            stage = %attrs.stage,
            outcome = %attrs.outcome,
            duration_ms,
            category = attrs.category.as_deref().unwrap_or("none"),
            error = attrs.error.as_deref().unwrap_or(""),
            "Stage degraded"
        ),
        StageOutcome::Failed => tracing::error!(
            stage = %attrs.stage,
            outcome = %attrs.outcome,
            duration_ms,
            category = attrs.category.as_deref().unwrap_or("none"),
            error = attrs.error.as_deref().unwrap_or(""),
            "Stage failed"
        ),
    }
}

/// Simple span timing helper.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
}

impl SpanTimer {
    /// Starts a new span timer.
    #[must_use]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Finishes the span and returns the duration.
    #[must_use]
    pub fn finish(self) -> f64 {
        self.elapsed_ms()
    }
}
