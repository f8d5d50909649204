//! Core domain model types for digestflow.
//!
//! This module contains the run record and its vocabulary:
//! - Pipeline stages, stage outcomes and run states
//! - The per-run record with its append-only stage history

mod run;
mod status;

pub use run::{PipelineRun, StageRecord};
pub use status::{PipelineStage, RunState, StageOutcome};
