//! Testing utilities for digestflow pipelines.
//!
//! This module provides:
//! - Scripted and recording collaborators
//! - A recording sleeper for observing retry delays
//! - An orchestrator harness wired to all of the above

mod fixtures;
mod mocks;

pub use fixtures::{test_config, test_run_date, TestHarness};
pub use mocks::{
    PanickingMailer, PanickingSummarizer, RecordingMailer, RecordingPersister, RecordingSleeper, ScriptedFetcher,
    ScriptedNoteGenerator, ScriptedSummarizer,
};
