//! Pipeline execution.
//!
//! This module provides:
//! - The retry executor and its policies
//! - Per-stage failure policy and fallback artifacts
//! - The orchestrator driving a daily run

mod failure_policy;
mod fallback;
#[cfg(test)]
mod integration_tests;
mod orchestrator;
mod retry;

pub use failure_policy::{FailureAction, FailurePolicy};
pub use fallback::{fallback_notes_html, FALLBACK_EXCERPT_CHARS, FALLBACK_SUMMARY};
pub use orchestrator::{Collaborators, Orchestrator, StageRetryPolicies, SYSTEM_NAME};
pub use retry::{JitterStrategy, RetryAttempt, RetryExecutor, RetryPolicy, Sleeper, TokioSleeper};
