//! # Digestflow
//!
//! Daily news digest pipeline.
//!
//! Each run fetches the previous day's transcript, summarizes it, turns it
//! into HTML study notes, archives the result and emails it. Remote failures
//! are classified into actionable categories:
//!
//! - **Retry**: transient failures are retried with capped exponential backoff
//! - **Degrade**: generation failures fall back to fixed placeholder content
//! - **Alert**: non-transient or exhausted failures email the operator once
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use digestflow::prelude::*;
//!
//! let config = AppConfig::from_env()?;
//! let (collaborators, dispatcher) = build_collaborators(&config)?;
//! let run = Orchestrator::new(config, collaborators, dispatcher)
//!     .run(chrono::Local::now().date_naive())
//!     .await?;
//! println!("{}", run.state());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

#[cfg(feature = "adapters")]
pub mod adapters;
pub mod classify;
pub mod collaborators;
pub mod compose;
pub mod config;
pub mod core;
pub mod errors;
pub mod notify;
pub mod observability;
pub mod pipeline;
pub mod source;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    #[cfg(feature = "adapters")]
    pub use crate::adapters::build_collaborators;
    pub use crate::classify::{classify, FailureCategory};
    pub use crate::collaborators::{
        ArchiveEntry, ContentFetcher, FetchedContent, Mailer, NoteGenerator, OutgoingEmail,
        Persister, Summarizer,
    };
    pub use crate::config::AppConfig;
    pub use crate::core::{PipelineRun, PipelineStage, RunState, StageOutcome, StageRecord};
    pub use crate::errors::{
        ConfigError, DigestflowError, RemoteError, RemoteErrorKind, TerminalFailure,
    };
    pub use crate::notify::{AlertEvent, NotificationDispatcher};
    pub use crate::pipeline::{
        Collaborators, FailureAction, FailurePolicy, Orchestrator, RetryExecutor, RetryPolicy,
    };
    pub use crate::source::TranscriptSource;
}
