//! Test fixtures for pipeline testing.

use chrono::NaiveDate;
use std::sync::Arc;

use super::mocks::{
    RecordingMailer, RecordingPersister, RecordingSleeper, ScriptedFetcher, ScriptedNoteGenerator,
    ScriptedSummarizer,
};
use crate::collaborators::{Mailer, Summarizer};
use crate::config::AppConfig;
use crate::notify::NotificationDispatcher;
use crate::pipeline::{Collaborators, Orchestrator, RetryExecutor};

/// A config with every required value set to a dummy.
#[must_use]
pub fn test_config() -> AppConfig {
    AppConfig::new()
        .with_jina_api_key("jina_test_0123456789")
        .with_gemini_api_key("AIzaSy-test-0123456789")
        .with_notion("secret_test_notion", "db-test")
        .with_smtp_login("bot@example.com", "password")
        .with_recipient("reader@example.com")
        .with_alert_email("ops@example.com")
}

/// Fixed run date used by fixtures.
#[must_use]
pub fn test_run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 1).unwrap_or_default()
}

/// An orchestrator wired to recording collaborators.
///
/// The study-note mailer and the alert mailer are separate so tests can tell
/// the recipient email apart from operator alerts.
pub struct TestHarness {
    /// Config passed to the orchestrator.
    pub config: AppConfig,
    /// Transcript fetcher.
    pub fetcher: Arc<ScriptedFetcher>,
    /// Summarizer.
    pub summarizer: Arc<ScriptedSummarizer>,
    /// Note generator.
    pub notes: Arc<ScriptedNoteGenerator>,
    /// Document store.
    pub persister: Arc<RecordingPersister>,
    /// Study-note mailer.
    pub mailer: Arc<RecordingMailer>,
    /// Operator alert mailer.
    pub alerts: Arc<RecordingMailer>,
    /// Retry sleeper.
    pub sleeper: Arc<RecordingSleeper>,
    summarizer_override: Option<Arc<dyn Summarizer>>,
    alert_override: Option<Arc<dyn Mailer>>,
}

impl std::fmt::Debug for TestHarness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestHarness")
            .field("config", &self.config)
            .field("fetcher", &self.fetcher)
            .field("summarizer", &self.summarizer)
            .field("notes", &self.notes)
            .field("persister", &self.persister)
            .field("mailer", &self.mailer)
            .field("alerts", &self.alerts)
            .field("sleeper", &self.sleeper)
            .finish_non_exhaustive()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    /// All collaborators succeed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: test_config(),
            fetcher: Arc::new(ScriptedFetcher::ok("今天的新闻联播主要内容有：……")),
            summarizer: Arc::new(ScriptedSummarizer::ok("整体摘要")),
            notes: Arc::new(ScriptedNoteGenerator::ok("<h1>学习笔记</h1>")),
            persister: Arc::new(RecordingPersister::new("page-1")),
            mailer: Arc::new(RecordingMailer::new()),
            alerts: Arc::new(RecordingMailer::new()),
            sleeper: Arc::new(RecordingSleeper::new()),
            summarizer_override: None,
            alert_override: None,
        }
    }

    /// Replaces the config.
    #[must_use]
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the fetcher.
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: ScriptedFetcher) -> Self {
        self.fetcher = Arc::new(fetcher);
        self
    }

    /// Replaces the summarizer.
    #[must_use]
    pub fn with_summarizer(mut self, summarizer: ScriptedSummarizer) -> Self {
        self.summarizer = Arc::new(summarizer);
        self
    }

    /// Uses an arbitrary summarizer instead of the scripted one.
    #[must_use]
    pub fn with_summarizer_impl(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer_override = Some(summarizer);
        self
    }

    /// Replaces the note generator.
    #[must_use]
    pub fn with_notes(mut self, notes: ScriptedNoteGenerator) -> Self {
        self.notes = Arc::new(notes);
        self
    }

    /// Replaces the persister.
    #[must_use]
    pub fn with_persister(mut self, persister: RecordingPersister) -> Self {
        self.persister = Arc::new(persister);
        self
    }

    /// Replaces the study-note mailer.
    #[must_use]
    pub fn with_mailer(mut self, mailer: RecordingMailer) -> Self {
        self.mailer = Arc::new(mailer);
        self
    }

    /// Uses an arbitrary alert mailer instead of the recording one.
    #[must_use]
    pub fn with_alert_mailer_impl(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.alert_override = Some(mailer);
        self
    }

    /// Builds the orchestrator.
    #[must_use]
    pub fn orchestrator(&self) -> Orchestrator {
        let summarizer: Arc<dyn Summarizer> = match &self.summarizer_override {
            Some(summarizer) => summarizer.clone(),
            None => self.summarizer.clone(),
        };

        let collaborators = Collaborators {
            fetcher: self.fetcher.clone(),
            summarizer,
            note_generator: self.notes.clone(),
            persister: self.persister.clone(),
            mailer: self.mailer.clone(),
        };

        let alert_mailer: Arc<dyn Mailer> = match &self.alert_override {
            Some(mailer) => mailer.clone(),
            None => self.alerts.clone(),
        };

        Orchestrator::new(
            self.config.clone(),
            collaborators,
            NotificationDispatcher::new(alert_mailer),
        )
        .with_executor(RetryExecutor::new(self.sleeper.clone()))
    }
}
