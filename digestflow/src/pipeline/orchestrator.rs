//! The daily run: fetch, summarize, generate notes, persist, notify.
//!
//! Stages run sequentially. Remote stages go through the [`RetryExecutor`];
//! their terminal failures are handled per the [`FailurePolicy`] and alert
//! the operator when notifiable. Anything escaping a stage (an internal error
//! or a panic) ends the run in `Aborted` with a single "run failed" alert.

use chrono::{NaiveDate, Utc};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::Instrument;

use super::failure_policy::{FailureAction, FailurePolicy};
use super::fallback::{fallback_notes_html, FALLBACK_SUMMARY};
use super::retry::{RetryAttempt, RetryExecutor, RetryPolicy};
use crate::classify::FailureCategory;
use crate::collaborators::{
    ArchiveEntry, ContentFetcher, Mailer, NoteGenerator, Persister, Summarizer,
};
use crate::compose::compose_digest_email;
use crate::config::AppConfig;
use crate::core::{PipelineRun, PipelineStage, StageOutcome, StageRecord};
use crate::errors::{ConfigError, DigestflowError, FetchError, Result, TerminalFailure};
use crate::notify::{AlertEvent, NotificationDispatcher};
use crate::observability::{log_stage, RunSpanAttributes, SpanTimer};
use crate::source::TranscriptSource;
use crate::utils::{mask_secret, panic_message};

/// Service name used for alerts about the run itself.
pub const SYSTEM_NAME: &str = "Digestflow";

/// The collaborators a run calls out to.
#[derive(Clone)]
pub struct Collaborators {
    /// Transcript fetcher.
    pub fetcher: Arc<dyn ContentFetcher>,
    /// Summary generator.
    pub summarizer: Arc<dyn Summarizer>,
    /// Study-note generator.
    pub note_generator: Arc<dyn NoteGenerator>,
    /// Document store.
    pub persister: Arc<dyn Persister>,
    /// Mailer for the study-note email.
    pub mailer: Arc<dyn Mailer>,
}

/// Retry policies for the remote stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRetryPolicies {
    /// Transcript fetch.
    pub fetch: RetryPolicy,
    /// Summarization.
    pub summarize: RetryPolicy,
    /// Note generation.
    pub notes: RetryPolicy,
}

impl Default for StageRetryPolicies {
    fn default() -> Self {
        Self {
            fetch: RetryPolicy::fetch(),
            summarize: RetryPolicy::summarize(),
            notes: RetryPolicy::notes(),
        }
    }
}

/// Drives one daily run.
pub struct Orchestrator {
    config: AppConfig,
    collaborators: Collaborators,
    dispatcher: NotificationDispatcher,
    executor: RetryExecutor,
    retry: StageRetryPolicies,
    failure_policy: FailurePolicy,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("retry", &self.retry)
            .field("failure_policy", &self.failure_policy)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Creates an orchestrator with the standard retry and failure policies.
    #[must_use]
    pub fn new(
        config: AppConfig,
        collaborators: Collaborators,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        Self {
            config,
            collaborators,
            dispatcher,
            executor: RetryExecutor::default(),
            retry: StageRetryPolicies::default(),
            failure_policy: FailurePolicy::default(),
        }
    }

    /// Replaces the retry executor.
    #[must_use]
    pub fn with_executor(mut self, executor: RetryExecutor) -> Self {
        self.executor = executor;
        self
    }

    /// Replaces the stage retry policies.
    #[must_use]
    pub fn with_retry_policies(mut self, retry: StageRetryPolicies) -> Self {
        self.retry = retry;
        self
    }

    /// Replaces the failure policy.
    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Executes the run for `run_date`.
    ///
    /// Returns `Err` only when required configuration is missing, in which
    /// case nothing was called. Every other outcome, including an aborted
    /// run, is reported through the returned [`PipelineRun`].
    pub async fn run(&self, run_date: NaiveDate) -> std::result::Result<PipelineRun, ConfigError> {
        if let Err(err) = self.config.validate() {
            tracing::error!(error = %err, "Refusing to start run");
            return Err(err);
        }

        let mut run = PipelineRun::new(run_date, "", "");
        let span = RunSpanAttributes::from_run(&run).span();

        async {
            tracing::info!("Starting daily run");
            let outcome = AssertUnwindSafe(self.drive(&mut run)).catch_unwind().await;

            match outcome {
                Ok(Ok(())) => run.finish(),
                Ok(Err(err)) => {
                    tracing::error!(error = %err, state = %run.state(), "Run failed");
                    self.report_run_failure(&mut run, &err.to_string()).await;
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    tracing::error!(panic = %message, state = %run.state(), "Stage panicked");
                    let err = DigestflowError::Panicked(message);
                    self.report_run_failure(&mut run, &err.to_string()).await;
                }
            }

            tracing::info!(
                state = %run.state(),
                stages = run.stages().len(),
                page_id = run.page_id.as_deref().unwrap_or(""),
                "Run finished"
            );
        }
        .instrument(span)
        .await;

        Ok(run)
    }

    async fn drive(&self, run: &mut PipelineRun) -> Result<()> {
        let source = TranscriptSource::for_run_date(&self.config.source_base_url, run.run_date)?;
        tracing::info!(url = %source.url, title = %source.title, "Resolved transcript source");
        run.source_url = source.url;
        run.title = source.title;

        if !self.fetch(run).await? {
            return Ok(());
        }
        if !self.summarize(run).await? {
            return Ok(());
        }
        if !self.generate_notes(run).await? {
            return Ok(());
        }
        if !self.persist(run).await? {
            return Ok(());
        }
        self.notify(run).await?;
        Ok(())
    }

    /// Returns `Ok(false)` when the run was aborted.
    async fn fetch(&self, run: &mut PipelineRun) -> Result<bool> {
        let stage = PipelineStage::Fetch;
        run.enter(stage)?;
        let started = Utc::now();
        let timer = SpanTimer::start();

        let url = run.source_url.clone();
        let fetcher = &self.collaborators.fetcher;
        let (result, attempts) = self
            .executor
            .execute_recorded(&self.retry.fetch, || fetcher.fetch(&url))
            .await;

        match result {
            Ok(fetched) => {
                tracing::info!(
                    chars = fetched.content.chars().count(),
                    page_title = fetched.title.as_deref().unwrap_or(""),
                    "Fetched transcript"
                );
                run.raw_content = Some(fetched.content);
                run.page_title = fetched.title;
                complete_stage(run, StageRecord::new(stage, StageOutcome::Success, started), timer)?;
                Ok(true)
            }
            Err(failure) => {
                let diagnostics = self.diagnostics(run, stage, &attempts, &failure);
                self.handle_failure(run, stage, started, timer, &failure, diagnostics)
                    .await
                    .map(|action| action != FailureAction::Abort)
            }
        }
    }

    async fn summarize(&self, run: &mut PipelineRun) -> Result<bool> {
        let stage = PipelineStage::Summarize;
        run.enter(stage)?;
        let started = Utc::now();
        let timer = SpanTimer::start();

        let content = transcript(run)?;
        let summarizer = &self.collaborators.summarizer;
        let (result, attempts) = self
            .executor
            .execute_recorded(&self.retry.summarize, || summarizer.summarize(&content))
            .await;

        match result {
            Ok(summary) => {
                tracing::info!(chars = summary.chars().count(), "Generated summary");
                run.summary_text = Some(summary);
                complete_stage(run, StageRecord::new(stage, StageOutcome::Success, started), timer)?;
                Ok(true)
            }
            Err(failure) => {
                let diagnostics = self.diagnostics(run, stage, &attempts, &failure);
                let action = self
                    .handle_failure(run, stage, started, timer, &failure, diagnostics)
                    .await?;
                if action == FailureAction::Degrade {
                    run.summary_text = Some(FALLBACK_SUMMARY.to_string());
                }
                Ok(action != FailureAction::Abort)
            }
        }
    }

    async fn generate_notes(&self, run: &mut PipelineRun) -> Result<bool> {
        let stage = PipelineStage::GenerateNotes;
        run.enter(stage)?;
        let started = Utc::now();
        let timer = SpanTimer::start();

        let content = transcript(run)?;
        let title = run.title.clone();
        let generator = &self.collaborators.note_generator;
        let (result, attempts) = self
            .executor
            .execute_recorded(&self.retry.notes, || generator.generate(&content, &title))
            .await;

        match result {
            Ok(notes) => {
                tracing::info!(chars = notes.chars().count(), "Generated study notes");
                run.notes_html = Some(notes);
                complete_stage(run, StageRecord::new(stage, StageOutcome::Success, started), timer)?;
                Ok(true)
            }
            Err(failure) => {
                let diagnostics = self.diagnostics(run, stage, &attempts, &failure);
                let action = self
                    .handle_failure(run, stage, started, timer, &failure, diagnostics)
                    .await?;
                if action == FailureAction::Degrade {
                    run.notes_html = Some(fallback_notes_html(
                        &title,
                        failure.category(),
                        &failure.last_error().message,
                        &content,
                    ));
                }
                Ok(action != FailureAction::Abort)
            }
        }
    }

    async fn persist(&self, run: &mut PipelineRun) -> Result<bool> {
        let stage = PipelineStage::Persist;
        run.enter(stage)?;
        let started = Utc::now();
        let timer = SpanTimer::start();

        let entry = ArchiveEntry {
            title: run.title.clone(),
            date: run.run_date,
            content: transcript(run)?,
            summary: summary_or_fallback(run).to_string(),
            notes_html: run.notes_html.clone(),
        };

        match self.collaborators.persister.save(&entry).await {
            Some(page_id) => {
                tracing::info!(page_id = %page_id, "Saved to document store");
                run.page_id = Some(page_id);
                complete_stage(run, StageRecord::new(stage, StageOutcome::Success, started), timer)?;
                Ok(true)
            }
            None => {
                let record = StageRecord::new(stage, StageOutcome::Failed, started)
                    .with_message("document store returned no page id");
                complete_stage(run, record, timer)?;
                Ok(self.continue_after(run, stage))
            }
        }
    }

    async fn notify(&self, run: &mut PipelineRun) -> Result<bool> {
        let stage = PipelineStage::Notify;
        run.enter(stage)?;
        let started = Utc::now();
        let timer = SpanTimer::start();

        let notes = match run.notes_html.clone() {
            Some(notes) => notes,
            None => fallback_notes_html(
                &run.title,
                FailureCategory::Unknown,
                "study notes unavailable",
                run.raw_content.as_deref().unwrap_or_default(),
            ),
        };
        let email = compose_digest_email(&run.title, summary_or_fallback(run), &notes);

        if self.collaborators.mailer.send(&email).await {
            tracing::info!(subject = %email.subject, "Study-note email sent");
            complete_stage(run, StageRecord::new(stage, StageOutcome::Success, started), timer)?;
            Ok(true)
        } else {
            let record = StageRecord::new(stage, StageOutcome::Failed, started)
                .with_message("mailer did not deliver the email");
            complete_stage(run, record, timer)?;
            Ok(self.continue_after(run, stage))
        }
    }

    /// Aborts the run if the policy says so for a failure without a remote
    /// error. Returns true if the run continues.
    fn continue_after(&self, run: &mut PipelineRun, stage: PipelineStage) -> bool {
        if self.failure_policy.action_for(stage) == FailureAction::Abort {
            run.abort(format!("{stage} failed"));
            false
        } else {
            true
        }
    }

    /// Records the failed stage, alerts if required and applies the policy.
    async fn handle_failure(
        &self,
        run: &mut PipelineRun,
        stage: PipelineStage,
        started: chrono::DateTime<Utc>,
        timer: SpanTimer,
        failure: &TerminalFailure,
        diagnostics: String,
    ) -> Result<FailureAction> {
        let action = self.failure_policy.action_for(stage);
        let outcome = match action {
            FailureAction::Degrade => StageOutcome::DegradedSuccess { fallback_used: true },
            FailureAction::Abort | FailureAction::Continue => StageOutcome::Failed,
        };

        let record = StageRecord::new(stage, outcome, started)
            .with_category(failure.category())
            .with_message(failure.to_string());
        complete_stage(run, record, timer)?;

        if self.failure_policy.should_alert(failure) {
            let alert = AlertEvent::from_failure(failure).with_diagnostics(diagnostics);
            self.dispatcher.notify(&alert).await;
        }

        if action == FailureAction::Abort {
            let reason = if stage == PipelineStage::Fetch {
                FetchError::new(run.source_url.clone(), failure.clone()).to_string()
            } else {
                format!("{stage} failed: {failure}")
            };
            run.abort(reason);
        }
        Ok(action)
    }

    fn diagnostics(
        &self,
        run: &PipelineRun,
        stage: PipelineStage,
        attempts: &[RetryAttempt],
        failure: &TerminalFailure,
    ) -> String {
        let mut lines = vec![
            format!("run id: {}", run.run_id),
            format!("stage: {stage}"),
            format!("attempts: {}", failure.attempts()),
        ];

        let delays: Vec<String> = attempts
            .iter()
            .filter_map(|a| a.delay_applied)
            .map(|d| format!("{}s", d.as_secs()))
            .collect();
        if !delays.is_empty() {
            lines.push(format!("retry delays: {}", delays.join(", ")));
        }

        let masked = |key: &Option<String>| key.as_deref().map_or_else(|| "unset".to_string(), mask_secret);
        match stage {
            PipelineStage::Fetch => {
                lines.push(format!("request url: {}", run.source_url));
                lines.push(format!("api key: {}", masked(&self.config.jina_api_key)));
            }
            PipelineStage::Summarize | PipelineStage::GenerateNotes => {
                let model = if stage == PipelineStage::Summarize {
                    &self.config.summary_model
                } else {
                    &self.config.notes_model
                };
                lines.push(format!("model: {model}"));
                lines.push(format!("api key: {}", masked(&self.config.gemini_api_key)));
                let chars = run.raw_content.as_deref().map_or(0, |c| c.chars().count());
                lines.push(format!("content length: {chars} chars"));
            }
            PipelineStage::Persist | PipelineStage::Notify => {}
        }

        lines.push(String::new());
        lines.push(failure.last_error().diagnostic());
        lines.join("\n")
    }

    async fn report_run_failure(&self, run: &mut PipelineRun, message: &str) {
        let diagnostics = format!(
            "run id: {}\nrun date: {}\nstate at failure: {}\ncompleted stages: {}\n\nconfiguration:\n{}",
            run.run_id,
            run.run_date,
            run.state(),
            run.stages()
                .iter()
                .map(|r| format!("{} ({})", r.stage, r.outcome))
                .collect::<Vec<_>>()
                .join(", "),
            self.config.presence_report(),
        );
        let alert = AlertEvent::run_failed(SYSTEM_NAME, format!("Daily run failed: {message}"))
            .with_diagnostics(diagnostics);
        self.dispatcher.notify(&alert).await;
        run.abort(message);
    }
}

fn complete_stage(run: &mut PipelineRun, record: StageRecord, timer: SpanTimer) -> Result<()> {
    log_stage(&record, timer.finish());
    run.record(record)
}

fn transcript(run: &PipelineRun) -> Result<String> {
    run.raw_content
        .clone()
        .ok_or_else(|| DigestflowError::Internal("transcript missing after fetch".to_string()))
}

fn summary_or_fallback(run: &PipelineRun) -> &str {
    run.summary_text.as_deref().unwrap_or(FALLBACK_SUMMARY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_retry_policies() {
        let retry = StageRetryPolicies::default();
        assert_eq!(retry.fetch.max_attempts, 3);
        assert_eq!(retry.summarize.max_attempts, 3);
        assert_eq!(retry.notes.max_attempts, 5);
    }
}
