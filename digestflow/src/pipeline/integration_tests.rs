//! End-to-end tests for the daily run.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use crate::classify::FailureCategory;
    use crate::collaborators::FetchedContent;
    use crate::config::AppConfig;
    use crate::core::{PipelineStage, RunState, StageOutcome};
    use crate::errors::{ConfigError, RemoteError};
    use crate::pipeline::FALLBACK_SUMMARY;
    use crate::testing::{
        test_config, test_run_date, PanickingMailer, PanickingSummarizer, RecordingMailer, RecordingPersister,
        ScriptedFetcher, ScriptedNoteGenerator, ScriptedSummarizer, TestHarness,
    };

    fn outcomes(run: &crate::core::PipelineRun) -> Vec<(PipelineStage, StageOutcome)> {
        run.stages().iter().map(|r| (r.stage, r.outcome)).collect()
    }

    #[tokio::test]
    async fn test_happy_path() {
        let harness = TestHarness::new();
        let run = harness.orchestrator().run(test_run_date()).await.unwrap();

        assert_eq!(run.state(), RunState::Done);
        assert_eq!(
            outcomes(&run),
            PipelineStage::ORDER
                .into_iter()
                .map(|s| (s, StageOutcome::Success))
                .collect::<Vec<_>>()
        );
        assert_eq!(run.title, "2025年02月28日新闻联播");
        assert_eq!(run.page_id.as_deref(), Some("page-1"));

        let urls = harness.fetcher.urls();
        assert_eq!(urls.len(), 1);
        assert!(urls[0].starts_with("http://mrxwlb.com/2025/02/28/"));

        let entries = harness.persister.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].summary, "整体摘要");
        assert_eq!(entries[0].notes_html.as_deref(), Some("<h1>学习笔记</h1>"));
        assert_eq!(entries[0].date, test_run_date());

        let sent = harness.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "【新闻联播学习笔记】2025年02月28日新闻联播");
        assert!(sent[0].html_body.contains("<h1>学习笔记</h1>"));
        assert!(sent[0].text_body.contains("整体摘要"));

        assert!(harness.alerts.sent().is_empty());
        assert!(harness.sleeper.sleeps().is_empty());
        assert_eq!(harness.notes.titles(), vec!["2025年02月28日新闻联播".to_string()]);
    }

    #[tokio::test]
    async fn test_summarize_exhausted_degrades_with_one_alert() {
        let harness = TestHarness::new().with_summarizer(ScriptedSummarizer::failing(
            RemoteError::new("Gemini AI", "503 UNAVAILABLE: The model is overloaded."),
        ));
        let run = harness.orchestrator().run(test_run_date()).await.unwrap();

        assert_eq!(run.state(), RunState::Done);
        assert_eq!(run.summary_text.as_deref(), Some(FALLBACK_SUMMARY));
        assert_eq!(
            run.outcome_of(PipelineStage::Summarize),
            Some(StageOutcome::DegradedSuccess { fallback_used: true })
        );
        assert_eq!(run.stages()[1].category, Some(FailureCategory::Transient));
        assert_eq!(harness.summarizer.call_count(), 3);
        assert_eq!(
            harness.sleeper.sleeps(),
            vec![Duration::from_secs(4), Duration::from_secs(8)]
        );

        let alerts = harness.alerts.sent();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].subject, "[API alert] Gemini AI failure");
        assert!(alerts[0].text_body.contains("Error type: Retries exhausted"));

        assert_eq!(harness.persister.entries()[0].summary, FALLBACK_SUMMARY);
        let sent = harness.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].text_body.contains(FALLBACK_SUMMARY));
    }

    #[tokio::test]
    async fn test_fetch_auth_failure_aborts_without_persist_or_email() {
        let harness = TestHarness::new().with_fetcher(ScriptedFetcher::failing(RemoteError::http(
            "Jina AI",
            401,
            "Unauthorized",
        )));
        let run = harness.orchestrator().run(test_run_date()).await.unwrap();

        assert_eq!(run.state(), RunState::Aborted);
        assert_eq!(outcomes(&run), vec![(PipelineStage::Fetch, StageOutcome::Failed)]);
        assert!(run
            .abort_reason
            .as_deref()
            .unwrap()
            .starts_with("content fetch failed for http://mrxwlb.com/2025/02/28/"));
        assert_eq!(harness.fetcher.call_count(), 1);
        assert_eq!(harness.summarizer.call_count(), 0);
        assert!(harness.persister.entries().is_empty());
        assert!(harness.mailer.sent().is_empty());
        assert!(harness.sleeper.sleeps().is_empty());

        let alerts = harness.alerts.sent();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].subject, "[API alert] Jina AI failure");
        assert!(alerts[0].text_body.contains("Error type: Invalid API key"));
        assert!(alerts[0].text_body.contains("request url: http://mrxwlb.com/2025/02/28/"));
    }

    #[tokio::test]
    async fn test_fetch_failure_of_any_category_aborts() {
        let errors = [
            RemoteError::http("Jina AI", 503, "Service Unavailable"),
            RemoteError::http("Jina AI", 404, "Not Found"),
            RemoteError::malformed("Jina AI", ["data.content"], "unexpected body"),
            RemoteError::transport("Jina AI", "connection reset"),
        ];

        for error in errors {
            let harness = TestHarness::new().with_fetcher(ScriptedFetcher::failing(error.clone()));
            let run = harness.orchestrator().run(test_run_date()).await.unwrap();

            assert_eq!(run.state(), RunState::Aborted, "{error}");
            assert!(run.abort_reason.is_some());
            assert!(harness.persister.entries().is_empty(), "{error}");
            assert!(harness.mailer.sent().is_empty(), "{error}");
            assert_eq!(harness.alerts.sent().len(), 1, "{error}");
        }
    }

    #[tokio::test]
    async fn test_fetch_recovers_after_transient() {
        let harness = TestHarness::new().with_fetcher(ScriptedFetcher::new(vec![
            Err(RemoteError::transport("Jina AI", "operation timed out")),
            Ok(FetchedContent::new("正文").with_title("页面标题")),
        ]));
        let run = harness.orchestrator().run(test_run_date()).await.unwrap();

        assert_eq!(run.state(), RunState::Done);
        assert_eq!(run.raw_content.as_deref(), Some("正文"));
        assert_eq!(run.page_title.as_deref(), Some("页面标题"));
        assert_eq!(harness.fetcher.call_count(), 2);
        assert_eq!(harness.sleeper.sleeps(), vec![Duration::from_secs(4)]);
        assert!(harness.alerts.sent().is_empty());
    }

    #[tokio::test]
    async fn test_missing_persistence_config_never_starts() {
        let mut config = test_config();
        config.notion_api_key = None;
        config.notion_database_id = Some(String::new());

        let harness = TestHarness::new().with_config(config);
        let err = harness.orchestrator().run(test_run_date()).await.unwrap_err();

        assert_eq!(
            err,
            ConfigError::Missing(vec![
                "NOTION_API_KEY".to_string(),
                "NOTION_DATABASE_ID".to_string()
            ])
        );
        assert_eq!(harness.fetcher.call_count(), 0);
        assert_eq!(harness.summarizer.call_count(), 0);
        assert_eq!(harness.notes.call_count(), 0);
        assert!(harness.persister.entries().is_empty());
        assert!(harness.mailer.sent().is_empty());
        assert!(harness.alerts.sent().is_empty());
    }

    #[tokio::test]
    async fn test_notes_quota_uses_fallback_for_store_and_email() {
        let harness = TestHarness::new().with_notes(ScriptedNoteGenerator::failing(
            RemoteError::http("Gemini AI", 429, "Resource has been exhausted (e.g. check quota)."),
        ));
        let run = harness.orchestrator().run(test_run_date()).await.unwrap();

        assert_eq!(run.state(), RunState::Done);
        assert_eq!(harness.notes.call_count(), 1);
        assert!(run.outcome_of(PipelineStage::GenerateNotes).unwrap().used_fallback());

        let notes = run.notes_html.clone().unwrap();
        assert!(notes.contains("笔记生成失败"));
        assert!(notes.contains("Quota exceeded"));

        assert_eq!(harness.persister.entries()[0].notes_html.as_deref(), Some(notes.as_str()));
        assert!(harness.mailer.sent()[0].html_body.contains(&notes));

        let alerts = harness.alerts.sent();
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].text_body.contains("Error type: Quota exceeded"));
        assert!(alerts[0].text_body.contains("model: gemini-2.5-pro"));
    }

    #[tokio::test]
    async fn test_notes_exhaust_five_attempts() {
        let harness = TestHarness::new().with_notes(ScriptedNoteGenerator::failing(
            RemoteError::new("Gemini AI", "An internal error has occurred."),
        ));
        let run = harness.orchestrator().run(test_run_date()).await.unwrap();

        assert_eq!(run.state(), RunState::Done);
        assert_eq!(harness.notes.call_count(), 5);
        assert_eq!(
            harness.sleeper.sleeps(),
            vec![
                Duration::from_secs(4),
                Duration::from_secs(8),
                Duration::from_secs(10),
                Duration::from_secs(10),
            ]
        );
        assert_eq!(harness.alerts.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_persist_failure_still_emails() {
        let harness = TestHarness::new().with_persister(RecordingPersister::failing());
        let run = harness.orchestrator().run(test_run_date()).await.unwrap();

        assert_eq!(run.state(), RunState::Done);
        assert_eq!(run.outcome_of(PipelineStage::Persist), Some(StageOutcome::Failed));
        assert!(run.page_id.is_none());
        assert_eq!(harness.mailer.sent().len(), 1);
        assert!(harness.alerts.sent().is_empty());
    }

    #[tokio::test]
    async fn test_mail_failure_still_done() {
        let harness = TestHarness::new().with_mailer(RecordingMailer::failing());
        let run = harness.orchestrator().run(test_run_date()).await.unwrap();

        assert_eq!(run.state(), RunState::Done);
        assert_eq!(run.outcome_of(PipelineStage::Notify), Some(StageOutcome::Failed));
        assert!(harness.alerts.sent().is_empty());
    }

    #[tokio::test]
    async fn test_panic_is_guarded_with_config_snapshot() {
        let harness = TestHarness::new().with_summarizer_impl(Arc::new(PanickingSummarizer));
        let run = harness.orchestrator().run(test_run_date()).await.unwrap();

        assert_eq!(run.state(), RunState::Aborted);
        assert_eq!(outcomes(&run), vec![(PipelineStage::Fetch, StageOutcome::Success)]);
        assert!(run.raw_content.is_some());
        assert!(harness.persister.entries().is_empty());
        assert!(harness.mailer.sent().is_empty());

        let alerts = harness.alerts.sent();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].subject, "[API alert] Digestflow failure");
        assert!(alerts[0].text_body.contains("summarizer exploded"));
        assert!(alerts[0].text_body.contains("- GEMINI_API_KEY: set"));
        assert!(!alerts[0].text_body.contains("AIzaSy-test-0123456789"));
    }

    #[tokio::test]
    async fn test_panicking_alert_mailer_does_not_escape_run() {
        let harness = TestHarness::new()
            .with_summarizer(ScriptedSummarizer::failing(RemoteError::http(
                "Gemini AI",
                401,
                "API key not valid. Please pass a valid API key.",
            )))
            .with_alert_mailer_impl(Arc::new(PanickingMailer));
        let run = harness.orchestrator().run(test_run_date()).await.unwrap();

        assert_eq!(run.state(), RunState::Done);
        assert_eq!(
            run.outcome_of(PipelineStage::Summarize),
            Some(StageOutcome::DegradedSuccess { fallback_used: true })
        );
        assert_eq!(harness.mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_panicking_alert_mailer_during_guard_report() {
        let harness = TestHarness::new()
            .with_summarizer_impl(Arc::new(PanickingSummarizer))
            .with_alert_mailer_impl(Arc::new(PanickingMailer));
        let run = harness.orchestrator().run(test_run_date()).await.unwrap();

        assert_eq!(run.state(), RunState::Aborted);
        assert!(harness.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_alert_diagnostics_mask_key() {
        let harness = TestHarness::new().with_summarizer(ScriptedSummarizer::failing(
            RemoteError::http("Gemini AI", 403, "Permission denied on resource project"),
        ));
        harness.orchestrator().run(test_run_date()).await.unwrap();

        let alerts = harness.alerts.sent();
        assert_eq!(alerts.len(), 1);
        let text = &alerts[0].text_body;
        assert!(text.contains("Error type: Permission denied"));
        assert!(text.contains("api key: AIzaSy-tes...****"));
        assert!(!text.contains("AIzaSy-test-0123456789"));
        assert!(text.contains("model: gemini-2.5-flash"));
    }

    #[tokio::test]
    async fn test_invalid_source_url_aborts_with_alert() {
        let config = test_config().with_source_base_url("not a url");
        let harness = TestHarness::new().with_config(config);
        let run = harness.orchestrator().run(test_run_date()).await.unwrap();

        assert_eq!(run.state(), RunState::Aborted);
        assert!(run.stages().is_empty());
        assert_eq!(harness.fetcher.call_count(), 0);
        assert_eq!(harness.alerts.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_run_report_serializes() {
        let harness = TestHarness::new();
        let run = harness.orchestrator().run(test_run_date()).await.unwrap();

        let report = serde_json::to_value(&run).unwrap();
        assert_eq!(report["state"], "done");
        assert_eq!(report["stages"].as_array().unwrap().len(), 5);
        assert_eq!(report["stages"][0]["outcome"]["status"], "success");
    }

    #[test]
    fn test_config_fixture_is_complete() {
        assert!(test_config().missing_required().is_empty());
        assert_eq!(AppConfig::new().missing_required().len(), 7);
    }
}
