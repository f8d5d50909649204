//! Scripted and recording collaborators for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

use crate::collaborators::{
    ArchiveEntry, ContentFetcher, FetchedContent, Mailer, NoteGenerator, OutgoingEmail, Persister,
    Summarizer,
};
use crate::errors::RemoteError;
use crate::pipeline::Sleeper;

/// A queue of results; the last one repeats once the queue runs dry.
#[derive(Debug)]
struct Script<T> {
    queue: Mutex<VecDeque<Result<T, RemoteError>>>,
    last: Mutex<Option<Result<T, RemoteError>>>,
    calls: Mutex<usize>,
}

impl<T: Clone> Script<T> {
    fn new(results: Vec<Result<T, RemoteError>>) -> Self {
        Self {
            queue: Mutex::new(results.into()),
            last: Mutex::new(None),
            calls: Mutex::new(0),
        }
    }

    fn next(&self, service: &str) -> Result<T, RemoteError> {
        *self.calls.lock() += 1;
        let next = self.queue.lock().pop_front();
        match next {
            Some(result) => {
                *self.last.lock() = Some(result.clone());
                result
            }
            None => self
                .last
                .lock()
                .clone()
                .unwrap_or_else(|| Err(RemoteError::new(service, "script is empty"))),
        }
    }

    fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

/// A fetcher returning scripted results and recording requested URLs.
#[derive(Debug)]
pub struct ScriptedFetcher {
    script: Script<FetchedContent>,
    urls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    /// Returns the given results in order, repeating the last.
    #[must_use]
    pub fn new(results: Vec<Result<FetchedContent, RemoteError>>) -> Self {
        Self {
            script: Script::new(results),
            urls: Mutex::new(Vec::new()),
        }
    }

    /// Always returns `content`.
    #[must_use]
    pub fn ok(content: impl Into<String>) -> Self {
        Self::new(vec![Ok(FetchedContent::new(content))])
    }

    /// Always fails with `error`.
    #[must_use]
    pub fn failing(error: RemoteError) -> Self {
        Self::new(vec![Err(error)])
    }

    /// Number of calls made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.script.calls()
    }

    /// URLs requested, in order.
    #[must_use]
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }
}

#[async_trait]
impl ContentFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedContent, RemoteError> {
        self.urls.lock().push(url.to_string());
        self.script.next("Jina AI")
    }
}

/// A summarizer returning scripted results.
#[derive(Debug)]
pub struct ScriptedSummarizer {
    script: Script<String>,
}

impl ScriptedSummarizer {
    /// Returns the given results in order, repeating the last.
    #[must_use]
    pub fn new(results: Vec<Result<String, RemoteError>>) -> Self {
        Self {
            script: Script::new(results),
        }
    }

    /// Always returns `summary`.
    #[must_use]
    pub fn ok(summary: impl Into<String>) -> Self {
        Self::new(vec![Ok(summary.into())])
    }

    /// Always fails with `error`.
    #[must_use]
    pub fn failing(error: RemoteError) -> Self {
        Self::new(vec![Err(error)])
    }

    /// Number of calls made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.script.calls()
    }
}

#[async_trait]
impl Summarizer for ScriptedSummarizer {
    async fn summarize(&self, _content: &str) -> Result<String, RemoteError> {
        self.script.next("Gemini AI")
    }
}

/// A note generator returning scripted results.
#[derive(Debug)]
pub struct ScriptedNoteGenerator {
    script: Script<String>,
    titles: Mutex<Vec<String>>,
}

impl ScriptedNoteGenerator {
    /// Returns the given results in order, repeating the last.
    #[must_use]
    pub fn new(results: Vec<Result<String, RemoteError>>) -> Self {
        Self {
            script: Script::new(results),
            titles: Mutex::new(Vec::new()),
        }
    }

    /// Always returns `html`.
    #[must_use]
    pub fn ok(html: impl Into<String>) -> Self {
        Self::new(vec![Ok(html.into())])
    }

    /// Always fails with `error`.
    #[must_use]
    pub fn failing(error: RemoteError) -> Self {
        Self::new(vec![Err(error)])
    }

    /// Number of calls made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.script.calls()
    }

    /// Titles passed in, in order.
    #[must_use]
    pub fn titles(&self) -> Vec<String> {
        self.titles.lock().clone()
    }
}

#[async_trait]
impl NoteGenerator for ScriptedNoteGenerator {
    async fn generate(&self, _content: &str, title: &str) -> Result<String, RemoteError> {
        self.titles.lock().push(title.to_string());
        self.script.next("Gemini AI")
    }
}

/// A summarizer that panics, for exercising the run guard.
#[derive(Debug, Default)]
pub struct PanickingSummarizer;

#[async_trait]
impl Summarizer for PanickingSummarizer {
    async fn summarize(&self, _content: &str) -> Result<String, RemoteError> {
        panic!("summarizer exploded")
    }
}

/// A persister recording every entry it is asked to save.
#[derive(Debug)]
pub struct RecordingPersister {
    page_id: Option<String>,
    entries: Mutex<Vec<ArchiveEntry>>,
}

impl RecordingPersister {
    /// Succeeds with the given page id.
    #[must_use]
    pub fn new(page_id: impl Into<String>) -> Self {
        Self {
            page_id: Some(page_id.into()),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Always returns `None`.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            page_id: None,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Entries received, in order.
    #[must_use]
    pub fn entries(&self) -> Vec<ArchiveEntry> {
        self.entries.lock().clone()
    }
}

#[async_trait]
impl Persister for RecordingPersister {
    async fn save(&self, entry: &ArchiveEntry) -> Option<String> {
        self.entries.lock().push(entry.clone());
        self.page_id.clone()
    }
}

/// A mailer recording every email it is asked to send.
#[derive(Debug)]
pub struct RecordingMailer {
    deliver: bool,
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl Default for RecordingMailer {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingMailer {
    /// Accepts every email.
    #[must_use]
    pub fn new() -> Self {
        Self {
            deliver: true,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Records every email but reports failure.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            deliver: false,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Emails received, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> bool {
        self.sent.lock().push(email.clone());
        self.deliver
    }
}

/// A mailer whose transport panics on every send.
#[derive(Debug, Default)]
pub struct PanickingMailer;

#[async_trait]
impl Mailer for PanickingMailer {
    async fn send(&self, _email: &OutgoingEmail) -> bool {
        panic!("alert transport exploded")
    }
}

/// A sleeper that returns immediately and records requested delays.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested, in order.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
    }
}
