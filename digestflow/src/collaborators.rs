//! Collaborator traits consumed by the orchestrator.
//!
//! Remote steps (fetch, summarize, note generation) report failures as
//! [`RemoteError`] so they can be classified and retried. The persister and
//! mailer absorb their own failures and report them through their return
//! value.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::RemoteError;

/// Transcript text returned by a [`ContentFetcher`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedContent {
    /// Extracted page text.
    pub content: String,
    /// Page title, when the service reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl FetchedContent {
    /// Creates fetched content without a title.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            title: None,
        }
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Everything written to the document store for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    /// Page title.
    pub title: String,
    /// Date recorded on the page.
    pub date: NaiveDate,
    /// Full transcript text.
    pub content: String,
    /// Summary text, real or fallback.
    pub summary: String,
    /// Study notes HTML, real or fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes_html: Option<String>,
}

/// A fully composed email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingEmail {
    /// Subject line.
    pub subject: String,
    /// HTML alternative.
    pub html_body: String,
    /// Plain-text alternative.
    pub text_body: String,
}

/// Retrieves the transcript page.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetches the readable content of `url`.
    ///
    /// A non-2xx answer carries its status; a body without content is a
    /// malformed-response error.
    async fn fetch(&self, url: &str) -> Result<FetchedContent, RemoteError>;
}

/// Produces the short summary.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarizes the transcript.
    async fn summarize(&self, content: &str) -> Result<String, RemoteError>;
}

/// Produces the HTML study notes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NoteGenerator: Send + Sync {
    /// Generates notes for the transcript under the given title.
    async fn generate(&self, content: &str, title: &str) -> Result<String, RemoteError>;
}

/// Archives a run to the document store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Persister: Send + Sync {
    /// Saves the entry and returns the new page id, or `None` on any failure.
    async fn save(&self, entry: &ArchiveEntry) -> Option<String>;
}

/// Delivers email.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends the email; returns true on delivery.
    async fn send(&self, email: &OutgoingEmail) -> bool;
}
