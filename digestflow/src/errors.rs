//! Error types for the digestflow pipeline.
//!
//! Remote collaborators surface [`RemoteError`]s, the retry executor turns
//! them into [`TerminalFailure`]s, and everything the orchestrator cannot
//! absorb as a degraded stage is a [`DigestflowError`].

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classify::FailureCategory;

#[allow(clippy::unwrap_used)]
static LEADING_STATUS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([1-5]\d{2})\b").unwrap());

/// The main error type for digestflow operations.
#[derive(Debug, Error)]
pub enum DigestflowError {
    /// Configuration was missing or invalid.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// The transcript source URL could not be resolved.
    #[error("Source resolution error: {0}")]
    Source(String),

    /// Building an outgoing message failed.
    #[error("Mail error: {0}")]
    Mail(String),

    /// A stage panicked.
    #[error("Stage panicked: {0}")]
    Panicked(String),

    /// A generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, DigestflowError>;

/// How a remote failure surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteErrorKind {
    /// The service answered with a non-success HTTP status.
    Http,
    /// No response was received (connect error, timeout, reset).
    Transport,
    /// The service answered successfully but the body lacked expected fields.
    MalformedResponse,
    /// A provider-level error that only carries a message.
    Provider,
}

/// A raw failure signal from a remote collaborator.
///
/// This is the only input the classifier looks at, so adapters must put the
/// HTTP status into `status` whenever one is known.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{service}: {message}")]
pub struct RemoteError {
    /// Human-readable collaborator name (e.g. "Gemini AI").
    pub service: String,
    /// How the failure surfaced.
    pub kind: RemoteErrorKind,
    /// HTTP status code, when one was observed.
    pub status: Option<u16>,
    /// Textual description of the failure.
    pub message: String,
    /// Expected fields that were absent from the response.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_fields: Vec<String>,
    /// Extra diagnostic key-value pairs (request URL, model, ...).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, String>,
}

impl RemoteError {
    /// Creates a provider error from a message.
    ///
    /// A leading status token such as `"429 Resource has been exhausted"` is
    /// lifted into `status`.
    #[must_use]
    pub fn new(service: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        let status = LEADING_STATUS
            .captures(&message)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok());

        Self {
            service: service.into(),
            kind: RemoteErrorKind::Provider,
            status,
            message,
            missing_fields: Vec::new(),
            context: HashMap::new(),
        }
    }

    /// Creates an error for a non-success HTTP status.
    #[must_use]
    pub fn http(service: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            kind: RemoteErrorKind::Http,
            status: Some(status),
            message: message.into(),
            missing_fields: Vec::new(),
            context: HashMap::new(),
        }
    }

    /// Creates an error for a request that never got a response.
    #[must_use]
    pub fn transport(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            kind: RemoteErrorKind::Transport,
            status: None,
            message: message.into(),
            missing_fields: Vec::new(),
            context: HashMap::new(),
        }
    }

    /// Creates an error for a response lacking the given fields.
    #[must_use]
    pub fn malformed<I, S>(service: impl Into<String>, missing: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            service: service.into(),
            kind: RemoteErrorKind::MalformedResponse,
            status: None,
            message: message.into(),
            missing_fields: missing.into_iter().map(Into::into).collect(),
            context: HashMap::new(),
        }
    }

    /// Adds a diagnostic context entry.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Returns true if the response was structurally incomplete.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        self.kind == RemoteErrorKind::MalformedResponse || !self.missing_fields.is_empty()
    }

    /// Renders the error and its context as a diagnostic block.
    #[must_use]
    pub fn diagnostic(&self) -> String {
        let mut lines = vec![
            format!("service: {}", self.service),
            format!("kind: {:?}", self.kind),
        ];
        if let Some(status) = self.status {
            lines.push(format!("status: {status}"));
        }
        if !self.missing_fields.is_empty() {
            lines.push(format!("missing fields: {}", self.missing_fields.join(", ")));
        }
        let mut context: Vec<_> = self.context.iter().collect();
        context.sort();
        for (key, value) in context {
            lines.push(format!("{key}: {value}"));
        }
        lines.push(format!("error: {}", self.message));
        lines.join("\n")
    }
}

/// Terminal outcome of a retried operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TerminalFailure {
    /// Every attempt failed with a transient error.
    #[error("retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// The error from the final attempt.
        last_error: RemoteError,
    },

    /// A non-transient failure stopped the retry loop.
    #[error("{category} failure on attempt {attempt}: {error}")]
    NonRetryable {
        /// Classified category of the failure.
        category: FailureCategory,
        /// Attempt on which the failure happened.
        attempt: u32,
        /// The underlying error.
        error: RemoteError,
    },
}

impl TerminalFailure {
    /// Returns the category that ended the retry loop.
    #[must_use]
    pub fn category(&self) -> FailureCategory {
        match self {
            Self::RetriesExhausted { .. } => FailureCategory::Transient,
            Self::NonRetryable { category, .. } => *category,
        }
    }

    /// Returns the last observed error.
    #[must_use]
    pub fn last_error(&self) -> &RemoteError {
        match self {
            Self::RetriesExhausted { last_error, .. } => last_error,
            Self::NonRetryable { error, .. } => error,
        }
    }

    /// Returns how many attempts were made.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::RetriesExhausted { attempts, .. } => *attempts,
            Self::NonRetryable { attempt, .. } => *attempt,
        }
    }

    /// Returns true if the retry budget was used up on transient errors.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::RetriesExhausted { .. })
    }

    /// Returns true if this failure must be reported to an operator.
    #[must_use]
    pub fn is_notifiable(&self) -> bool {
        self.is_exhausted() || self.category().is_notifiable()
    }

    /// Short label used as the alert's error type.
    #[must_use]
    pub fn alert_label(&self) -> String {
        if self.is_exhausted() {
            "Retries exhausted".to_string()
        } else {
            self.category().label().to_string()
        }
    }
}

/// Fatal failure of the fetch stage.
#[derive(Debug, Clone, Error)]
#[error("content fetch failed for {url}: {failure}")]
pub struct FetchError {
    /// Transcript URL that was requested.
    pub url: String,
    /// Terminal failure from the retry executor.
    pub failure: TerminalFailure,
}

impl FetchError {
    /// Creates a new fetch error.
    #[must_use]
    pub fn new(url: impl Into<String>, failure: TerminalFailure) -> Self {
        Self {
            url: url.into(),
            failure,
        }
    }

    /// Returns the category of the underlying failure.
    #[must_use]
    pub fn category(&self) -> FailureCategory {
        self.failure.category()
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Required values are absent. Only names are carried, never values.
    #[error("missing required configuration: {}", .0.join(", "))]
    Missing(Vec<String>),

    /// A value was present but could not be parsed.
    #[error("invalid value for {key}: {reason}")]
    Invalid {
        /// Variable name.
        key: String,
        /// Why it was rejected.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_remote_error_lifts_leading_status() {
        let err = RemoteError::new("Gemini AI", "429 Resource has been exhausted (e.g. check quota).");
        assert_eq!(err.status, Some(429));
        assert_eq!(err.kind, RemoteErrorKind::Provider);

        let err = RemoteError::new("Gemini AI", "model returned 500 tokens");
        assert_eq!(err.status, None);
    }

    #[test]
    fn test_remote_error_malformed() {
        let err = RemoteError::malformed("Jina AI", ["data.content"], "unexpected body");
        assert!(err.is_malformed());
        assert_eq!(err.missing_fields, vec!["data.content".to_string()]);
        assert!(!RemoteError::http("Jina AI", 404, "not found").is_malformed());
    }

    #[test]
    fn test_remote_error_diagnostic_is_sorted() {
        let err = RemoteError::http("Jina AI", 403, "forbidden")
            .with_context("url", "http://example.com")
            .with_context("attempt", "1");
        let diag = err.diagnostic();

        assert!(diag.contains("status: 403"));
        let attempt = diag.find("attempt: 1").unwrap();
        let url = diag.find("url: http://example.com").unwrap();
        assert!(attempt < url);
        assert!(diag.ends_with("error: forbidden"));
    }

    #[test]
    fn test_terminal_failure_accessors() {
        let exhausted = TerminalFailure::RetriesExhausted {
            attempts: 3,
            last_error: RemoteError::http("Gemini AI", 503, "UNAVAILABLE"),
        };
        assert_eq!(exhausted.category(), FailureCategory::Transient);
        assert_eq!(exhausted.attempts(), 3);
        assert!(exhausted.is_notifiable());
        assert_eq!(exhausted.alert_label(), "Retries exhausted");

        let auth = TerminalFailure::NonRetryable {
            category: FailureCategory::AuthInvalid,
            attempt: 1,
            error: RemoteError::http("Gemini AI", 401, "bad key"),
        };
        assert_eq!(auth.category(), FailureCategory::AuthInvalid);
        assert!(!auth.is_exhausted());
        assert_eq!(auth.last_error().status, Some(401));
    }

    #[test]
    fn test_config_error_lists_names() {
        let err = ConfigError::Missing(vec!["NOTION_API_KEY".into(), "NOTION_DATABASE_ID".into()]);
        assert_eq!(
            err.to_string(),
            "missing required configuration: NOTION_API_KEY, NOTION_DATABASE_ID"
        );
    }
}
