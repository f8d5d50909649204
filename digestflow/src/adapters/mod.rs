//! Production implementations of the collaborator traits.
//!
//! Each adapter maps its service's failures onto [`RemoteError`] with the
//! HTTP status filled in whenever one was observed, so classification works
//! the same for every service.

mod gemini;
mod jina;
mod notion;
mod smtp;

pub use gemini::{notes_prompt, strip_code_fences, summary_prompt, GeminiClient, GEMINI_API_BASE};
pub use jina::{JinaReader, JINA_READER_URL};
pub use notion::{NotionArchive, NOTION_API_BASE, NOTION_VERSION};
pub use smtp::SmtpMailer;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::errors::{DigestflowError, RemoteError, Result};
use crate::notify::NotificationDispatcher;
use crate::pipeline::Collaborators;
use crate::utils::excerpt;

/// Characters of a response body kept in error messages.
const BODY_EXCERPT_CHARS: usize = 500;

/// Builds the shared HTTP client.
pub fn http_client(config: &AppConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.timeout())
        .user_agent(concat!("digestflow/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| DigestflowError::Internal(format!("failed to create HTTP client: {e}")))
}

/// Wires every collaborator and the alert dispatcher from a validated config.
pub fn build_collaborators(config: &AppConfig) -> Result<(Collaborators, NotificationDispatcher)> {
    config.validate()?;

    let client = http_client(config)?;
    let gemini = Arc::new(GeminiClient::new(client.clone(), config));

    let recipient = config.recipient_email.as_deref().unwrap_or_default();
    let mailer = Arc::new(SmtpMailer::new(config, recipient)?);

    let alert_mailer = match config.alert_recipient() {
        Some(alert) if alert != recipient => Arc::new(SmtpMailer::new(config, alert)?),
        _ => mailer.clone(),
    };

    let collaborators = Collaborators {
        fetcher: Arc::new(JinaReader::new(client.clone(), config)),
        summarizer: gemini.clone(),
        note_generator: gemini,
        persister: Arc::new(NotionArchive::new(client, config)),
        mailer,
    };

    Ok((collaborators, NotificationDispatcher::new(alert_mailer)))
}

/// Maps a failed request to a remote error.
pub(crate) fn request_error(service: &str, err: &reqwest::Error) -> RemoteError {
    match err.status() {
        Some(status) => RemoteError::http(service, status.as_u16(), err.to_string()),
        None => RemoteError::transport(service, err.to_string()),
    }
}

/// Reads a non-success response into a remote error.
pub(crate) async fn status_error(service: &str, response: reqwest::Response) -> RemoteError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    RemoteError::http(
        service,
        status.as_u16(),
        format!("HTTP {status}: {}", excerpt(&body, BODY_EXCERPT_CHARS)),
    )
}

/// Reads a success response as JSON.
///
/// A body that is not JSON is a malformed response, not a transport failure.
pub(crate) async fn json_body(
    service: &str,
    response: reqwest::Response,
    expected: &str,
) -> std::result::Result<serde_json::Value, RemoteError> {
    let text = response.text().await.map_err(|e| request_error(service, &e))?;
    serde_json::from_str(&text).map_err(|e| {
        RemoteError::malformed(
            service,
            [expected],
            format!("invalid JSON body ({e}): {}", excerpt(&text, BODY_EXCERPT_CHARS)),
        )
    })
}

/// Renders a JSON body for an error message, truncated.
pub(crate) fn body_excerpt(body: &serde_json::Value) -> String {
    excerpt(&body.to_string(), BODY_EXCERPT_CHARS).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_config;

    #[test]
    fn test_build_collaborators_rejects_incomplete_config() {
        let Err(err) = build_collaborators(&AppConfig::new()) else {
            panic!("incomplete config must be rejected");
        };
        assert!(matches!(err, DigestflowError::Config(_)));
    }

    #[tokio::test]
    async fn test_build_collaborators_from_complete_config() {
        assert!(build_collaborators(&test_config()).is_ok());
    }

    #[test]
    fn test_body_excerpt_truncates() {
        let body = serde_json::json!({ "text": "x".repeat(1000) });
        assert_eq!(body_excerpt(&body).chars().count(), BODY_EXCERPT_CHARS);
    }
}
