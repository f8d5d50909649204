//! Jina reader client.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::{body_excerpt, json_body, request_error, status_error};
use crate::collaborators::{ContentFetcher, FetchedContent};
use crate::config::AppConfig;
use crate::errors::RemoteError;

/// Reader endpoint.
pub const JINA_READER_URL: &str = "https://r.jina.ai/";

const SERVICE: &str = "Jina AI";

#[derive(Debug, Serialize)]
struct ReadRequest<'a> {
    url: &'a str,
}

/// Fetches page text through the Jina reader API.
pub struct JinaReader {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl std::fmt::Debug for JinaReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JinaReader")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl JinaReader {
    /// Creates a reader using the configured key.
    #[must_use]
    pub fn new(client: reqwest::Client, config: &AppConfig) -> Self {
        Self {
            client,
            api_key: config.jina_api_key.clone().unwrap_or_default(),
            endpoint: JINA_READER_URL.to_string(),
        }
    }

    /// Points the reader at another endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl ContentFetcher for JinaReader {
    async fn fetch(&self, url: &str) -> Result<FetchedContent, RemoteError> {
        tracing::info!(url = %url, "Reading page with Jina");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&ReadRequest { url })
            .send()
            .await
            .map_err(|e| request_error(SERVICE, &e).with_context("request url", url))?;

        if !response.status().is_success() {
            return Err(status_error(SERVICE, response)
                .await
                .with_context("request url", url));
        }

        let body = json_body(SERVICE, response, "data")
            .await
            .map_err(|e| e.with_context("request url", url))?;

        parse_response(&body).map_err(|e| e.with_context("request url", url))
    }
}

/// Extracts `data.content` and `data.title` from a reader response.
fn parse_response(body: &Value) -> Result<FetchedContent, RemoteError> {
    let data = &body["data"];
    let Some(content) = data["content"].as_str() else {
        return Err(RemoteError::malformed(
            SERVICE,
            ["data.content"],
            format!("unexpected response format: {}", body_excerpt(body)),
        ));
    };

    let fetched = FetchedContent::new(content);
    Ok(match data["title"].as_str() {
        Some(title) if !title.trim().is_empty() => fetched.with_title(title),
        _ => fetched,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{classify, FailureCategory};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_content_and_title() {
        let body = json!({
            "code": 200,
            "data": { "title": "新闻联播文字版", "content": "今天的主要内容有" }
        });
        let fetched = parse_response(&body).unwrap();
        assert_eq!(fetched.content, "今天的主要内容有");
        assert_eq!(fetched.title.as_deref(), Some("新闻联播文字版"));
    }

    #[test]
    fn test_missing_content_is_malformed() {
        let body = json!({ "code": 200, "data": { "title": "x" } });
        let err = parse_response(&body).unwrap_err();
        assert_eq!(err.missing_fields, vec!["data.content".to_string()]);
        assert_eq!(classify(&err), FailureCategory::MalformedResponse);

        let err = parse_response(&json!({ "error": "nope" })).unwrap_err();
        assert!(err.is_malformed());
    }

    /// Serves one canned HTTP response on a local port.
    async fn serve_once(status_line: &'static str, content_type: &'static str, body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "{status_line}\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}/")
    }

    #[tokio::test]
    async fn test_non_json_success_body_is_malformed() {
        let endpoint = serve_once("HTTP/1.1 200 OK", "text/html", "<html>not json</html>").await;
        let reader = JinaReader::new(reqwest::Client::new(), &AppConfig::new()).with_endpoint(endpoint);

        let err = reader.fetch("http://example.com/page").await.unwrap_err();
        assert_eq!(err.kind, crate::errors::RemoteErrorKind::MalformedResponse);
        assert_eq!(err.missing_fields, vec!["data".to_string()]);
        assert!(err.message.contains("<html>not json</html>"));
        assert_eq!(classify(&err), FailureCategory::MalformedResponse);
        assert!(!classify(&err).is_retryable());
    }

    #[tokio::test]
    async fn test_fetch_reads_json_body() {
        let endpoint = serve_once(
            "HTTP/1.1 200 OK",
            "application/json",
            r#"{"code":200,"data":{"content":"今天的主要内容有"}}"#,
        )
        .await;
        let reader = JinaReader::new(reqwest::Client::new(), &AppConfig::new()).with_endpoint(endpoint);

        let fetched = reader.fetch("http://example.com/page").await.unwrap();
        assert_eq!(fetched.content, "今天的主要内容有");
    }

    #[test]
    fn test_debug_hides_key() {
        let config = AppConfig::new().with_jina_api_key("jina_secret_value");
        let reader = JinaReader::new(reqwest::Client::new(), &config);
        assert!(!format!("{reader:?}").contains("jina_secret_value"));
    }
}
