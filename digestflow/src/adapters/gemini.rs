//! Gemini `generateContent` client used for both the summary and the notes.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::{body_excerpt, json_body, request_error};
use crate::collaborators::{NoteGenerator, Summarizer};
use crate::config::AppConfig;
use crate::errors::RemoteError;
use crate::utils::excerpt;

/// REST base URL.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const SERVICE: &str = "Gemini AI";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

/// Summary prompt for a transcript.
#[must_use]
pub fn summary_prompt(content: &str) -> String {
    format!(
        "请总结以下新闻联播内容，特别关注与考研和考公考试相关的重点内容。\n\n\
         请提供:\n\
         1. 整体摘要（200字左右）\n\
         2. 主要新闻点（列表形式）\n\
         3. 考研考公重点：重点标注与国家政策、经济发展、社会治理、重大事件、国际关系等相关的内容\n\
         4. 根据新闻模仿考研政治，公务员考试（行测、申论、面试）出几道模拟题，说明出题思路，答案解析，举一反三\n\n\
         新闻内容:\n{content}\n"
    )
}

/// Study-note prompt for a transcript. The model is asked for bare HTML.
#[must_use]
pub fn notes_prompt(content: &str, title: &str) -> String {
    format!(
        "**注意：你的返回内容只需要严格包含html语法内容，不要出现markdown语法，也不需要其他解释**\n\
         请将以下新闻联播内容转换为学习笔记形式，重点关注与考研和考公考试相关的内容。\n\n\
         请生成HTML格式的笔记，包含以下部分：\n\
         1. 标题部分：大标题样式的\"{title}\"\n\
         2. 整体摘要部分：简洁概括新闻重点（约300字左右）\n\
         3. 关键新闻点部分：使用编号列表呈现主要新闻内容，然后第二行是详细新闻报道\n\
         4. 考研考公重要信息部分：使用醒目的样式标注与国家政策、经济发展、社会治理、重大事件、国际关系等相关内容\n\
         5. 可能考点部分：使用表格形式展示此次新闻内容可能出现的考点\n\
         6. 结合往年真题出几道模拟题，说明出题思路、答案解析和参考答案\n\
         7. 申论用法：如何把今天的新闻融入申论写作，并模仿高分答案写几段申论片段\n\
         8. 如何简单地记忆需要用到的新闻素材\n\
         9. 使用 HTML <img> 标签嵌入总结当天新闻的图表，图表URL格式为 https://quickchart.io/graphviz?graph=digraph{{...}}\n\n\
         新闻内容:\n{content}\n"
    )
}

/// Removes a surrounding Markdown code fence (```` ```html ... ``` ````).
#[must_use]
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => "",
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Calls Gemini models over REST.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    summary_model: String,
    notes_model: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("summary_model", &self.summary_model)
            .field("notes_model", &self.notes_model)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Creates a client with the configured key and models.
    #[must_use]
    pub fn new(client: reqwest::Client, config: &AppConfig) -> Self {
        Self {
            client,
            api_key: config.gemini_api_key.clone().unwrap_or_default(),
            base_url: GEMINI_API_BASE.to_string(),
            summary_model: config.summary_model.clone(),
            notes_model: config.notes_model.clone(),
        }
    }

    /// Points the client at another base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn generate_text(&self, model: &str, prompt: &str) -> Result<String, RemoteError> {
        let url = format!(
            "{}/models/{model}:generateContent",
            self.base_url.trim_end_matches('/')
        );
        let request = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| request_error(SERVICE, &e).with_context("model", model))?;

        let status = response.status();
        let body: Value = if status.is_success() {
            json_body(SERVICE, response, "candidates")
                .await
                .map_err(|e| e.with_context("model", model))?
        } else {
            let text = response.text().await.unwrap_or_default();
            let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
            return Err(provider_error(status.as_u16(), &body).with_context("model", model));
        };

        parse_response(&body).map_err(|e| e.with_context("model", model))
    }
}

#[async_trait]
impl Summarizer for GeminiClient {
    async fn summarize(&self, content: &str) -> Result<String, RemoteError> {
        tracing::info!(model = %self.summary_model, chars = content.chars().count(), "Summarizing transcript");
        self.generate_text(&self.summary_model, &summary_prompt(content))
            .await
    }
}

#[async_trait]
impl NoteGenerator for GeminiClient {
    async fn generate(&self, content: &str, title: &str) -> Result<String, RemoteError> {
        tracing::info!(model = %self.notes_model, title = %title, "Generating study notes");
        let text = self
            .generate_text(&self.notes_model, &notes_prompt(content, title))
            .await?;
        Ok(strip_code_fences(&text).to_string())
    }
}

/// Maps an error body (`{"error": {"code", "message", "status"}}`) to a
/// remote error. The provider status string is kept in the message since
/// the classifier matches on it.
fn provider_error(http_status: u16, body: &Value) -> RemoteError {
    let error = &body["error"];
    let Some(message) = error["message"].as_str() else {
        let text = body
            .as_str()
            .map_or_else(|| body_excerpt(body), |s| excerpt(s, 500).to_string());
        return RemoteError::http(SERVICE, http_status, format!("{http_status}: {text}"));
    };

    let code = error["code"]
        .as_u64()
        .and_then(|c| u16::try_from(c).ok())
        .unwrap_or(http_status);
    let reasons: Vec<&str> = error["details"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|d| d["reason"].as_str())
        .collect();

    let mut text = match error["status"].as_str() {
        Some(status) => format!("{code} {status}: {message}"),
        None => format!("{code}: {message}"),
    };
    if !reasons.is_empty() {
        text.push_str(&format!(" ({})", reasons.join(", ")));
    }
    RemoteError::http(SERVICE, code, text)
}

/// Concatenates the text parts of the first candidate.
fn parse_response(body: &Value) -> Result<String, RemoteError> {
    let parts = body["candidates"][0]["content"]["parts"].as_array();
    let text: String = parts
        .into_iter()
        .flatten()
        .filter_map(|p| p["text"].as_str())
        .collect();

    if text.trim().is_empty() {
        let reason = body["candidates"][0]["finishReason"]
            .as_str()
            .or_else(|| body["promptFeedback"]["blockReason"].as_str())
            .unwrap_or("no text returned");
        return Err(RemoteError::malformed(
            SERVICE,
            ["candidates[0].content.parts"],
            format!("empty completion ({reason}): {}", body_excerpt(body)),
        ));
    }
    Ok(text)
}
