//! Notion archive.
//!
//! The target database is inspected first to find its title and date
//! properties by type, so the adapter works with any property names.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{body_excerpt, json_body, request_error, status_error};
use crate::collaborators::{ArchiveEntry, Persister};
use crate::config::AppConfig;
use crate::errors::RemoteError;
use crate::utils::{chunk_chars, html_to_text};

/// REST base URL.
pub const NOTION_API_BASE: &str = "https://api.notion.com/v1";

/// API version header value.
pub const NOTION_VERSION: &str = "2022-06-28";

const SERVICE: &str = "Notion";

/// Maximum characters in one rich-text object.
const MAX_TEXT_CHARS: usize = 2000;

/// Maximum children per request.
const MAX_CHILDREN: usize = 100;

/// Saves runs as pages in a Notion database.
pub struct NotionArchive {
    client: reqwest::Client,
    api_key: String,
    database_id: String,
    base_url: String,
}

impl std::fmt::Debug for NotionArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionArchive")
            .field("database_id", &self.database_id)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl NotionArchive {
    /// Creates an archive for the configured database.
    #[must_use]
    pub fn new(client: reqwest::Client, config: &AppConfig) -> Self {
        Self {
            client,
            api_key: config.notion_api_key.clone().unwrap_or_default(),
            database_id: config.notion_database_id.clone().unwrap_or_default(),
            base_url: NOTION_API_BASE.to_string(),
        }
    }

    /// Points the archive at another base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}/{path}", self.base_url.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION)
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<Value, RemoteError> {
        let response = builder.send().await.map_err(|e| request_error(SERVICE, &e))?;
        if !response.status().is_success() {
            return Err(status_error(SERVICE, response).await);
        }
        json_body(SERVICE, response, "object").await
    }

    async fn try_save(&self, entry: &ArchiveEntry) -> Result<String, RemoteError> {
        let database = self
            .send(self.request(reqwest::Method::GET, &format!("databases/{}", self.database_id)))
            .await?;
        let (title_prop, date_prop) = property_names(&database).ok_or_else(|| {
            RemoteError::malformed(
                SERVICE,
                ["properties.title", "properties.date"],
                "database has no title or date property",
            )
        })?;

        let blocks = page_blocks(entry);
        let mut batches = blocks.chunks(MAX_CHILDREN);
        let first = batches.next().unwrap_or_default();

        let page = self
            .send(self.request(reqwest::Method::POST, "pages").json(&json!({
                "parent": { "database_id": self.database_id },
                "properties": page_properties(&title_prop, &date_prop, entry),
                "children": first,
            })))
            .await?;
        let page_id = page["id"]
            .as_str()
            .ok_or_else(|| {
                RemoteError::malformed(SERVICE, ["id"], format!("page created without id: {}", body_excerpt(&page)))
            })?
            .to_string();

        for batch in batches {
            self.send(
                self.request(reqwest::Method::PATCH, &format!("blocks/{page_id}/children"))
                    .json(&json!({ "children": batch })),
            )
            .await?;
        }

        Ok(page_id)
    }
}

#[async_trait]
impl Persister for NotionArchive {
    async fn save(&self, entry: &ArchiveEntry) -> Option<String> {
        tracing::info!(title = %entry.title, "Saving to Notion");
        match self.try_save(entry).await {
            Ok(page_id) => Some(page_id),
            Err(err) => {
                tracing::error!(error = %err, status = ?err.status, "Failed to save to Notion");
                None
            }
        }
    }
}

/// Finds the names of the title and date properties of a database.
fn property_names(database: &Value) -> Option<(String, String)> {
    let properties = database["properties"].as_object()?;
    let find = |kind: &str| {
        properties
            .iter()
            .find(|(_, prop)| prop["type"] == kind)
            .map(|(name, _)| name.clone())
    };
    Some((find("title")?, find("date")?))
}

fn page_properties(title_prop: &str, date_prop: &str, entry: &ArchiveEntry) -> Value {
    json!({
        title_prop: { "title": [{ "text": { "content": entry.title } }] },
        date_prop: { "date": { "start": entry.date.format("%Y-%m-%d").to_string() } },
    })
}

fn heading(text: &str) -> Value {
    json!({
        "object": "block",
        "type": "heading_2",
        "heading_2": { "rich_text": [{ "type": "text", "text": { "content": text } }] },
    })
}

fn paragraphs(text: &str) -> impl Iterator<Item = Value> + '_ {
    chunk_chars(text, MAX_TEXT_CHARS).into_iter().map(|chunk| {
        json!({
            "object": "block",
            "type": "paragraph",
            "paragraph": { "rich_text": [{ "type": "text", "text": { "content": chunk } }] },
        })
    })
}

/// Page body: summary, notes as plain text when present, then the transcript.
fn page_blocks(entry: &ArchiveEntry) -> Vec<Value> {
    let mut blocks = vec![heading("摘要")];
    blocks.extend(paragraphs(&entry.summary));

    if let Some(notes) = &entry.notes_html {
        let text = html_to_text(notes);
        if !text.trim().is_empty() {
            blocks.push(heading("学习笔记"));
            blocks.extend(paragraphs(&text));
        }
    }

    blocks.push(heading("原文"));
    blocks.extend(paragraphs(&entry.content));
    blocks
}
