//! Application configuration.
//!
//! [`AppConfig`] is built once at startup (usually from the environment) and
//! passed to everything that needs it. Checking for missing values is a pure
//! function of the struct.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::errors::ConfigError;
use crate::utils::mask_secret;

/// Names of the required environment variables, in report order.
pub const REQUIRED_VARS: [&str; 7] = [
    "JINA_API_KEY",
    "GEMINI_API_KEY",
    "NOTION_API_KEY",
    "NOTION_DATABASE_ID",
    "EMAIL_ADDRESS",
    "EMAIL_PASSWORD",
    "RECIPIENT_EMAIL",
];

/// Configuration for one pipeline run.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Content-extraction service key.
    #[serde(default, skip_serializing)]
    pub jina_api_key: Option<String>,
    /// Generative-AI service key.
    #[serde(default, skip_serializing)]
    pub gemini_api_key: Option<String>,
    /// Document-store integration token.
    #[serde(default, skip_serializing)]
    pub notion_api_key: Option<String>,
    /// Document-store database id.
    #[serde(default)]
    pub notion_database_id: Option<String>,
    /// SMTP login.
    #[serde(default)]
    pub email_address: Option<String>,
    /// SMTP password.
    #[serde(default, skip_serializing)]
    pub email_password: Option<String>,
    /// Study-note recipient.
    #[serde(default)]
    pub recipient_email: Option<String>,
    /// From address; defaults to the SMTP login.
    #[serde(default)]
    pub email_sender: Option<String>,
    /// Operator alert recipient; defaults to the study-note recipient.
    #[serde(default)]
    pub alert_email: Option<String>,
    /// SMTP relay host.
    #[serde(default = "default_smtp_server")]
    pub smtp_server: String,
    /// SMTP port (STARTTLS).
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// Model used for summaries.
    #[serde(default = "default_summary_model")]
    pub summary_model: String,
    /// Model used for study notes.
    #[serde(default = "default_notes_model")]
    pub notes_model: String,
    /// Base URL of the transcript site.
    #[serde(default = "default_source_base_url")]
    pub source_base_url: String,
    /// HTTP and SMTP timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_smtp_server() -> String {
    "smtp.mailersend.net".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_summary_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_notes_model() -> String {
    "gemini-2.5-pro".to_string()
}

fn default_source_base_url() -> String {
    "http://mrxwlb.com".to_string()
}

fn default_timeout_secs() -> u64 {
    180
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            jina_api_key: None,
            gemini_api_key: None,
            notion_api_key: None,
            notion_database_id: None,
            email_address: None,
            email_password: None,
            recipient_email: None,
            email_sender: None,
            alert_email: None,
            smtp_server: default_smtp_server(),
            smtp_port: default_smtp_port(),
            summary_model: default_summary_model(),
            notes_model: default_notes_model(),
            source_base_url: default_source_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl AppConfig {
    /// Creates a config with defaults and no credentials.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!(error = %e, "Could not read .env file"),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from a variable lookup. Empty values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_empty(lookup(key));
        let mut config = Self::new();

        config.jina_api_key = get("JINA_API_KEY");
        config.gemini_api_key = get("GEMINI_API_KEY");
        config.notion_api_key = get("NOTION_API_KEY");
        config.notion_database_id = get("NOTION_DATABASE_ID");
        config.email_address = get("EMAIL_ADDRESS");
        config.email_password = get("EMAIL_PASSWORD");
        config.recipient_email = get("RECIPIENT_EMAIL");
        config.email_sender = get("EMAIL_SENDER");
        config.alert_email = get("ALERT_EMAIL");

        if let Some(server) = get("SMTP_SERVER") {
            config.smtp_server = server;
        }
        if let Some(port) = get("SMTP_PORT") {
            config.smtp_port = port.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "SMTP_PORT".to_string(),
                reason: format!("expected a port number, got {port:?}"),
            })?;
        }
        if let Some(model) = get("GEMINI_SUMMARY_MODEL") {
            config.summary_model = model;
        }
        if let Some(model) = get("GEMINI_NOTES_MODEL") {
            config.notes_model = model;
        }
        if let Some(url) = get("SOURCE_BASE_URL") {
            config.source_base_url = url;
        }
        if let Some(secs) = get("HTTP_TIMEOUT_SECS") {
            config.timeout_secs = secs.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "HTTP_TIMEOUT_SECS".to_string(),
                reason: format!("expected whole seconds, got {secs:?}"),
            })?;
        }

        Ok(config)
    }

    /// Sets the content-extraction key.
    #[must_use]
    pub fn with_jina_api_key(mut self, key: impl Into<String>) -> Self {
        self.jina_api_key = Some(key.into());
        self
    }

    /// Sets the generative-AI key.
    #[must_use]
    pub fn with_gemini_api_key(mut self, key: impl Into<String>) -> Self {
        self.gemini_api_key = Some(key.into());
        self
    }

    /// Sets the document-store credentials.
    #[must_use]
    pub fn with_notion(mut self, api_key: impl Into<String>, database_id: impl Into<String>) -> Self {
        self.notion_api_key = Some(api_key.into());
        self.notion_database_id = Some(database_id.into());
        self
    }

    /// Sets the SMTP login and password.
    #[must_use]
    pub fn with_smtp_login(mut self, address: impl Into<String>, password: impl Into<String>) -> Self {
        self.email_address = Some(address.into());
        self.email_password = Some(password.into());
        self
    }

    /// Sets the study-note recipient.
    #[must_use]
    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient_email = Some(recipient.into());
        self
    }

    /// Sets the operator alert recipient.
    #[must_use]
    pub fn with_alert_email(mut self, address: impl Into<String>) -> Self {
        self.alert_email = Some(address.into());
        self
    }

    /// Sets the transcript site base URL.
    #[must_use]
    pub fn with_source_base_url(mut self, url: impl Into<String>) -> Self {
        self.source_base_url = url.into();
        self
    }

    fn required_values(&self) -> [(&'static str, Option<&str>); 7] {
        [
            ("JINA_API_KEY", self.jina_api_key.as_deref()),
            ("GEMINI_API_KEY", self.gemini_api_key.as_deref()),
            ("NOTION_API_KEY", self.notion_api_key.as_deref()),
            ("NOTION_DATABASE_ID", self.notion_database_id.as_deref()),
            ("EMAIL_ADDRESS", self.email_address.as_deref()),
            ("EMAIL_PASSWORD", self.email_password.as_deref()),
            ("RECIPIENT_EMAIL", self.recipient_email.as_deref()),
        ]
    }

    /// Returns the names of all missing required values, in report order.
    #[must_use]
    pub fn missing_required(&self) -> Vec<&'static str> {
        self.required_values()
            .into_iter()
            .filter(|(_, value)| value.map_or(true, |v| v.trim().is_empty()))
            .map(|(name, _)| name)
            .collect()
    }

    /// Fails with every missing name if any required value is absent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let missing = self.missing_required();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Missing(missing.into_iter().map(String::from).collect()))
        }
    }

    /// Which required values are present. Never includes the values.
    #[must_use]
    pub fn presence_report(&self) -> String {
        self.required_values()
            .into_iter()
            .map(|(name, value)| {
                let state = if value.is_some_and(|v| !v.trim().is_empty()) {
                    "set"
                } else {
                    "unset"
                };
                format!("- {name}: {state}")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The From address.
    #[must_use]
    pub fn sender(&self) -> Option<&str> {
        self.email_sender.as_deref().or(self.email_address.as_deref())
    }

    /// Where operator alerts go.
    #[must_use]
    pub fn alert_recipient(&self) -> Option<&str> {
        self.alert_email.as_deref().or(self.recipient_email.as_deref())
    }

    /// Network timeout for adapters.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked = |v: &Option<String>| v.as_deref().map(mask_secret);
        f.debug_struct("AppConfig")
            .field("jina_api_key", &masked(&self.jina_api_key))
            .field("gemini_api_key", &masked(&self.gemini_api_key))
            .field("notion_api_key", &masked(&self.notion_api_key))
            .field("notion_database_id", &self.notion_database_id)
            .field("email_address", &self.email_address)
            .field("email_password", &self.email_password.as_ref().map(|_| "****"))
            .field("recipient_email", &self.recipient_email)
            .field("email_sender", &self.email_sender)
            .field("alert_email", &self.alert_email)
            .field("smtp_server", &self.smtp_server)
            .field("smtp_port", &self.smtp_port)
            .field("summary_model", &self.summary_model)
            .field("notes_model", &self.notes_model)
            .field("source_base_url", &self.source_base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
