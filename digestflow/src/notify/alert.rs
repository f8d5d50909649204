//! Operator alert events and their rendering.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use super::remediation::{remediation_for, Remediation};
use crate::classify::FailureCategory;
use crate::collaborators::OutgoingEmail;
use crate::errors::TerminalFailure;
use crate::utils::html_escape;

/// A single failure occurrence to report to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEvent {
    /// Short error type shown in the alert (category label or
    /// "Retries exhausted").
    pub error_type: String,
    /// Category, when the failure was classified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<FailureCategory>,
    /// Failure message.
    pub error_message: String,
    /// Name of the failing service.
    pub api_name: String,
    /// Verbatim diagnostic block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic_log: Option<String>,
    /// When the failure was observed.
    pub timestamp: DateTime<Utc>,
}

impl AlertEvent {
    /// Creates an alert for a classified failure.
    #[must_use]
    pub fn new(
        category: FailureCategory,
        api_name: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            error_type: category.label().to_string(),
            category: Some(category),
            error_message: error_message.into(),
            api_name: api_name.into(),
            diagnostic_log: None,
            timestamp: Utc::now(),
        }
    }

    /// Creates an alert from a terminal retry failure.
    #[must_use]
    pub fn from_failure(failure: &TerminalFailure) -> Self {
        let error = failure.last_error();
        let message = if failure.is_exhausted() {
            format!(
                "{} failed after {} attempts: {}",
                error.service,
                failure.attempts(),
                error.message
            )
        } else {
            error.message.clone()
        };

        Self {
            error_type: failure.alert_label(),
            category: Some(failure.category()),
            error_message: message,
            api_name: error.service.clone(),
            diagnostic_log: None,
            timestamp: Utc::now(),
        }
    }

    /// Creates the alert for a run that failed outside stage handling.
    #[must_use]
    pub fn run_failed(api_name: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            error_type: "Run failed".to_string(),
            category: None,
            error_message: error_message.into(),
            api_name: api_name.into(),
            diagnostic_log: None,
            timestamp: Utc::now(),
        }
    }

    /// Attaches a diagnostic block.
    #[must_use]
    pub fn with_diagnostics(mut self, log: impl Into<String>) -> Self {
        self.diagnostic_log = Some(log.into());
        self
    }

    /// Alert subject line.
    #[must_use]
    pub fn subject(&self) -> String {
        format!("[API alert] {} failure", self.api_name)
    }

    fn remediation(&self) -> Remediation {
        remediation_for(self.category.unwrap_or(FailureCategory::Unknown))
    }

    fn report_time(&self) -> String {
        self.timestamp
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }

    /// Renders the HTML body.
    #[must_use]
    pub fn html_body(&self) -> String {
        let remediation = self.remediation();
        let steps: String = remediation
            .fix_steps
            .iter()
            .map(|step| format!("<li>{}</li>", html_escape(step)))
            .collect();

        let log_section = self
            .diagnostic_log
            .as_deref()
            .map(|log| {
                format!(
                    "<div class=\"log-section\"><h3>Diagnostic log</h3>\
                     <pre style=\"white-space: pre-wrap;\">{}</pre></div>",
                    html_escape(log)
                )
            })
            .unwrap_or_default();

        format!(
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"UTF-8\"><title>API alert</title></head>\n<body>\n\
             <div class=\"container\">\n\
             <h1>API service alert</h1>\n\
             <div class=\"error-info\">\n\
             <p><strong>Service:</strong> {api}</p>\n\
             <p><strong>Error type:</strong> {kind}</p>\n\
             <p><strong>Message:</strong> {message}</p>\n\
             </div>\n\
             {log_section}\n\
             <div class=\"suggestion\"><h3>Suggested actions: {hint}</h3><ul>{steps}</ul></div>\n\
             <p class=\"timestamp\">Reported at {time}</p>\n\
             </div>\n</body>\n</html>\n",
            api = html_escape(&self.api_name),
            kind = html_escape(&self.error_type),
            message = html_escape(&self.error_message),
            hint = html_escape(&remediation.title),
            time = self.report_time(),
        )
    }

    /// Renders the plain-text body.
    #[must_use]
    pub fn text_body(&self) -> String {
        let mut lines = vec![
            "API service alert".to_string(),
            String::new(),
            format!("Service: {}", self.api_name),
            format!("Error type: {}", self.error_type),
            format!("Message: {}", self.error_message),
        ];

        if let Some(log) = &self.diagnostic_log {
            lines.push(String::new());
            lines.push("Diagnostic log:".to_string());
            lines.push(log.clone());
        }

        lines.push(String::new());
        let remediation = self.remediation();
        lines.push(format!("Suggested actions: {}", remediation.title));
        for (i, step) in remediation.fix_steps.iter().enumerate() {
            lines.push(format!("{}. {step}", i + 1));
        }

        lines.push(String::new());
        lines.push(format!("Reported at {}", self.report_time()));
        lines.join("\n")
    }

    /// Renders the alert as an email.
    #[must_use]
    pub fn to_email(&self) -> OutgoingEmail {
        OutgoingEmail {
            subject: self.subject(),
            html_body: self.html_body(),
            text_body: self.text_body(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RemoteError;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_subject() {
        let alert = AlertEvent::new(FailureCategory::QuotaExceeded, "Gemini AI", "quota");
        assert_eq!(alert.subject(), "[API alert] Gemini AI failure");
        assert_eq!(alert.error_type, "Quota exceeded");
    }

    #[test]
    fn test_from_exhausted_failure() {
        let failure = TerminalFailure::RetriesExhausted {
            attempts: 3,
            last_error: RemoteError::http("Gemini AI", 503, "UNAVAILABLE"),
        };
        let alert = AlertEvent::from_failure(&failure);

        assert_eq!(alert.api_name, "Gemini AI");
        assert_eq!(alert.error_type, "Retries exhausted");
        assert_eq!(alert.category, Some(FailureCategory::Transient));
        assert!(alert.error_message.contains("after 3 attempts"));
    }

    #[test]
    fn test_diagnostics_are_escaped_in_html_only() {
        let alert = AlertEvent::new(FailureCategory::MalformedResponse, "Jina AI", "bad <body>")
            .with_diagnostics("body: <html>oops</html>");

        let html = alert.html_body();
        assert!(html.contains("body: &lt;html&gt;oops&lt;/html&gt;"));
        assert!(html.contains("bad &lt;body&gt;"));
        assert!(!html.contains("<html>oops"));

        let text = alert.text_body();
        assert!(text.contains("body: <html>oops</html>"));
    }

    #[test]
    fn test_bodies_include_remediation() {
        let alert = AlertEvent::new(FailureCategory::AuthInvalid, "Jina AI", "401");
        let steps = remediation_for(FailureCategory::AuthInvalid).fix_steps;
        let text = alert.text_body();
        assert!(text.contains(&format!("1. {}", steps[0])));
        assert!(text.contains("Suggested actions: API key rejected"));
        assert!(alert.html_body().contains("Invalid API key"));
        assert!(alert.html_body().contains("<h3>Suggested actions: API key rejected</h3>"));
    }

    #[test]
    fn test_run_failed_uses_generic_steps() {
        let alert = AlertEvent::run_failed("digestflow", "stage panicked");
        assert_eq!(alert.category, None);
        assert!(alert.text_body().contains("Check the network connection"));
    }
}
