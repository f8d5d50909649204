//! Sends operator alerts.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use super::AlertEvent;
use crate::collaborators::Mailer;
use crate::utils::panic_message;

/// Delivers [`AlertEvent`]s through a [`Mailer`]. Delivery problems,
/// including a panicking mailer, are logged and never propagated.
#[derive(Clone)]
pub struct NotificationDispatcher {
    mailer: Arc<dyn Mailer>,
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher").finish_non_exhaustive()
    }
}

impl NotificationDispatcher {
    /// Creates a dispatcher sending through `mailer`.
    #[must_use]
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    /// Sends the alert. Returns true if the mailer accepted it.
    pub async fn notify(&self, alert: &AlertEvent) -> bool {
        tracing::info!(
            api = %alert.api_name,
            error_type = %alert.error_type,
            "Sending operator alert"
        );

        let email = alert.to_email();
        let delivered = match AssertUnwindSafe(self.mailer.send(&email)).catch_unwind().await {
            Ok(delivered) => delivered,
            Err(payload) => {
                tracing::error!(
                    api = %alert.api_name,
                    panic = %panic_message(payload.as_ref()),
                    "Alert mailer panicked"
                );
                return false;
            }
        };

        if delivered {
            tracing::info!(api = %alert.api_name, "Operator alert sent");
        } else {
            tracing::error!(
                api = %alert.api_name,
                error_type = %alert.error_type,
                "Failed to send operator alert"
            );
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::FailureCategory;
    use crate::testing::{PanickingMailer, RecordingMailer};

    #[tokio::test]
    async fn test_notify_sends_rendered_alert() {
        let mailer = Arc::new(RecordingMailer::new());
        let dispatcher = NotificationDispatcher::new(mailer.clone());

        let alert = AlertEvent::new(FailureCategory::AuthInvalid, "Jina AI", "HTTP 401");
        assert!(dispatcher.notify(&alert).await);

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "[API alert] Jina AI failure");
        assert!(sent[0].text_body.contains("HTTP 401"));
    }

    #[tokio::test]
    async fn test_notify_swallows_delivery_failure() {
        let mailer = Arc::new(RecordingMailer::failing());
        let dispatcher = NotificationDispatcher::new(mailer.clone());

        let alert = AlertEvent::new(FailureCategory::Unknown, "Gemini AI", "boom");
        assert!(!dispatcher.notify(&alert).await);
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_notify_survives_panicking_mailer() {
        let dispatcher = NotificationDispatcher::new(Arc::new(PanickingMailer));

        let alert = AlertEvent::new(FailureCategory::AuthInvalid, "Gemini AI", "HTTP 401");
        assert!(!dispatcher.notify(&alert).await);
        assert!(!dispatcher.notify(&alert).await);
    }
}
