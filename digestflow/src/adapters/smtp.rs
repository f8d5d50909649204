//! SMTP mailer over a STARTTLS relay.

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::collaborators::{Mailer, OutgoingEmail};
use crate::config::AppConfig;
use crate::errors::{DigestflowError, Result};

/// Sends multipart (plain + HTML) email to one fixed recipient.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl std::fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailer")
            .field("from", &self.from.to_string())
            .field("to", &self.to.to_string())
            .finish_non_exhaustive()
    }
}

impl SmtpMailer {
    /// Creates a mailer delivering to `recipient` through the configured relay.
    pub fn new(config: &AppConfig, recipient: &str) -> Result<Self> {
        let from = parse_mailbox(config.sender().unwrap_or_default())?;
        let to = parse_mailbox(recipient)?;

        let credentials = Credentials::new(
            config.email_address.clone().unwrap_or_default(),
            config.email_password.clone().unwrap_or_default(),
        );
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)
            .map_err(|e| DigestflowError::Mail(format!("invalid SMTP relay {}: {e}", config.smtp_server)))?
            .port(config.smtp_port)
            .credentials(credentials)
            .timeout(Some(config.timeout()))
            .build();

        Ok(Self { transport, from, to })
    }

    /// Recipient address.
    #[must_use]
    pub fn recipient(&self) -> String {
        self.to.email.to_string()
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> bool {
        let message = match build_message(&self.from, &self.to, email) {
            Ok(message) => message,
            Err(err) => {
                tracing::error!(error = %err, "Failed to build email");
                return false;
            }
        };

        tracing::info!(to = %self.to.email, subject = %email.subject, "Sending email");
        match self.transport.send(message).await {
            Ok(_) => true,
            Err(err) => {
                tracing::error!(error = %err, to = %self.to.email, "Failed to send email");
                false
            }
        }
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox> {
    address
        .parse()
        .map_err(|e| DigestflowError::Mail(format!("invalid address {address:?}: {e}")))
}

fn build_message(from: &Mailbox, to: &Mailbox, email: &OutgoingEmail) -> Result<Message> {
    Message::builder()
        .from(from.clone())
        .to(to.clone())
        .subject(email.subject.as_str())
        .multipart(MultiPart::alternative_plain_html(
            email.text_body.clone(),
            email.html_body.clone(),
        ))
        .map_err(|e| DigestflowError::Mail(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_config;
    use pretty_assertions::assert_eq;

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            subject: "【新闻联播学习笔记】2025年02月28日新闻联播".into(),
            html_body: "<h1>学习笔记</h1>".into(),
            text_body: "整体摘要".into(),
        }
    }

    #[test]
    fn test_build_message_envelope() {
        let from = parse_mailbox("bot@example.com").unwrap();
        let to = parse_mailbox("reader@example.com").unwrap();
        let message = build_message(&from, &to, &email()).unwrap();

        let envelope = message.envelope();
        assert_eq!(envelope.from().map(ToString::to_string), Some("bot@example.com".to_string()));
        assert_eq!(
            envelope.to().iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec!["reader@example.com".to_string()]
        );

        let raw = String::from_utf8_lossy(&message.formatted()).to_string();
        assert!(raw.contains("multipart/alternative"));
    }

    #[test]
    fn test_invalid_address_is_mail_error() {
        assert!(matches!(parse_mailbox("not an address"), Err(DigestflowError::Mail(_))));
    }

    #[tokio::test]
    async fn test_sender_falls_back_to_login() {
        let mailer = SmtpMailer::new(&test_config(), "ops@example.com").unwrap();
        assert_eq!(mailer.from.email.to_string(), "bot@example.com");
        assert_eq!(mailer.recipient(), "ops@example.com");
    }
}
