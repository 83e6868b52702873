//! Delivery backends.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::EmailConfig;
use crate::error::MailError;
use crate::templates::OutgoingEmail;

/// Sends rendered emails. Implementations must be cheap to share across
/// request handlers.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError>;
}

// ---------------------------------------------------------------------------
// SMTP
// ---------------------------------------------------------------------------

/// Delivers mail through an SMTP relay using STARTTLS.
pub struct SmtpMailer {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Build the relay transport. Connections are opened lazily on send.
    pub fn new(config: &EmailConfig) -> Result<Self, MailError> {
        let from = Mailbox::new(Some(config.from_name.clone()), config.from_address.parse()?);

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port);
        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            from,
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let message = build_message(self.from.clone(), email)?;
        self.transport.send(message).await?;
        tracing::info!(to = %email.to, subject = %email.subject, "Email sent");
        Ok(())
    }
}

fn build_message(from: Mailbox, email: &OutgoingEmail) -> Result<Message, MailError> {
    let to = Mailbox::new(email.to_name.clone(), email.to.parse()?);
    Message::builder()
        .from(from)
        .to(to)
        .subject(email.subject.clone())
        .header(ContentType::TEXT_PLAIN)
        .body(email.body.clone())
        .map_err(|e| MailError::Build(e.to_string()))
}

// ---------------------------------------------------------------------------
// Log-only
// ---------------------------------------------------------------------------

/// Stand-in used when SMTP is not configured. Logs each message and
/// reports success.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            "SMTP not configured, email not sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OutgoingEmail {
        OutgoingEmail {
            to: "author@example.com".to_string(),
            to_name: Some("Ada Author".to_string()),
            subject: "Hello".to_string(),
            body: "Body".to_string(),
        }
    }

    #[test]
    fn message_builds_with_named_recipient() {
        let from: Mailbox = "Imprint <noreply@imprint.local>".parse().unwrap();
        let message = build_message(from, &sample()).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: Hello"));
        assert!(raw.contains("author@example.com"));
    }

    #[test]
    fn bad_recipient_is_an_address_error() {
        let from: Mailbox = "noreply@imprint.local".parse().unwrap();
        let mut email = sample();
        email.to = "nope".to_string();
        assert!(matches!(build_message(from, &email), Err(MailError::Address(_))));
    }

    #[tokio::test]
    async fn log_mailer_always_succeeds() {
        assert!(LogMailer.send(&sample()).await.is_ok());
    }
}
