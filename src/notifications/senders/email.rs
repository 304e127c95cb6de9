//! SMTP delivery via lettre.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::warn;

use super::{NotificationSender, SenderError};
use crate::config::EmailConfig;

/// Sends notifications through an SMTP relay with STARTTLS.
pub struct EmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    max_attempts: u32,
}

impl EmailSender {
    /// Builds the transport from the `[email]` config section.
    /// `max_attempts` bounds consecutive delivery attempts per send.
    pub fn new(config: &EmailConfig, max_attempts: u32) -> Result<Self, SenderError> {
        let from = config.from_email.parse::<Mailbox>()?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self {
            transport,
            from,
            max_attempts: max_attempts.max(1),
        })
    }
}

#[async_trait]
impl NotificationSender for EmailSender {
    async fn send(
        &self,
        subject: &str,
        body: &str,
        recipients: &[String],
    ) -> Result<(), SenderError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);
        for recipient in recipients {
            builder = builder.to(recipient.parse::<Mailbox>()?);
        }
        let message = builder.body(body.to_string())?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.transport.send(message.clone()).await {
                Ok(_) => return Ok(()),
                Err(e) if attempt < self.max_attempts => {
                    warn!(attempt, error = %e, "smtp delivery failed, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
