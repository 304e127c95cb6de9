use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use super::senders::{NotificationSender, SenderError};

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("no notification recipients configured")]
    NoRecipients,
    #[error(transparent)]
    Sender(#[from] SenderError),
}

/// Formats downtime messages and hands them to the configured sender.
pub struct NotificationService {
    sender: Arc<dyn NotificationSender>,
    recipients: Vec<String>,
}

impl NotificationService {
    pub fn new(sender: Arc<dyn NotificationSender>, recipients: Vec<String>) -> Self {
        Self { sender, recipients }
    }

    /// Sends one downtime notification for the endpoint. Callers decide
    /// whether a notification is due; this only formats and delivers.
    pub async fn send_downtime_alert(
        &self,
        endpoint_name: &str,
        endpoint_url: &str,
        error_text: &str,
    ) -> Result<(), NotificationError> {
        if self.recipients.is_empty() {
            return Err(NotificationError::NoRecipients);
        }

        let subject = format!("DOWNTIME ALERT: {endpoint_name}");
        let body = format!(
            "Endpoint downtime alert\n\
             \n\
             Endpoint: {endpoint_name}\n\
             URL: {endpoint_url}\n\
             Time: {}\n\
             Error: {error_text}\n\
             \n\
             Please check the endpoint immediately.\n",
            Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
        );

        self.sender
            .send(&subject, &body, &self.recipients)
            .await?;
        info!(endpoint = endpoint_name, "downtime notification sent");
        Ok(())
    }
}
