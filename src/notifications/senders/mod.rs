use async_trait::async_trait;
use thiserror::Error;

pub mod email;

#[derive(Debug, Error)]
pub enum SenderError {
    #[error("failed to send notification: {0}")]
    SendFailed(String),
    #[error("invalid mailbox address: {0}")]
    InvalidAddress(#[from] lettre::address::AddressError),
    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("smtp transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// Delivery transport for notifications.
///
/// The monitoring core only depends on the success or failure of a send;
/// everything about the transport lives behind this trait.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, subject: &str, body: &str, recipients: &[String])
        -> Result<(), SenderError>;
}
