pub mod senders;
pub mod service;

pub use senders::{NotificationSender, SenderError};
pub use service::{NotificationError, NotificationService};
