//! Decides, per check result, whether an alert opens, resolves, or stays
//! silent.

use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::db::models::{CheckResult, Endpoint};
use crate::db::services::AlertService;
use crate::db::StoreError;
use crate::notifications::NotificationService;

#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("alert state update failed: {0}")]
    Store(#[from] StoreError),
}

pub struct AlertCoordinator {
    alerts: Arc<AlertService>,
    notifications: Arc<NotificationService>,
    cooldown: Duration,
}

impl AlertCoordinator {
    /// Cooldown defaults to one hour; override with [`with_cooldown`].
    ///
    /// [`with_cooldown`]: AlertCoordinator::with_cooldown
    pub fn new(alerts: Arc<AlertService>, notifications: Arc<NotificationService>) -> Self {
        Self {
            alerts,
            notifications,
            cooldown: Duration::hours(1),
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Applies one check result to the endpoint's alert state.
    ///
    /// A successful check unconditionally resolves whatever is open. A
    /// failed check first consults the cooldown window, then attempts the
    /// atomic open; the notification goes out only when this call is the
    /// one that created the alert record, so concurrent evaluations and
    /// evaluations after an unclean restart cannot duplicate it. A failed
    /// notification is logged and left alone: the alert record remains
    /// open, and the store stays authoritative over what has been alerted.
    ///
    /// Store failures propagate; the scheduler treats them as pipeline
    /// errors and backs off.
    pub async fn evaluate(
        &self,
        endpoint: &Endpoint,
        result: &CheckResult,
    ) -> Result<(), EvaluationError> {
        if result.is_up {
            self.alerts.resolve_open_alerts(endpoint.id).await?;
            return Ok(());
        }

        if self
            .alerts
            .has_recent_open_alert(endpoint.id, self.cooldown)
            .await?
        {
            debug!(
                endpoint = %endpoint.name,
                "open alert within cooldown, suppressing notification"
            );
            return Ok(());
        }

        if self.alerts.open_alert(endpoint.id).await? {
            let error_text = result.error.as_deref().unwrap_or("unknown error");
            if let Err(e) = self
                .notifications
                .send_downtime_alert(&endpoint.name, &endpoint.url, error_text)
                .await
            {
                warn!(
                    endpoint = %endpoint.name,
                    error = %e,
                    "failed to send downtime notification, alert stays open"
                );
            }
        }

        Ok(())
    }
}
