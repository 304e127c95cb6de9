//! Read-only status data for external renderers.
//!
//! The library exposes raw figures only; whatever draws the status view
//! (the CLI's `status` command, a future web page) does its own
//! formatting.

use chrono::Duration;
use serde::Serialize;

use crate::db::models::{Endpoint, UptimeStats};
use crate::db::services::{CheckService, EndpointService};
use crate::db::StoreError;

/// Default statistics window for the status view, in days.
pub const DEFAULT_STATUS_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize)]
pub struct EndpointStatus {
    pub endpoint: Endpoint,
    /// `None` when no checks were recorded inside the window.
    pub stats: Option<UptimeStats>,
}

/// Snapshot of every active endpoint with its stats over `window`.
pub async fn status_overview(
    endpoints: &EndpointService,
    checks: &CheckService,
    window: Duration,
) -> Result<Vec<EndpointStatus>, StoreError> {
    let mut overview = Vec::new();
    for endpoint in endpoints.list_active().await? {
        let stats = checks.uptime_stats(endpoint.id, window).await?;
        overview.push(EndpointStatus { endpoint, stats });
    }
    Ok(overview)
}
