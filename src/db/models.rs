use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A monitored HTTP endpoint.
/// Corresponds to the `endpoints` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Endpoint {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub check_interval_secs: u32,
    pub timeout_secs: u32,
    pub expected_status: u16,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Parameters for registering a new endpoint.
#[derive(Debug, Clone)]
pub struct NewEndpoint {
    pub url: String,
    pub name: String,
    pub check_interval_secs: u32,
    pub timeout_secs: u32,
    pub expected_status: u16,
}

impl NewEndpoint {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            check_interval_secs: 300,
            timeout_secs: 10,
            expected_status: 200,
        }
    }
}

/// The outcome of one check against an endpoint.
/// Appended to the `checks` table, one row per executed check.
///
/// `status_code` is `None` when no HTTP response was received at all
/// (timeout, DNS failure, connection refused, TLS failure); the transport
/// error text is then carried in `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub endpoint_id: i64,
    pub status_code: Option<u16>,
    pub latency_ms: f64,
    pub is_up: bool,
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

/// A downtime alert for an endpoint.
/// Corresponds to the `alerts` table. `resolved_at` is null while the
/// outage is ongoing.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Alert {
    pub id: i64,
    pub endpoint_id: i64,
    pub opened_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Aggregated check statistics for an endpoint over a query window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UptimeStats {
    pub total_checks: i64,
    pub successful_checks: i64,
    /// Fraction of successful checks in the window, 0.0..=1.0.
    pub success_ratio: f64,
    pub avg_latency_ms: f64,
    pub first_check: DateTime<Utc>,
    pub last_check: DateTime<Utc>,
}
