//! Alert state transitions for endpoints.
//!
//! All transitions are single SQL statements, so two workers (or two
//! processes) evaluating results for the same endpoint cannot both open an
//! alert or both observe none to resolve. The `idx_alerts_one_open` partial
//! unique index backs the at-most-one-open-alert invariant at the schema
//! level.

use chrono::{Duration, Utc};
use sqlx::SqlitePool;

use crate::db::models::Alert;
use crate::db::StoreError;

#[derive(Clone)]
pub struct AlertService {
    pool: SqlitePool,
}

impl AlertService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens an alert for the endpoint unless one is already open.
    /// Returns whether a new alert record was created; `false` tells the
    /// caller another alert is still open and no notification is due.
    pub async fn open_alert(&self, endpoint_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT INTO alerts (endpoint_id, opened_at) VALUES (?1, ?2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(endpoint_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Marks any open alert for the endpoint as resolved. No-op when
    /// nothing is open, so callers can invoke it on every successful check.
    pub async fn resolve_open_alerts(&self, endpoint_id: i64) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE alerts SET resolved_at = ?1 \
             WHERE endpoint_id = ?2 AND resolved_at IS NULL",
        )
        .bind(Utc::now())
        .bind(endpoint_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// True when an open alert exists whose `opened_at` falls within
    /// `within` of now. Queried from storage rather than memory so the
    /// cooldown holds across process restarts.
    pub async fn has_recent_open_alert(
        &self,
        endpoint_id: i64,
        within: Duration,
    ) -> Result<bool, StoreError> {
        let cutoff = Utc::now() - within;
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM alerts \
             WHERE endpoint_id = ?1 AND resolved_at IS NULL AND opened_at > ?2",
        )
        .bind(endpoint_id)
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn has_open_alert(&self, endpoint_id: i64) -> Result<bool, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM alerts WHERE endpoint_id = ?1 AND resolved_at IS NULL",
        )
        .bind(endpoint_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    /// Full alert history for an endpoint, newest first.
    pub async fn alerts_for_endpoint(&self, endpoint_id: i64) -> Result<Vec<Alert>, StoreError> {
        let alerts = sqlx::query_as::<_, Alert>(
            "SELECT id, endpoint_id, opened_at, resolved_at FROM alerts \
             WHERE endpoint_id = ?1 ORDER BY opened_at DESC",
        )
        .bind(endpoint_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(alerts)
    }
}
