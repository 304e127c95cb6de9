//! Append-only recording of check outcomes and windowed uptime statistics.

use chrono::{DateTime, Duration, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::db::models::{CheckResult, UptimeStats};
use crate::db::StoreError;

#[derive(Clone)]
pub struct CheckService {
    pool: SqlitePool,
}

#[derive(FromRow)]
struct StatsRow {
    total_checks: i64,
    successful_checks: Option<i64>,
    avg_latency_ms: Option<f64>,
    first_check: Option<DateTime<Utc>>,
    last_check: Option<DateTime<Utc>>,
}

impl CheckService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Appends one check outcome. Rows are never updated or deleted.
    pub async fn record(&self, result: &CheckResult) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO checks (endpoint_id, status_code, latency_ms, is_up, error, checked_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(result.endpoint_id)
        .bind(result.status_code)
        .bind(result.latency_ms)
        .bind(result.is_up)
        .bind(&result.error)
        .bind(result.checked_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Aggregates checks for `endpoint_id` whose `checked_at` falls within
    /// `window` of now. Returns `None` when the window holds no checks at
    /// all, which is not the same thing as a window of failures.
    pub async fn uptime_stats(
        &self,
        endpoint_id: i64,
        window: Duration,
    ) -> Result<Option<UptimeStats>, StoreError> {
        let cutoff = Utc::now() - window;

        let row = sqlx::query_as::<_, StatsRow>(
            "SELECT COUNT(*) AS total_checks, \
                    SUM(CASE WHEN is_up THEN 1 ELSE 0 END) AS successful_checks, \
                    AVG(latency_ms) AS avg_latency_ms, \
                    MIN(checked_at) AS first_check, \
                    MAX(checked_at) AS last_check \
             FROM checks \
             WHERE endpoint_id = ?1 AND checked_at > ?2",
        )
        .bind(endpoint_id)
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await?;

        if row.total_checks == 0 {
            return Ok(None);
        }

        let successful = row.successful_checks.unwrap_or(0);
        Ok(Some(UptimeStats {
            total_checks: row.total_checks,
            successful_checks: successful,
            success_ratio: successful as f64 / row.total_checks as f64,
            avg_latency_ms: row.avg_latency_ms.unwrap_or(0.0),
            first_check: row.first_check.unwrap_or(cutoff),
            last_check: row.last_check.unwrap_or(cutoff),
        }))
    }
}
