//! SQLite persistence for endpoints, check results and alerts.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub mod models;
pub mod services;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("an endpoint with url {0} is already registered")]
    DuplicateUrl(String),
    #[error("endpoint {0} not found")]
    EndpointNotFound(i64),
    #[error("check interval must be at least 1 second")]
    InvalidInterval,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS endpoints (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    url                 TEXT    NOT NULL UNIQUE,
    name                TEXT    NOT NULL,
    check_interval_secs INTEGER NOT NULL DEFAULT 300,
    timeout_secs        INTEGER NOT NULL DEFAULT 10,
    expected_status     INTEGER NOT NULL DEFAULT 200,
    is_active           BOOLEAN NOT NULL DEFAULT 1,
    created_at          TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS checks (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    endpoint_id INTEGER NOT NULL REFERENCES endpoints(id),
    status_code INTEGER,
    latency_ms  REAL    NOT NULL,
    is_up       BOOLEAN NOT NULL,
    error       TEXT,
    checked_at  TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_checks_endpoint_time
    ON checks (endpoint_id, checked_at);

CREATE TABLE IF NOT EXISTS alerts (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    endpoint_id INTEGER NOT NULL REFERENCES endpoints(id),
    opened_at   TEXT    NOT NULL,
    resolved_at TEXT
);

-- At most one unresolved alert per endpoint.
CREATE UNIQUE INDEX IF NOT EXISTS idx_alerts_one_open
    ON alerts (endpoint_id) WHERE resolved_at IS NULL;
"#;

/// Opens (creating if missing) the database at `path` and bootstraps the
/// schema. WAL keeps appends for different endpoints from blocking readers.
pub async fn connect(path: impl AsRef<Path>) -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await?;

    sqlx::raw_sql(SCHEMA).execute(&pool).await?;

    Ok(pool)
}

#[cfg(test)]
pub(crate) async fn open_test_db() -> (SqlitePool, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let pool = connect(dir.path().join("test.db")).await.unwrap();
    (pool, dir)
}
