//! Registration and operator updates for monitored endpoints.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::db::models::{Endpoint, NewEndpoint};
use crate::db::StoreError;

const ENDPOINT_COLUMNS: &str =
    "id, url, name, check_interval_secs, timeout_secs, expected_status, is_active, created_at";

#[derive(Clone)]
pub struct EndpointService {
    pool: SqlitePool,
}

impl EndpointService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Registers a new endpoint. The URL must be unique across all
    /// registered endpoints, active or not.
    pub async fn register(&self, new: NewEndpoint) -> Result<Endpoint, StoreError> {
        if new.check_interval_secs == 0 {
            return Err(StoreError::InvalidInterval);
        }

        let sql = format!(
            "INSERT INTO endpoints (url, name, check_interval_secs, timeout_secs, expected_status, is_active, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6) \
             RETURNING {ENDPOINT_COLUMNS}"
        );
        let result = sqlx::query_as::<_, Endpoint>(&sql)
            .bind(&new.url)
            .bind(&new.name)
            .bind(new.check_interval_secs)
            .bind(new.timeout_secs)
            .bind(new.expected_status)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(endpoint) => Ok(endpoint),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::DuplicateUrl(new.url))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get(&self, id: i64) -> Result<Option<Endpoint>, StoreError> {
        let sql = format!("SELECT {ENDPOINT_COLUMNS} FROM endpoints WHERE id = ?1");
        let endpoint = sqlx::query_as::<_, Endpoint>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(endpoint)
    }

    /// All endpoints, including deactivated ones.
    pub async fn list(&self) -> Result<Vec<Endpoint>, StoreError> {
        let sql = format!("SELECT {ENDPOINT_COLUMNS} FROM endpoints ORDER BY name");
        let endpoints = sqlx::query_as::<_, Endpoint>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(endpoints)
    }

    /// Endpoints the scheduler should be running workers for.
    pub async fn list_active(&self) -> Result<Vec<Endpoint>, StoreError> {
        let sql = format!("SELECT {ENDPOINT_COLUMNS} FROM endpoints WHERE is_active = 1 ORDER BY name");
        let endpoints = sqlx::query_as::<_, Endpoint>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(endpoints)
    }

    /// Flips the active flag. Endpoints are never physically deleted while
    /// checks reference them; deactivation is the only removal.
    pub async fn set_active(&self, id: i64, is_active: bool) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE endpoints SET is_active = ?1 WHERE id = ?2")
            .bind(is_active)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::EndpointNotFound(id));
        }
        Ok(())
    }

    /// Updates the poll interval. Takes effect the next time a worker is
    /// started for the endpoint.
    pub async fn set_interval(&self, id: i64, check_interval_secs: u32) -> Result<(), StoreError> {
        if check_interval_secs == 0 {
            return Err(StoreError::InvalidInterval);
        }
        let result = sqlx::query("UPDATE endpoints SET check_interval_secs = ?1 WHERE id = ?2")
            .bind(check_interval_secs)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::EndpointNotFound(id));
        }
        Ok(())
    }
}
