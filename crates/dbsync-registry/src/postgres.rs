//! PostgreSQL registry backend.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::{debug, info, instrument};

use dbsync_core::{AccountName, PrincipalId, RegistryRecord};

use crate::error::{RegistryError, RegistryResult};
use crate::store::RegistryStore;

/// Registry backed by the `managed_accounts` table.
#[derive(Debug, Clone)]
pub struct PgRegistryStore {
    pool: PgPool,
}

impl PgRegistryStore {
    /// Create a registry over an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a registry whose pool connects on first use.
    pub fn connect_lazy(database_url: &str, acquire_timeout: Duration) -> RegistryResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(acquire_timeout)
            .connect_lazy(database_url)?;
        Ok(Self::new(pool))
    }

    /// Create the registry table if it does not exist.
    #[instrument(skip(self))]
    pub async fn ensure_schema(&self) -> RegistryResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS managed_accounts (
                principal_id TEXT PRIMARY KEY,
                username TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        info!("Registry schema ready");
        Ok(())
    }
}

#[async_trait]
impl RegistryStore for PgRegistryStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    #[instrument(skip(self, principal_id), fields(principal_id = %principal_id))]
    async fn get(&self, principal_id: &PrincipalId) -> RegistryResult<Option<RegistryRecord>> {
        let row = sqlx::query("SELECT username FROM managed_accounts WHERE principal_id = $1")
            .bind(principal_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            debug!(found = false, "Registry lookup");
            return Ok(None);
        };

        let username: String = row.try_get("username")?;
        let username = AccountName::new(username)
            .map_err(|e| RegistryError::corrupt(principal_id.as_str(), e.to_string()))?;

        debug!(found = true, "Registry lookup");
        Ok(Some(RegistryRecord::new(principal_id.clone(), username)))
    }

    #[instrument(skip(self, record), fields(principal_id = %record.principal_id))]
    async fn put(&self, record: &RegistryRecord) -> RegistryResult<()> {
        sqlx::query(
            r"
            INSERT INTO managed_accounts (principal_id, username)
            VALUES ($1, $2)
            ON CONFLICT (principal_id) DO UPDATE SET
                username = EXCLUDED.username
            ",
        )
        .bind(record.principal_id.as_str())
        .bind(record.username.as_str())
        .execute(&self.pool)
        .await?;

        debug!(username = %record.username, "Registry record written");
        Ok(())
    }

    #[instrument(skip(self, principal_id), fields(principal_id = %principal_id))]
    async fn delete(&self, principal_id: &PrincipalId) -> RegistryResult<()> {
        let result = sqlx::query("DELETE FROM managed_accounts WHERE principal_id = $1")
            .bind(principal_id.as_str())
            .execute(&self.pool)
            .await?;

        debug!(rows = result.rows_affected(), "Registry record deleted");
        Ok(())
    }

    async fn check(&self) -> RegistryResult<()> {
        sqlx::query("SELECT 1 FROM managed_accounts LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(())
    }
}
