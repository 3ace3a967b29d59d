//! Lazily created connection pool shared by both gateways.

use std::future::Future;

use sqlx::{Database, Pool};
use tokio::sync::RwLock;

use dbsync_connector::error::{ConnectorError, ConnectorResult};

/// Connection pool created on first use and reused until disposed.
pub struct LazyPool<DB: Database> {
    pool: RwLock<Option<Pool<DB>>>,
    disposed: RwLock<bool>,
}

impl<DB: Database> Default for LazyPool<DB> {
    fn default() -> Self {
        Self {
            pool: RwLock::new(None),
            disposed: RwLock::new(false),
        }
    }
}

impl<DB: Database> LazyPool<DB> {
    /// Create an empty pool holder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cached pool, creating one with `connect` if necessary.
    pub async fn get_or_connect<F, Fut>(&self, connect: F) -> ConnectorResult<Pool<DB>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ConnectorResult<Pool<DB>>>,
    {
        if *self.disposed.read().await {
            return Err(ConnectorError::InvalidConfiguration {
                message: "Gateway has been disposed".to_string(),
            });
        }

        // Try to reuse existing pool
        {
            let pool_guard = self.pool.read().await;
            if let Some(ref pool) = *pool_guard {
                return Ok(pool.clone());
            }
        }

        let mut pool_guard = self.pool.write().await;
        // Another task may have connected while we waited for the lock.
        if let Some(ref pool) = *pool_guard {
            return Ok(pool.clone());
        }

        let pool = connect().await?;
        *pool_guard = Some(pool.clone());

        Ok(pool)
    }

    /// Whether a pool is currently cached.
    pub async fn is_connected(&self) -> bool {
        self.pool.read().await.is_some()
    }

    /// Close the cached pool and refuse further use.
    pub async fn dispose(&self) {
        *self.disposed.write().await = true;

        let mut pool_guard = self.pool.write().await;
        if let Some(pool) = pool_guard.take() {
            pool.close().await;
        }
    }
}

/// Map a sqlx error raised while running `operation`.
///
/// Connectivity problems become transient connector errors. Gateways
/// classify engine-specific database errors before falling back here.
pub fn map_sqlx_error(operation: &str, timeout_secs: u64, error: sqlx::Error) -> ConnectorError {
    match error {
        sqlx::Error::PoolTimedOut => ConnectorError::ConnectionTimeout { timeout_secs },
        sqlx::Error::PoolClosed => ConnectorError::TargetUnavailable {
            message: "connection pool is closed".to_string(),
        },
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::WorkerCrashed => {
            ConnectorError::connection_failed_with_source(format!("{operation}: connection lost"), error)
        }
        other => ConnectorError::operation_failed_with_source(operation, other),
    }
}
