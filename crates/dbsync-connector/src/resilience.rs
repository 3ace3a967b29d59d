//! Retry policy for gateway operations.
//!
//! Retry counts and delays are chosen by the caller. The engines see a
//! gateway call as either succeeded or failed; a [`RetryingGateway`] only
//! changes how hard a single call tries before it fails.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dbsync_core::{AccountName, RoleName};
use tracing::debug;

use crate::error::ConnectorResult;
use crate::traits::{AccountGateway, Connector};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Initial delay before first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Retry policy with the given number of retries and default backoff.
    #[must_use]
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }
}

/// Retry executor with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    /// Create a new retry executor with the given configuration.
    #[must_use]
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Calculate delay for a given attempt (0-indexed).
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_delay = self.config.initial_delay.as_millis() as f64
            * self.config.backoff_multiplier.powi(attempt as i32);

        let delay_ms = base_delay.min(self.config.max_delay.as_millis() as f64);

        let final_delay = if self.config.jitter {
            // Add up to 25% jitter
            let jitter_factor = 1.0 + (rand_simple() * 0.25);
            delay_ms * jitter_factor
        } else {
            delay_ms
        };

        Duration::from_millis(final_delay as u64)
    }

    /// Execute an operation, retrying transient failures only.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> ConnectorResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = ConnectorResult<T>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if !e.is_transient() || attempt >= self.config.max_retries {
                        return Err(e);
                    }

                    let delay = self.calculate_delay(attempt);
                    debug!(
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "Retrying after transient error"
                    );

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Simple pseudo-random number generator for jitter.
fn rand_simple() -> f64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let state = RandomState::new();
    let mut hasher = state.build_hasher();
    hasher.write_u64(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64,
    );
    (hasher.finish() as f64) / (u64::MAX as f64)
}

/// Gateway wrapper that retries transient failures of every operation.
pub struct RetryingGateway {
    inner: Arc<dyn AccountGateway>,
    retry_executor: RetryExecutor,
}

impl RetryingGateway {
    /// Wrap a gateway with the given retry policy.
    pub fn new(inner: Arc<dyn AccountGateway>, config: RetryConfig) -> Self {
        Self {
            inner,
            retry_executor: RetryExecutor::new(config),
        }
    }
}

impl std::fmt::Debug for RetryingGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingGateway")
            .field("inner", &self.inner.display_name())
            .field("retry_executor", &self.retry_executor)
            .finish()
    }
}

#[async_trait]
impl Connector for RetryingGateway {
    fn display_name(&self) -> &str {
        self.inner.display_name()
    }

    async fn test_connection(&self) -> ConnectorResult<()> {
        self.retry_executor
            .execute(|| self.inner.test_connection())
            .await
    }

    async fn dispose(&self) -> ConnectorResult<()> {
        self.inner.dispose().await
    }
}

#[async_trait]
impl AccountGateway for RetryingGateway {
    async fn exists(&self, account: &AccountName) -> ConnectorResult<bool> {
        self.retry_executor
            .execute(|| self.inner.exists(account))
            .await
    }

    async fn create(&self, account: &AccountName) -> ConnectorResult<()> {
        self.retry_executor
            .execute(|| self.inner.create(account))
            .await
    }

    async fn grant(&self, account: &AccountName, role: &RoleName) -> ConnectorResult<()> {
        self.retry_executor
            .execute(|| self.inner.grant(account, role))
            .await
    }

    async fn drop_account(&self, account: &AccountName) -> ConnectorResult<()> {
        self.retry_executor
            .execute(|| self.inner.drop_account(account))
            .await
    }
}
