//! # Database Connector
//!
//! Account gateways for relational databases.
//!
//! Two interchangeable implementations of
//! [`AccountGateway`](dbsync_connector::traits::AccountGateway) are provided:
//!
//! - [`PostgresAccountGateway`] - PostgreSQL / Aurora PostgreSQL
//! - [`MySqlAccountGateway`] - MySQL / MariaDB / Aurora MySQL
//!
//! ## Features
//!
//! - Lazily created, cached connection pools (reused until `dispose`)
//! - Static password or RDS IAM token authentication
//! - Identifier validation and engine specific quoting; lookups use bound parameters
//! - Idempotent `create` and `drop_account`
//!
//! ## Example
//!
//! ```ignore
//! use dbsync_connector_database::{gateway_for, DatabaseConfig, DatabaseDriver};
//!
//! let config = DatabaseConfig::new(DatabaseDriver::MySql, "db.example.com", "admin")
//!     .with_password("secret");
//!
//! let gateway = gateway_for(config)?;
//! gateway.test_connection().await?;
//! ```

pub mod config;
pub mod credentials;
pub mod mysql;
pub mod pool;
pub mod postgres;
pub mod quote;

use std::sync::Arc;

use aws_config::SdkConfig;
use dbsync_connector::error::ConnectorResult;
use dbsync_connector::traits::AccountGateway;

// Re-exports
pub use config::{AccountAuthentication, DatabaseConfig, DatabaseCredentials, DatabaseDriver, SslMode};
pub use mysql::MySqlAccountGateway;
pub use postgres::PostgresAccountGateway;

/// Build the gateway matching the configured driver.
pub fn gateway_for(config: DatabaseConfig) -> ConnectorResult<Arc<dyn AccountGateway>> {
    let gateway: Arc<dyn AccountGateway> = match config.driver {
        DatabaseDriver::PostgreSql => Arc::new(PostgresAccountGateway::new(config)?),
        DatabaseDriver::MySql => Arc::new(MySqlAccountGateway::new(config)?),
    };
    Ok(gateway)
}

/// Build the gateway matching the configured driver, sharing an AWS SDK
/// configuration for IAM token generation.
pub fn gateway_with_aws_config(
    config: DatabaseConfig,
    sdk_config: SdkConfig,
) -> ConnectorResult<Arc<dyn AccountGateway>> {
    let gateway: Arc<dyn AccountGateway> = match config.driver {
        DatabaseDriver::PostgreSql => {
            Arc::new(PostgresAccountGateway::new(config)?.with_aws_config(sdk_config))
        }
        DatabaseDriver::MySql => {
            Arc::new(MySqlAccountGateway::new(config)?.with_aws_config(sdk_config))
        }
    };
    Ok(gateway)
}
