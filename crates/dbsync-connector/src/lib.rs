//! # Connector Framework
//!
//! Core abstractions for managing login accounts in a target database.
//!
//! The provisioning engines never talk SQL. They drive an
//! [`AccountGateway`], which exposes four atomic, named operations
//! (`exists`, `create`, `grant`, `drop_account`) and hides the dialect of
//! the engine behind it. Two gateways that implement the trait behave
//! identically to callers.
//!
//! ## Crate Organization
//!
//! - [`error`] - Error types with transient/permanent classification
//! - [`traits`] - Connector and gateway capability traits
//! - [`config`] - Configuration trait and shared connection settings
//! - [`resilience`] - Caller-configurable retry policy for gateways
//!
//! ## Example
//!
//! ```ignore
//! use dbsync_connector::prelude::*;
//!
//! let gateway: Arc<dyn AccountGateway> = Arc::new(PostgresAccountGateway::new(config)?);
//! let name = AccountName::new("alice")?;
//!
//! if !gateway.exists(&name).await? {
//!     gateway.create(&name).await?;
//! }
//! ```

pub mod config;
pub mod error;
pub mod resilience;
pub mod traits;

/// Prelude module for convenient imports.
///
/// ```
/// use dbsync_connector::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{ConnectionSettings, ConnectorConfig};
    pub use crate::error::{ConnectorError, ConnectorResult};
    pub use crate::resilience::{RetryConfig, RetryExecutor, RetryingGateway};
    pub use crate::traits::{AccountGateway, Connector};
}

// Re-export async_trait for gateway implementors
pub use async_trait::async_trait;
