//! Connector Framework traits
//!
//! Capability traits implemented by every target-database gateway.

use async_trait::async_trait;
use dbsync_core::{AccountName, RoleName};

use crate::error::ConnectorResult;

/// Base trait for all connectors.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Get the display name for this connector instance.
    fn display_name(&self) -> &str;

    /// Test the connection to the target system.
    async fn test_connection(&self) -> ConnectorResult<()>;

    /// Dispose of connector resources.
    ///
    /// Implementations close cached pools. Further calls fail.
    async fn dispose(&self) -> ConnectorResult<()>;
}

/// Account management capability of a target database.
///
/// Names and roles are opaque values: implementations must validate and
/// quote them internally and never splice them raw into statement text.
#[async_trait]
pub trait AccountGateway: Connector {
    /// Check whether a login account with this name exists.
    async fn exists(&self, account: &AccountName) -> ConnectorResult<bool>;

    /// Create a login account.
    ///
    /// Creating a name that already exists is not an error.
    async fn create(&self, account: &AccountName) -> ConnectorResult<()>;

    /// Grant a role to an account.
    async fn grant(&self, account: &AccountName, role: &RoleName) -> ConnectorResult<()>;

    /// Drop a login account.
    ///
    /// Dropping a name that does not exist is not an error.
    async fn drop_account(&self, account: &AccountName) -> ConnectorResult<()>;
}
