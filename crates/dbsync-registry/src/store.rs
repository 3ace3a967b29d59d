//! Registry Store trait.

use async_trait::async_trait;
use dbsync_core::{PrincipalId, RegistryRecord};

use crate::error::RegistryResult;

/// Durable store of managed-account ownership records.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Backend name for logs.
    fn backend_name(&self) -> &'static str;

    /// Look up the record for a principal. Absence is `Ok(None)`.
    async fn get(&self, principal_id: &PrincipalId) -> RegistryResult<Option<RegistryRecord>>;

    /// Write (or overwrite) the record for a principal.
    async fn put(&self, record: &RegistryRecord) -> RegistryResult<()>;

    /// Remove the record for a principal. Removing a missing record is not an error.
    async fn delete(&self, principal_id: &PrincipalId) -> RegistryResult<()>;

    /// Verify the backend is reachable.
    async fn check(&self) -> RegistryResult<()>;
}
