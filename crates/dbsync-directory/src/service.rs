//! Directory service trait.

use async_trait::async_trait;
use dbsync_core::{AccountName, IdentityStoreId, PrincipalId};

use crate::error::DirectoryResult;

/// Lookup of principals in the system of record.
#[async_trait]
pub trait DirectoryService: Send + Sync {
    /// Resolve a principal's login name.
    ///
    /// Returns `Ok(None)` when the principal does not exist or has no
    /// usable name; errors are reserved for failed requests.
    async fn resolve_principal(
        &self,
        identity_store_id: Option<&IdentityStoreId>,
        principal_id: &PrincipalId,
    ) -> DirectoryResult<Option<AccountName>>;
}
