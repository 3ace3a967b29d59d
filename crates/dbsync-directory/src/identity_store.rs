//! AWS IAM Identity Center directory.

use async_trait::async_trait;
use aws_sdk_identitystore::error::DisplayErrorContext;
use aws_sdk_identitystore::Client;
use tracing::{debug, instrument, warn};

use dbsync_core::{AccountName, IdentityStoreId, PrincipalId};

use crate::error::{DirectoryError, DirectoryResult};
use crate::service::DirectoryService;

/// Resolves principals with the identity store `DescribeUser` API.
#[derive(Debug, Clone)]
pub struct IdentityStoreDirectory {
    client: Client,
    default_identity_store: Option<IdentityStoreId>,
}

impl IdentityStoreDirectory {
    /// Create a directory client.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            default_identity_store: None,
        }
    }

    /// Identity store used when an event does not name one.
    #[must_use]
    pub fn with_default_identity_store(mut self, identity_store_id: IdentityStoreId) -> Self {
        self.default_identity_store = Some(identity_store_id);
        self
    }
}

#[async_trait]
impl DirectoryService for IdentityStoreDirectory {
    #[instrument(skip(self, identity_store_id, principal_id), fields(principal_id = %principal_id))]
    async fn resolve_principal(
        &self,
        identity_store_id: Option<&IdentityStoreId>,
        principal_id: &PrincipalId,
    ) -> DirectoryResult<Option<AccountName>> {
        let identity_store_id = identity_store_id
            .or(self.default_identity_store.as_ref())
            .ok_or_else(|| DirectoryError::MissingIdentityStore {
                principal_id: principal_id.to_string(),
            })?;

        let result = self
            .client
            .describe_user()
            .identity_store_id(identity_store_id.as_str())
            .user_id(principal_id.as_str())
            .send()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_resource_not_found_exception()) =>
            {
                debug!("Principal not found in identity store");
                return Ok(None);
            }
            Err(e) => {
                return Err(DirectoryError::LookupFailed {
                    message: DisplayErrorContext(&e).to_string(),
                })
            }
        };

        let Some(user_name) = output.user_name().filter(|name| !name.trim().is_empty()) else {
            warn!("Principal has no user name");
            return Ok(None);
        };

        let name = AccountName::new(user_name).map_err(|e| DirectoryError::InvalidResponse {
            principal_id: principal_id.to_string(),
            message: e.to_string(),
        })?;

        debug!(display_name = %name, "Resolved principal");
        Ok(Some(name))
    }
}
