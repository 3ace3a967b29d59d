//! Deprovisioning engine.
//!
//! The account is dropped before its registry record is deleted. A crash
//! in between leaves an orphaned record, which the next run cleans up,
//! rather than an account nobody claims.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, instrument};

use dbsync_connector::traits::AccountGateway;
use dbsync_core::{AccountName, PrincipalId};
use dbsync_directory::{DirectoryResolver, EventKind, MembershipEvent};
use dbsync_registry::RegistryStore;

use crate::error::{ProvisioningStage, RollbackOutcome, SyncError, SyncResult};

/// Successful result of [`DeprovisioningEngine::deprovision`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeprovisionOutcome {
    /// Event is not a removal.
    NotApplicable { kind: EventKind },
    /// Deleted principal never had a managed account.
    NothingToRemove { principal_id: PrincipalId },
    /// Account dropped and record deleted.
    Deprovisioned { account: AccountName },
}

/// Removes managed accounts for removal events.
#[derive(Clone)]
pub struct DeprovisioningEngine {
    gateway: Arc<dyn AccountGateway>,
    registry: Arc<dyn RegistryStore>,
}

impl std::fmt::Debug for DeprovisioningEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeprovisioningEngine")
            .field("gateway", &self.gateway.display_name())
            .field("registry", &self.registry.backend_name())
            .finish()
    }
}

impl DeprovisioningEngine {
    /// Create an engine over already-constructed collaborators.
    pub fn new(gateway: Arc<dyn AccountGateway>, registry: Arc<dyn RegistryStore>) -> Self {
        Self { gateway, registry }
    }

    /// Remove the managed account of the principal named by a removal event.
    #[instrument(skip(self, event), fields(principal_id = %event.principal_id, kind = %event.kind))]
    pub async fn deprovision(&self, event: &MembershipEvent) -> SyncResult<DeprovisionOutcome> {
        let Some(principal_id) = DirectoryResolver::resolve_removal(event) else {
            debug!("Not a removal event");
            return Ok(DeprovisionOutcome::NotApplicable { kind: event.kind });
        };

        let record = self
            .registry
            .get(principal_id)
            .await
            .map_err(SyncError::registry_lookup)?;

        let Some(record) = record else {
            return match event.kind {
                EventKind::DeletePrincipal => {
                    info!("Deleted principal has no managed account");
                    Ok(DeprovisionOutcome::NothingToRemove {
                        principal_id: principal_id.clone(),
                    })
                }
                _ => {
                    error!("Removal from a managed group without a registry record");
                    Err(SyncError::MissingRegistryRecord {
                        principal_id: principal_id.clone(),
                    })
                }
            };
        };

        let account = record.username;

        if let Err(e) = self.gateway.drop_account(&account).await {
            error!(account = %account, error = %e, "Account drop failed");
            return Err(SyncError::provisioning(
                ProvisioningStage::Drop,
                account,
                RollbackOutcome::NotNeeded,
                e,
            ));
        }
        debug!(account = %account, "Account dropped");

        if let Err(e) = self.registry.delete(principal_id).await {
            error!(account = %account, error = %e, "Registry delete failed; record is orphaned");
            return Err(SyncError::provisioning(
                ProvisioningStage::Unregister,
                account,
                RollbackOutcome::NotNeeded,
                e,
            ));
        }

        info!(account = %account, "Account deprovisioned");
        Ok(DeprovisionOutcome::Deprovisioned { account })
    }
}
