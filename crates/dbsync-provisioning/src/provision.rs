//! Provisioning engine.
//!
//! State machine for one addition event:
//!
//! ```text
//! Start -> Classified -> Created -> Granted -> Registered -> Done
//!                           \          \           \
//!                            +----------+-----------+--> RolledBack
//! ```
//!
//! Classification is taken once and trusted for the rest of the run.
//! An account is only dropped on rollback when this run proved it did
//! not exist beforehand, or when the registry write failed right after
//! this run created it.
//!
//! When the account exists but a probe failed, the run ends with a
//! retryable [`SyncError::Lookup`] instead of reporting success. Earlier
//! deployments treated a failed registry read as "not managed" and
//! returned success, which dropped the event for good. The account is
//! left untouched either way.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use dbsync_connector::traits::AccountGateway;
use dbsync_core::{AccountName, RegistryRecord, RoleName};
use dbsync_directory::{DirectoryResolver, GroupPolicy, MembershipEvent, Resolution, SkipReason};
use dbsync_registry::RegistryStore;

use crate::classifier::{Classification, OwnershipClassifier, ProbeFailure};
use crate::error::{ProvisioningStage, RollbackOutcome, SyncError, SyncResult};

/// States of the provisioning state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningState {
    Start,
    Classified,
    Created,
    Granted,
    Registered,
    Done,
    RolledBack,
}

impl std::fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ProvisioningState::Start => "start",
            ProvisioningState::Classified => "classified",
            ProvisioningState::Created => "created",
            ProvisioningState::Granted => "granted",
            ProvisioningState::Registered => "registered",
            ProvisioningState::Done => "done",
            ProvisioningState::RolledBack => "rolled_back",
        })
    }
}

/// Successful result of [`ProvisioningEngine::provision`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProvisionOutcome {
    /// Event is out of scope.
    Skipped { reason: SkipReason },
    /// Account exists but is not ours; left untouched.
    UnmanagedAccount { account: AccountName },
    /// Account exists with the role granted and is recorded as ours.
    Provisioned {
        account: AccountName,
        role: RoleName,
        newly_registered: bool,
    },
}

/// Creates accounts for addition events.
#[derive(Clone)]
pub struct ProvisioningEngine {
    gateway: Arc<dyn AccountGateway>,
    registry: Arc<dyn RegistryStore>,
    resolver: DirectoryResolver,
    classifier: OwnershipClassifier,
}

impl std::fmt::Debug for ProvisioningEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisioningEngine")
            .field("gateway", &self.gateway.display_name())
            .field("registry", &self.registry.backend_name())
            .finish_non_exhaustive()
    }
}

impl ProvisioningEngine {
    /// Create an engine over already-constructed collaborators.
    pub fn new(
        gateway: Arc<dyn AccountGateway>,
        registry: Arc<dyn RegistryStore>,
        resolver: DirectoryResolver,
    ) -> Self {
        let classifier = OwnershipClassifier::new(gateway.clone(), registry.clone());
        Self {
            gateway,
            registry,
            resolver,
            classifier,
        }
    }

    /// Provision the principal named by an addition event.
    #[instrument(skip(self, event, policy), fields(principal_id = %event.principal_id, kind = %event.kind))]
    pub async fn provision(
        &self,
        event: &MembershipEvent,
        policy: &GroupPolicy,
    ) -> SyncResult<ProvisionOutcome> {
        let mut state = ProvisioningState::Start;
        debug!(%state, "Provisioning started");

        let target = match self
            .resolver
            .resolve_addition(event, policy)
            .await
            .map_err(SyncError::directory_lookup)?
        {
            Resolution::Skip(reason) => {
                info!(%reason, "Skipping event");
                return Ok(ProvisionOutcome::Skipped { reason });
            }
            Resolution::Target(target) => target,
        };

        let principal = &target.principal;
        let account = &principal.display_name;
        let role = &target.role;

        let report = self.classifier.classify(principal).await;
        let classification = report.classification;
        state = ProvisioningState::Classified;
        debug!(%state, %classification, account = %account, "Account classified");

        if classification == Classification::UnmanagedExisting {
            // A probe failure may be hiding an absent or managed account; retry later.
            match report.probe_failure {
                Some(ProbeFailure::Registry(e)) => return Err(SyncError::registry_lookup(e)),
                Some(ProbeFailure::Existence(e)) => return Err(SyncError::database_lookup(e)),
                None => {
                    info!(account = %account, "Account exists and is not managed; leaving it untouched");
                    return Ok(ProvisionOutcome::UnmanagedAccount {
                        account: account.clone(),
                    });
                }
            }
        }

        let safe_to_delete = classification == Classification::Absent;

        if let Err(e) = self.gateway.create(account).await {
            error!(%state, account = %account, error = %e, "Account creation failed");
            return Err(SyncError::provisioning(
                ProvisioningStage::Create,
                account.clone(),
                RollbackOutcome::NotNeeded,
                e,
            ));
        }
        state = ProvisioningState::Created;
        debug!(%state, account = %account, "Account created");

        if let Err(e) = self.gateway.grant(account, role).await {
            let rollback = if safe_to_delete {
                self.rollback(account).await
            } else {
                warn!(account = %account, "Account pre-existed as managed; not dropping it");
                RollbackOutcome::Withheld
            };
            error!(%state, account = %account, role = %role, error = %e, %rollback, "Role grant failed");
            return Err(SyncError::provisioning(
                ProvisioningStage::Grant,
                account.clone(),
                rollback,
                e,
            ));
        }
        state = ProvisioningState::Granted;
        debug!(%state, account = %account, role = %role, "Role granted");

        let newly_registered = classification != Classification::ManagedExisting;
        if newly_registered {
            if let Err(e) = self.registry.put(&RegistryRecord::from(principal)).await {
                // The account was created by this run, so it is dropped whatever the classification.
                let rollback = self.rollback(account).await;
                error!(%state, account = %account, error = %e, %rollback, "Registry write failed");
                return Err(SyncError::provisioning(
                    ProvisioningStage::Register,
                    account.clone(),
                    rollback,
                    e,
                ));
            }
            state = ProvisioningState::Registered;
            debug!(%state, account = %account, "Ownership recorded");
        }

        state = ProvisioningState::Done;
        info!(%state, account = %account, role = %role, newly_registered, "Account provisioned");

        Ok(ProvisionOutcome::Provisioned {
            account: account.clone(),
            role: role.clone(),
            newly_registered,
        })
    }

    async fn rollback(&self, account: &AccountName) -> RollbackOutcome {
        match self.gateway.drop_account(account).await {
            Ok(()) => {
                warn!(state = %ProvisioningState::RolledBack, account = %account, "Rolled back account");
                RollbackOutcome::Completed
            }
            Err(e) => {
                error!(account = %account, error = %e, "Rollback drop failed; account left behind");
                RollbackOutcome::Failed(e.to_string())
            }
        }
    }
}
