//! Sync error taxonomy.

use serde::Serialize;
use thiserror::Error;

use dbsync_connector::error::ConnectorError;
use dbsync_core::{AccountName, PrincipalId};
use dbsync_directory::{DirectoryError, EventError};
use dbsync_registry::RegistryError;

/// Stage at which a mutation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningStage {
    /// Creating the account.
    Create,
    /// Granting the role.
    Grant,
    /// Writing the registry record.
    Register,
    /// Dropping the account.
    Drop,
    /// Deleting the registry record.
    Unregister,
}

impl std::fmt::Display for ProvisioningStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ProvisioningStage::Create => "create",
            ProvisioningStage::Grant => "grant",
            ProvisioningStage::Register => "register",
            ProvisioningStage::Drop => "drop",
            ProvisioningStage::Unregister => "unregister",
        })
    }
}

/// What happened to a partially provisioned account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "rollback", content = "detail", rename_all = "snake_case")]
pub enum RollbackOutcome {
    /// Nothing had been created, so nothing to undo.
    NotNeeded,
    /// Account pre-existed; it was left in place.
    Withheld,
    /// Account was dropped.
    Completed,
    /// Dropping the account failed.
    Failed(String),
}

impl std::fmt::Display for RollbackOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RollbackOutcome::NotNeeded => f.write_str("not needed"),
            RollbackOutcome::Withheld => f.write_str("withheld, account pre-existed"),
            RollbackOutcome::Completed => f.write_str("account dropped"),
            RollbackOutcome::Failed(message) => write!(f, "drop failed: {message}"),
        }
    }
}

/// Read path that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupTarget {
    /// Directory service.
    Directory,
    /// Registry store.
    Registry,
    /// Account existence probe.
    Database,
}

impl std::fmt::Display for LookupTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            LookupTarget::Directory => "directory",
            LookupTarget::Registry => "registry",
            LookupTarget::Database => "database",
        })
    }
}

/// Error returned by the engines.
///
/// An existing unmanaged account is not an error: it is reported as a
/// successful no-op outcome.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Missing or invalid configuration. Not retried.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// A read failed before anything was mutated.
    #[error("{target} lookup failed: {source}")]
    Lookup {
        target: LookupTarget,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A mutation failed; rollback rules have already been applied.
    #[error("Provisioning of {account} failed at {stage} (rollback: {rollback}): {source}")]
    Provisioning {
        stage: ProvisioningStage,
        account: AccountName,
        rollback: RollbackOutcome,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Removal from a managed group with no ownership record.
    #[error("No registry record for {principal_id}; provisioning never completed")]
    MissingRegistryRecord { principal_id: PrincipalId },

    /// Event could not be decoded.
    #[error("Invalid event: {0}")]
    InvalidEvent(#[from] EventError),
}

impl SyncError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        SyncError::Configuration {
            message: message.into(),
        }
    }

    /// Directory read failure.
    pub fn directory_lookup(source: DirectoryError) -> Self {
        SyncError::Lookup {
            target: LookupTarget::Directory,
            source: Box::new(source),
        }
    }

    /// Registry read failure.
    pub fn registry_lookup(source: RegistryError) -> Self {
        SyncError::Lookup {
            target: LookupTarget::Registry,
            source: Box::new(source),
        }
    }

    /// Account existence probe failure.
    pub fn database_lookup(source: ConnectorError) -> Self {
        SyncError::Lookup {
            target: LookupTarget::Database,
            source: Box::new(source),
        }
    }

    /// Mutation failure.
    pub fn provisioning(
        stage: ProvisioningStage,
        account: AccountName,
        rollback: RollbackOutcome,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        SyncError::Provisioning {
            stage,
            account,
            rollback,
            source: Box::new(source),
        }
    }

    /// Whether re-running the whole event may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            SyncError::Configuration { .. } | SyncError::InvalidEvent(_)
        )
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            SyncError::Configuration { .. } => "CONFIGURATION_ERROR",
            SyncError::Lookup { .. } => "LOOKUP_ERROR",
            SyncError::Provisioning { .. } => "PROVISIONING_ERROR",
            SyncError::MissingRegistryRecord { .. } => "MISSING_REGISTRY_RECORD",
            SyncError::InvalidEvent(_) => "INVALID_EVENT",
        }
    }
}

/// Result type for engine operations.
pub type SyncResult<T> = Result<T, SyncError>;
