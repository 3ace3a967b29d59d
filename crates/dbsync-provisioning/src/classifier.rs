//! Ownership classifier.
//!
//! Probe failures never stop classification. A failed existence probe
//! counts as "exists" so the engine never double-creates; a failed
//! registry lookup counts as "not managed" so the engine never touches an
//! account it cannot prove it owns. The failure is kept in the report.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, instrument, warn};

use dbsync_connector::error::ConnectorError;
use dbsync_connector::traits::AccountGateway;
use dbsync_core::Principal;
use dbsync_registry::{RegistryError, RegistryStore};

/// Ownership state of a principal's account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// No account with the display name exists.
    Absent,
    /// Account exists and the registry records it as ours.
    ManagedExisting,
    /// Account exists and is not ours.
    UnmanagedExisting,
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Classification::Absent => "absent",
            Classification::ManagedExisting => "managed_existing",
            Classification::UnmanagedExisting => "unmanaged_existing",
        })
    }
}

/// A probe that failed during classification.
#[derive(Debug)]
pub enum ProbeFailure {
    /// The existence check failed and was assumed true.
    Existence(ConnectorError),
    /// The registry lookup failed and was assumed absent.
    Registry(RegistryError),
}

/// Classification plus any probe failure it absorbed.
#[derive(Debug)]
pub struct OwnershipReport {
    /// Resulting classification.
    pub classification: Classification,
    /// Probe failure behind the classification, if any.
    pub probe_failure: Option<ProbeFailure>,
}

/// Classifies a principal's account as absent, managed or unmanaged.
#[derive(Clone)]
pub struct OwnershipClassifier {
    gateway: Arc<dyn AccountGateway>,
    registry: Arc<dyn RegistryStore>,
}

impl OwnershipClassifier {
    /// Create a classifier.
    pub fn new(gateway: Arc<dyn AccountGateway>, registry: Arc<dyn RegistryStore>) -> Self {
        Self { gateway, registry }
    }

    /// Classify the account named after `principal.display_name`.
    #[instrument(skip(self, principal), fields(principal_id = %principal.principal_id, account = %principal.display_name))]
    pub async fn classify(&self, principal: &Principal) -> OwnershipReport {
        let mut probe_failure = None;

        let exists = match self.gateway.exists(&principal.display_name).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!(error = %e, "Existence probe failed; assuming the account exists");
                probe_failure = Some(ProbeFailure::Existence(e));
                true
            }
        };

        if !exists {
            debug!(classification = %Classification::Absent, "Classified");
            return OwnershipReport {
                classification: Classification::Absent,
                probe_failure,
            };
        }

        let managed = match self.registry.get(&principal.principal_id).await {
            Ok(record) => record.is_some(),
            Err(e) => {
                warn!(error = %e, "Registry lookup failed; assuming the account is not managed");
                probe_failure = Some(ProbeFailure::Registry(e));
                false
            }
        };

        let classification = if managed {
            Classification::ManagedExisting
        } else {
            Classification::UnmanagedExisting
        };

        debug!(classification = %classification, "Classified");
        OwnershipReport {
            classification,
            probe_failure,
        }
    }
}
