//! # Provisioning
//!
//! Keeps a database's login accounts in step with directory group
//! membership, touching only accounts recorded as managed.
//!
//! - [`OwnershipClassifier`] - absent / managed / unmanaged
//! - [`ProvisioningEngine`] - create, grant, register, with rollback
//! - [`DeprovisioningEngine`] - drop, then unregister
//! - [`EventDispatcher`] - routes one event to the right engine
//!
//! Collaborators are injected already constructed: an
//! [`AccountGateway`](dbsync_connector::traits::AccountGateway), a
//! [`RegistryStore`](dbsync_registry::RegistryStore) and a
//! [`DirectoryResolver`](dbsync_directory::DirectoryResolver).
//!
//! Concurrent events for the same principal are not serialized here. Two
//! simultaneous additions can both classify the account as absent; the
//! idempotent create keeps that from failing, and callers needing strict
//! single-writer semantics must serialize events upstream.

pub mod classifier;
pub mod deprovision;
pub mod dispatcher;
pub mod error;
pub mod provision;

pub use classifier::{Classification, OwnershipClassifier, OwnershipReport, ProbeFailure};
pub use deprovision::{DeprovisionOutcome, DeprovisioningEngine};
pub use dispatcher::{EventDispatcher, HandlerOutcome, HandlerStatus, Status};
pub use error::{LookupTarget, ProvisioningStage, RollbackOutcome, SyncError, SyncResult};
pub use provision::{ProvisionOutcome, ProvisioningEngine, ProvisioningState};
