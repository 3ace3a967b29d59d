//! # Directory
//!
//! Everything between a raw directory notification and a provisioning target:
//!
//! - [`event`] - CloudTrail/EventBridge membership events
//! - [`policy`] - group to role mapping
//! - [`service`] - principal lookup in the directory (IAM Identity Center)
//! - [`resolver`] - turns an event plus policy into a target or a skip

pub mod error;
pub mod event;
pub mod identity_store;
pub mod policy;
pub mod resolver;
pub mod service;

pub use error::{DirectoryError, DirectoryResult, EventError, PolicyError};
pub use event::{EventKind, MembershipEvent};
pub use identity_store::IdentityStoreDirectory;
pub use policy::GroupPolicy;
pub use resolver::{DirectoryResolver, ProvisioningTarget, Resolution, SkipReason};
pub use service::DirectoryService;
