//! dbsync Core Library
//!
//! Shared types for directory-to-database account synchronization.
//!
//! # Modules
//!
//! - [`ids`] - Strongly typed identifiers (`PrincipalId`, `GroupId`, `AccountName`, `RoleName`)
//! - [`model`] - Records exchanged between the resolver, the engines and the registry
//!
//! # Example
//!
//! ```
//! use dbsync_core::{AccountName, Principal, PrincipalId};
//!
//! let principal = Principal::new(
//!     PrincipalId::new("9067d0d1-2f7c-4f3e-8e2d-1b3f0c9a5e11").unwrap(),
//!     AccountName::new("alice").unwrap(),
//! );
//! assert_eq!(principal.display_name.as_str(), "alice");
//! ```

pub mod ids;
pub mod model;

pub use ids::{AccountName, GroupId, IdentityStoreId, ParseIdError, PrincipalId, RoleName};
pub use model::{Principal, RegistryRecord};
