//! Records shared between the resolver, the engines and the registry.

use serde::{Deserialize, Serialize};

use crate::ids::{AccountName, PrincipalId};

/// A directory principal resolved for one event.
///
/// Resolved once per event and never cached across invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Stable directory identifier.
    pub principal_id: PrincipalId,
    /// Login name to create in the database.
    pub display_name: AccountName,
}

impl Principal {
    /// Create a new principal.
    #[must_use]
    pub fn new(principal_id: PrincipalId, display_name: AccountName) -> Self {
        Self {
            principal_id,
            display_name,
        }
    }
}

/// Ownership record for an account this system created.
///
/// A record exists if and only if the system created, and still owns, the
/// database account named `username`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryRecord {
    /// Directory identifier (registry key).
    pub principal_id: PrincipalId,
    /// Database login name that was created for the principal.
    pub username: AccountName,
}

impl RegistryRecord {
    /// Create a new registry record.
    #[must_use]
    pub fn new(principal_id: PrincipalId, username: AccountName) -> Self {
        Self {
            principal_id,
            username,
        }
    }
}

impl From<&Principal> for RegistryRecord {
    fn from(principal: &Principal) -> Self {
        Self::new(
            principal.principal_id.clone(),
            principal.display_name.clone(),
        )
    }
}
