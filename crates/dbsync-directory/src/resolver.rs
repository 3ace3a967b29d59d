//! Directory resolver.
//!
//! Turns a membership event plus the group policy into the principal and
//! role to provision, or a reason to skip.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument};

use dbsync_core::{GroupId, Principal, PrincipalId, RoleName};

use crate::error::DirectoryResult;
use crate::event::{EventKind, MembershipEvent};
use crate::policy::GroupPolicy;
use crate::service::DirectoryService;

/// Why an addition event needs no provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// Event is not an addition.
    NotAnAddition { kind: EventKind },
    /// New principals belong to no group yet; membership arrives as its own event.
    PrincipalCreated,
    /// Group is not in the policy.
    UnmanagedGroup { group_id: GroupId },
    /// Addition event without a group.
    NoGroup,
    /// Directory has no usable name for the principal.
    PrincipalNotFound { principal_id: PrincipalId },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NotAnAddition { kind } => write!(f, "{kind} is not an addition"),
            SkipReason::PrincipalCreated => f.write_str("principal created without group membership"),
            SkipReason::UnmanagedGroup { group_id } => write!(f, "group {group_id} is not managed"),
            SkipReason::NoGroup => f.write_str("event has no group"),
            SkipReason::PrincipalNotFound { principal_id } => {
                write!(f, "principal {principal_id} not found in directory")
            }
        }
    }
}

/// Principal and role to provision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisioningTarget {
    /// Resolved principal.
    pub principal: Principal,
    /// Group that triggered the addition.
    pub group_id: GroupId,
    /// Role granted by that group.
    pub role: RoleName,
}

/// Outcome of resolving an addition event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Nothing to provision.
    Skip(SkipReason),
    /// Provision this target.
    Target(ProvisioningTarget),
}

/// Resolves events against the directory and the group policy.
#[derive(Clone)]
pub struct DirectoryResolver {
    directory: Arc<dyn DirectoryService>,
}

impl std::fmt::Debug for DirectoryResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryResolver").finish_non_exhaustive()
    }
}

impl DirectoryResolver {
    /// Create a resolver over a directory service.
    pub fn new(directory: Arc<dyn DirectoryService>) -> Self {
        Self { directory }
    }

    /// Resolve an addition event.
    ///
    /// Makes at most one directory lookup, and only for a managed group.
    #[instrument(skip(self, event, policy), fields(principal_id = %event.principal_id, kind = %event.kind))]
    pub async fn resolve_addition(
        &self,
        event: &MembershipEvent,
        policy: &GroupPolicy,
    ) -> DirectoryResult<Resolution> {
        match event.kind {
            EventKind::AddMember => {}
            EventKind::CreatePrincipal => {
                info!("Principal created; waiting for group membership event");
                return Ok(Resolution::Skip(SkipReason::PrincipalCreated));
            }
            kind => return Ok(Resolution::Skip(SkipReason::NotAnAddition { kind })),
        }

        let Some(ref group_id) = event.group_id else {
            return Ok(Resolution::Skip(SkipReason::NoGroup));
        };

        let Some(role) = policy.role_for(group_id) else {
            info!(group_id = %group_id, "Group is not managed by this deployment");
            return Ok(Resolution::Skip(SkipReason::UnmanagedGroup {
                group_id: group_id.clone(),
            }));
        };

        let display_name = self
            .directory
            .resolve_principal(event.identity_store_id.as_ref(), &event.principal_id)
            .await?;

        let Some(display_name) = display_name else {
            info!("Principal not found in directory");
            return Ok(Resolution::Skip(SkipReason::PrincipalNotFound {
                principal_id: event.principal_id.clone(),
            }));
        };

        debug!(display_name = %display_name, role = %role, "Resolved provisioning target");

        Ok(Resolution::Target(ProvisioningTarget {
            principal: Principal::new(event.principal_id.clone(), display_name),
            group_id: group_id.clone(),
            role: role.clone(),
        }))
    }

    /// Principal of a removal event, straight from the event.
    ///
    /// Group membership is not re-checked against the policy.
    #[must_use]
    pub fn resolve_removal(event: &MembershipEvent) -> Option<&PrincipalId> {
        event.kind.is_removal().then_some(&event.principal_id)
    }
}
