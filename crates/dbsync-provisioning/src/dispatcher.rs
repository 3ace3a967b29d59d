//! Routes one event to the matching engine.

use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;

use dbsync_directory::{GroupPolicy, MembershipEvent};

use crate::deprovision::{DeprovisionOutcome, DeprovisioningEngine};
use crate::error::{SyncError, SyncResult};
use crate::provision::{ProvisionOutcome, ProvisioningEngine};

/// Outcome of a handled event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum HandlerOutcome {
    Provision(ProvisionOutcome),
    Deprovision(DeprovisionOutcome),
}

/// Overall status reported to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    Success,
    Failure,
}

/// Status document returned to the caller, e.g. `{"status": "Success"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerStatus {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<HandlerOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl HandlerStatus {
    /// Success status carrying the outcome.
    #[must_use]
    pub fn success(outcome: HandlerOutcome) -> Self {
        Self {
            status: Status::Success,
            outcome: Some(outcome),
            error: None,
            error_code: None,
            retryable: None,
        }
    }

    /// Failure status describing an error.
    #[must_use]
    pub fn failure(error: &SyncError) -> Self {
        Self {
            status: Status::Failure,
            outcome: None,
            error: Some(error.to_string()),
            error_code: Some(error.error_code()),
            retryable: Some(error.is_retryable()),
        }
    }

    /// Whether the event was handled.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

/// Sends additions to the provisioning engine and removals to the
/// deprovisioning engine.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    provisioning: ProvisioningEngine,
    deprovisioning: DeprovisioningEngine,
    policy: Arc<GroupPolicy>,
}

impl EventDispatcher {
    /// Create a dispatcher.
    pub fn new(
        provisioning: ProvisioningEngine,
        deprovisioning: DeprovisioningEngine,
        policy: Arc<GroupPolicy>,
    ) -> Self {
        Self {
            provisioning,
            deprovisioning,
            policy,
        }
    }

    /// Handle a decoded event.
    #[instrument(skip(self, event), fields(event_id = ?event.event_id))]
    pub async fn handle(&self, event: &MembershipEvent) -> SyncResult<HandlerStatus> {
        let outcome = if event.kind.is_addition() {
            HandlerOutcome::Provision(self.provisioning.provision(event, &self.policy).await?)
        } else {
            HandlerOutcome::Deprovision(self.deprovisioning.deprovision(event).await?)
        };
        Ok(HandlerStatus::success(outcome))
    }

    /// Decode and handle a JSON event.
    pub async fn handle_json(&self, payload: &str) -> SyncResult<HandlerStatus> {
        let event = MembershipEvent::from_json(payload).map_err(SyncError::InvalidEvent)?;
        self.handle(&event).await
    }
}
