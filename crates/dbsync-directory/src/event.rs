//! Membership events.
//!
//! IAM Identity Center reports directory changes as CloudTrail records
//! (`eventSource: sso-directory.amazonaws.com`) delivered through
//! EventBridge. Only the four event names below are handled:
//!
//! | `eventName` | Kind | Principal field |
//! |---|---|---|
//! | `AddMemberToGroup` | add-member | `requestParameters.member.memberId` |
//! | `RemoveMemberFromGroup` | remove-member | `requestParameters.memberId` |
//! | `CreateUser` | create-principal | `responseElements.user.userId` |
//! | `DeleteUser` | delete-principal | `requestParameters.userId` |

use serde::{Deserialize, Serialize};
use serde_json::Value;

use dbsync_core::{GroupId, IdentityStoreId, PrincipalId};

use crate::error::EventError;

/// Kind of directory change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A principal was added to a group.
    AddMember,
    /// A principal was removed from a group.
    RemoveMember,
    /// A principal was created.
    CreatePrincipal,
    /// A principal was deleted.
    DeletePrincipal,
}

impl EventKind {
    /// Map a CloudTrail event name.
    #[must_use]
    pub fn from_event_name(name: &str) -> Option<Self> {
        match name {
            "AddMemberToGroup" => Some(EventKind::AddMember),
            "RemoveMemberFromGroup" => Some(EventKind::RemoveMember),
            "CreateUser" => Some(EventKind::CreatePrincipal),
            "DeleteUser" => Some(EventKind::DeletePrincipal),
            _ => None,
        }
    }

    /// CloudTrail event name for this kind.
    #[must_use]
    pub fn event_name(&self) -> &'static str {
        match self {
            EventKind::AddMember => "AddMemberToGroup",
            EventKind::RemoveMember => "RemoveMemberFromGroup",
            EventKind::CreatePrincipal => "CreateUser",
            EventKind::DeletePrincipal => "DeleteUser",
        }
    }

    /// Whether this kind may lead to account creation.
    #[must_use]
    pub fn is_addition(&self) -> bool {
        matches!(self, EventKind::AddMember | EventKind::CreatePrincipal)
    }

    /// Whether this kind may lead to account removal.
    #[must_use]
    pub fn is_removal(&self) -> bool {
        matches!(self, EventKind::RemoveMember | EventKind::DeletePrincipal)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.event_name())
    }
}

/// A decoded membership change. Consumed within one invocation, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipEvent {
    /// CloudTrail event id, if present.
    pub event_id: Option<String>,
    /// Kind of change.
    pub kind: EventKind,
    /// Principal the change applies to.
    pub principal_id: PrincipalId,
    /// Group for membership changes.
    pub group_id: Option<GroupId>,
    /// Identity store the principal lives in.
    pub identity_store_id: Option<IdentityStoreId>,
}

impl MembershipEvent {
    /// Create an event without a group or identity store.
    #[must_use]
    pub fn new(kind: EventKind, principal_id: PrincipalId) -> Self {
        Self {
            event_id: None,
            kind,
            principal_id,
            group_id: None,
            identity_store_id: None,
        }
    }

    /// Set the group.
    #[must_use]
    pub fn with_group(mut self, group_id: GroupId) -> Self {
        self.group_id = Some(group_id);
        self
    }

    /// Set the identity store.
    #[must_use]
    pub fn with_identity_store(mut self, identity_store_id: IdentityStoreId) -> Self {
        self.identity_store_id = Some(identity_store_id);
        self
    }

    /// Decode an EventBridge envelope, or a bare CloudTrail record, from JSON text.
    pub fn from_json(payload: &str) -> Result<Self, EventError> {
        let value: Value = serde_json::from_str(payload)?;
        Self::from_value(value)
    }

    /// Decode an EventBridge envelope, or a bare CloudTrail record.
    pub fn from_value(mut value: Value) -> Result<Self, EventError> {
        let detail = match value.get_mut("detail") {
            Some(detail) => detail.take(),
            None => value,
        };
        let detail: CloudTrailDetail = serde_json::from_value(detail)?;
        detail.into_event()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CloudTrailDetail {
    event_name: String,
    #[serde(default, rename = "eventID")]
    event_id: Option<String>,
    #[serde(default)]
    request_parameters: Option<RequestParameters>,
    #[serde(default)]
    response_elements: Option<ResponseElements>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestParameters {
    identity_store_id: Option<String>,
    group_id: Option<String>,
    member_id: Option<String>,
    user_id: Option<String>,
    member: Option<MemberRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemberRef {
    member_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseElements {
    user: Option<UserRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRef {
    user_id: Option<String>,
}

impl CloudTrailDetail {
    fn into_event(self) -> Result<MembershipEvent, EventError> {
        let kind = EventKind::from_event_name(&self.event_name).ok_or_else(|| {
            EventError::UnsupportedEvent {
                event_name: self.event_name.clone(),
            }
        })?;

        let event_name = self.event_name;
        let missing = |field: &'static str| EventError::MissingField {
            event_name: event_name.clone(),
            field,
        };

        let params = self.request_parameters.unwrap_or_default();

        let principal_id = match kind {
            EventKind::AddMember => params
                .member
                .as_ref()
                .and_then(|m| m.member_id.clone())
                .ok_or_else(|| missing("requestParameters.member.memberId"))?,
            EventKind::RemoveMember => params
                .member_id
                .clone()
                .ok_or_else(|| missing("requestParameters.memberId"))?,
            EventKind::CreatePrincipal => self
                .response_elements
                .and_then(|r| r.user)
                .and_then(|u| u.user_id)
                .ok_or_else(|| missing("responseElements.user.userId"))?,
            EventKind::DeletePrincipal => params
                .user_id
                .clone()
                .ok_or_else(|| missing("requestParameters.userId"))?,
        };

        let group_id = match kind {
            EventKind::AddMember | EventKind::RemoveMember => Some(GroupId::new(
                params
                    .group_id
                    .ok_or_else(|| missing("requestParameters.groupId"))?,
            )?),
            EventKind::CreatePrincipal | EventKind::DeletePrincipal => None,
        };

        let identity_store_id = params
            .identity_store_id
            .map(IdentityStoreId::new)
            .transpose()?;

        Ok(MembershipEvent {
            event_id: self.event_id,
            kind,
            principal_id: PrincipalId::new(principal_id)?,
            group_id,
            identity_store_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(detail: Value) -> String {
        json!({
            "version": "0",
            "id": "6a7e8feb-b491-4cf7-a9f1-bf3703467718",
            "detail-type": "AWS API Call via CloudTrail",
            "source": "aws.sso-directory",
            "detail": detail,
        })
        .to_string()
    }

    #[test]
    fn test_parse_add_member() {
        let payload = envelope(json!({
            "eventSource": "sso-directory.amazonaws.com",
            "eventName": "AddMemberToGroup",
            "eventID": "e-1",
            "requestParameters": {
                "identityStoreId": "d-1234567890",
                "groupId": "g-admins",
                "member": {"memberId": "u-alice"}
            }
        }));

        let event = MembershipEvent::from_json(&payload).unwrap();
        assert_eq!(event.kind, EventKind::AddMember);
        assert_eq!(event.principal_id.as_str(), "u-alice");
        assert_eq!(event.group_id.unwrap().as_str(), "g-admins");
        assert_eq!(event.identity_store_id.unwrap().as_str(), "d-1234567890");
    }

    #[test]
    fn test_parse_remove_member() {
        let payload = envelope(json!({
            "eventName": "RemoveMemberFromGroup",
            "requestParameters": {
                "identityStoreId": "d-1234567890",
                "groupId": "g-admins",
                "memberId": "u-alice"
            }
        }));

        let event = MembershipEvent::from_json(&payload).unwrap();
        assert_eq!(event.kind, EventKind::RemoveMember);
        assert_eq!(event.principal_id.as_str(), "u-alice");
        assert!(event.kind.is_removal());
    }

    #[test]
    fn test_parse_create_user_reads_response_elements() {
        let payload = envelope(json!({
            "eventName": "CreateUser",
            "requestParameters": {"identityStoreId": "d-1234567890"},
            "responseElements": {"user": {"userId": "u-new"}}
        }));

        let event = MembershipEvent::from_json(&payload).unwrap();
        assert_eq!(event.kind, EventKind::CreatePrincipal);
        assert_eq!(event.principal_id.as_str(), "u-new");
        assert!(event.group_id.is_none());
    }

    #[test]
    fn test_parse_delete_user() {
        let payload = envelope(json!({
            "eventName": "DeleteUser",
            "requestParameters": {"identityStoreId": "d-1234567890", "userId": "u-gone"}
        }));

        let event = MembershipEvent::from_json(&payload).unwrap();
        assert_eq!(event.kind, EventKind::DeletePrincipal);
        assert_eq!(event.principal_id.as_str(), "u-gone");
    }

    #[test]
    fn test_parse_bare_detail() {
        let payload = json!({
            "eventName": "DeleteUser",
            "requestParameters": {"userId": "u-gone"}
        })
        .to_string();

        let event = MembershipEvent::from_json(&payload).unwrap();
        assert_eq!(event.kind, EventKind::DeletePrincipal);
        assert!(event.identity_store_id.is_none());
    }

    #[test]
    fn test_unsupported_event_name() {
        let payload = envelope(json!({"eventName": "UpdateUser"}));

        let err = MembershipEvent::from_json(&payload).unwrap_err();
        assert!(matches!(err, EventError::UnsupportedEvent { ref event_name } if event_name == "UpdateUser"));
    }

    #[test]
    fn test_missing_member_id() {
        let payload = envelope(json!({
            "eventName": "AddMemberToGroup",
            "requestParameters": {"groupId": "g-admins"}
        }));

        let err = MembershipEvent::from_json(&payload).unwrap_err();
        assert!(matches!(
            err,
            EventError::MissingField {
                field: "requestParameters.member.memberId",
                ..
            }
        ));
    }

    #[test]
    fn test_missing_group_on_membership_event() {
        let payload = envelope(json!({
            "eventName": "RemoveMemberFromGroup",
            "requestParameters": {"memberId": "u-alice"}
        }));

        let err = MembershipEvent::from_json(&payload).unwrap_err();
        assert!(matches!(err, EventError::MissingField { field: "requestParameters.groupId", .. }));
    }

    #[test]
    fn test_empty_principal_is_invalid() {
        let payload = envelope(json!({
            "eventName": "DeleteUser",
            "requestParameters": {"userId": "  "}
        }));

        let err = MembershipEvent::from_json(&payload).unwrap_err();
        assert!(matches!(err, EventError::InvalidIdentifier(_)));
    }

    #[test]
    fn test_not_json() {
        let err = MembershipEvent::from_json("not json").unwrap_err();
        assert!(matches!(err, EventError::Malformed(_)));
    }

    #[test]
    fn test_event_kind_classification() {
        assert!(EventKind::AddMember.is_addition());
        assert!(EventKind::CreatePrincipal.is_addition());
        assert!(EventKind::RemoveMember.is_removal());
        assert!(EventKind::DeletePrincipal.is_removal());
        assert_eq!(EventKind::AddMember.to_string(), "AddMemberToGroup");
    }
}
