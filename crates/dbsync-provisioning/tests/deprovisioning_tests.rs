//! Deprovisioning Engine and Dispatcher Tests

mod common;

use common::*;

use dbsync_directory::EventKind;
use dbsync_provisioning::{
    DeprovisionOutcome, HandlerOutcome, ProvisionOutcome, ProvisioningStage, Status, SyncError,
};

// =============================================================================
// Deprovisioning
// =============================================================================

#[tokio::test]
async fn test_removal_drops_account_and_deletes_record() {
    let h = Harness::new(
        MockGateway::new().with_account("alice"),
        MockRegistry::new().with_record("p-1", "alice"),
        MockDirectory::new(),
    );

    let outcome = h
        .deprovisioning
        .deprovision(&remove_member("p-1", MANAGED_GROUP))
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        DeprovisionOutcome::Deprovisioned { ref account } if account.as_str() == "alice"
    ));
    assert!(!h.gateway.has_account("alice"));
    assert_eq!(h.registry.record_count(), 0);
    // Removal trusts the registry; the directory is never consulted.
    assert_eq!(h.directory.lookups(), 0);
}

#[tokio::test]
async fn test_deleted_principal_without_record_is_a_no_op() {
    let h = Harness::new(
        MockGateway::new().with_account("alice"),
        MockRegistry::new(),
        MockDirectory::new(),
    );

    let outcome = h
        .deprovisioning
        .deprovision(&delete_principal("p-1"))
        .await
        .unwrap();

    assert!(matches!(outcome, DeprovisionOutcome::NothingToRemove { .. }));
    assert_eq!(h.gateway.drop_calls(), 0);
    assert!(h.gateway.has_account("alice"));
}

#[tokio::test]
async fn test_group_removal_without_record_is_an_error() {
    let h = Harness::new(
        MockGateway::new().with_account("alice"),
        MockRegistry::new(),
        MockDirectory::new(),
    );

    let err = h
        .deprovisioning
        .deprovision(&remove_member("p-1", MANAGED_GROUP))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::MissingRegistryRecord { .. }));
    assert_eq!(h.gateway.drop_calls(), 0);
    assert!(h.gateway.has_account("alice"));
}

#[tokio::test]
async fn test_deleted_principal_with_record_is_deprovisioned() {
    let h = Harness::new(
        MockGateway::new().with_account("alice"),
        MockRegistry::new().with_record("p-1", "alice"),
        MockDirectory::new(),
    );

    h.deprovisioning
        .deprovision(&delete_principal("p-1"))
        .await
        .unwrap();

    assert_eq!(h.gateway.account_count(), 0);
    assert_eq!(h.registry.record_count(), 0);
}

#[tokio::test]
async fn test_drop_failure_keeps_record() {
    let h = Harness::new(
        MockGateway::new().with_account("alice").with_drop_error(),
        MockRegistry::new().with_record("p-1", "alice"),
        MockDirectory::new(),
    );

    let err = h
        .deprovisioning
        .deprovision(&remove_member("p-1", MANAGED_GROUP))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SyncError::Provisioning {
            stage: ProvisioningStage::Drop,
            ..
        }
    ));
    assert!(err.is_retryable());
    assert_eq!(h.registry.delete_calls(), 0);
    assert_eq!(h.registry.username_of("p-1").as_deref(), Some("alice"));
}

#[tokio::test]
async fn test_registry_delete_failure_leaves_orphaned_record() {
    let h = Harness::new(
        MockGateway::new().with_account("alice"),
        MockRegistry::new()
            .with_record("p-1", "alice")
            .with_delete_error(),
        MockDirectory::new(),
    );

    let err = h
        .deprovisioning
        .deprovision(&remove_member("p-1", MANAGED_GROUP))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SyncError::Provisioning {
            stage: ProvisioningStage::Unregister,
            ..
        }
    ));
    assert!(!h.gateway.has_account("alice"));
    assert_eq!(h.registry.record_count(), 1);
}

#[tokio::test]
async fn test_orphaned_record_is_cleaned_up_on_retry() {
    // Account already gone, record still present.
    let h = Harness::new(
        MockGateway::new(),
        MockRegistry::new().with_record("p-1", "alice"),
        MockDirectory::new(),
    );

    h.deprovisioning
        .deprovision(&remove_member("p-1", MANAGED_GROUP))
        .await
        .unwrap();

    assert_eq!(h.registry.record_count(), 0);
}

#[tokio::test]
async fn test_registry_lookup_failure_is_retryable() {
    let h = Harness::new(
        MockGateway::new().with_account("alice"),
        MockRegistry::new().with_get_error(),
        MockDirectory::new(),
    );

    let err = h
        .deprovisioning
        .deprovision(&remove_member("p-1", MANAGED_GROUP))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Lookup { .. }));
    assert!(err.is_retryable());
    assert_eq!(h.gateway.drop_calls(), 0);
}

#[tokio::test]
async fn test_addition_is_not_applicable() {
    let h = Harness::new(MockGateway::new(), MockRegistry::new(), MockDirectory::new());

    let outcome = h
        .deprovisioning
        .deprovision(&add_member("p-1", MANAGED_GROUP))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        DeprovisionOutcome::NotApplicable {
            kind: EventKind::AddMember
        }
    );
    assert_eq!(h.gateway.drop_calls(), 0);
}

#[tokio::test]
async fn test_provision_then_deprovision_restores_empty_state() {
    let h = Harness::new(
        MockGateway::new(),
        MockRegistry::new(),
        MockDirectory::new().with_user("p-1", "alice"),
    );

    h.provisioning
        .provision(&add_member("p-1", MANAGED_GROUP), &h.policy)
        .await
        .unwrap();
    assert_eq!(h.gateway.account_count(), 1);

    h.deprovisioning
        .deprovision(&remove_member("p-1", MANAGED_GROUP))
        .await
        .unwrap();

    assert_eq!(h.gateway.account_count(), 0);
    assert_eq!(h.registry.record_count(), 0);
}

#[tokio::test]
async fn test_unmanaged_account_survives_removal() {
    let h = Harness::new(
        MockGateway::new().with_account("alice"),
        MockRegistry::new(),
        MockDirectory::new().with_user("p-1", "alice"),
    );

    h.provisioning
        .provision(&add_member("p-1", MANAGED_GROUP), &h.policy)
        .await
        .unwrap();
    let _ = h
        .deprovisioning
        .deprovision(&delete_principal("p-1"))
        .await
        .unwrap();

    assert!(h.gateway.has_account("alice"));
    assert_eq!(h.gateway.drop_calls(), 0);
}

// =============================================================================
// Dispatcher
// =============================================================================

const ADD_MEMBER_EVENT: &str = r#"{
    "version": "0",
    "source": "aws.sso-directory",
    "detail-type": "AWS API Call via CloudTrail",
    "detail": {
        "eventID": "a1b2c3",
        "eventName": "AddMemberToGroup",
        "requestParameters": {
            "identityStoreId": "d-9067000000",
            "groupId": "g-analysts",
            "member": { "memberId": "p-1" }
        }
    }
}"#;

const REMOVE_MEMBER_EVENT: &str = r#"{
    "detail": {
        "eventName": "RemoveMemberFromGroup",
        "requestParameters": {
            "identityStoreId": "d-9067000000",
            "groupId": "g-analysts",
            "memberId": "p-1"
        }
    }
}"#;

#[tokio::test]
async fn test_dispatcher_routes_addition_and_removal() {
    let h = Harness::new(
        MockGateway::new(),
        MockRegistry::new(),
        MockDirectory::new().with_user("p-1", "alice"),
    );

    let status = h.dispatcher.handle_json(ADD_MEMBER_EVENT).await.unwrap();
    assert_eq!(status.status, Status::Success);
    assert!(matches!(
        status.outcome,
        Some(HandlerOutcome::Provision(ProvisionOutcome::Provisioned { .. }))
    ));
    assert!(h.gateway.has_account("alice"));

    let status = h.dispatcher.handle_json(REMOVE_MEMBER_EVENT).await.unwrap();
    assert!(status.is_success());
    assert!(matches!(
        status.outcome,
        Some(HandlerOutcome::Deprovision(DeprovisionOutcome::Deprovisioned { .. }))
    ));
    assert_eq!(h.gateway.account_count(), 0);
}

#[tokio::test]
async fn test_dispatcher_rejects_unsupported_event() {
    let h = Harness::new(MockGateway::new(), MockRegistry::new(), MockDirectory::new());

    let err = h
        .dispatcher
        .handle_json(r#"{"detail": {"eventName": "UpdateGroup", "requestParameters": {}}}"#)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::InvalidEvent(_)));
    assert!(!err.is_retryable());
    assert_eq!(h.gateway.exists_calls(), 0);
}

#[tokio::test]
async fn test_dispatcher_rejects_malformed_payload() {
    let h = Harness::new(MockGateway::new(), MockRegistry::new(), MockDirectory::new());

    let err = h.dispatcher.handle_json("not json").await.unwrap_err();

    assert!(matches!(err, SyncError::InvalidEvent(_)));
}
