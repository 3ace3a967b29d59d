//! Manual mocks shared by the engine tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use dbsync_connector::error::{ConnectorError, ConnectorResult};
use dbsync_connector::traits::{AccountGateway, Connector};
use dbsync_core::{
    AccountName, GroupId, IdentityStoreId, PrincipalId, RegistryRecord, RoleName,
};
use dbsync_directory::{
    DirectoryError, DirectoryResolver, DirectoryResult, DirectoryService, EventKind, GroupPolicy,
    MembershipEvent,
};
use dbsync_provisioning::{DeprovisioningEngine, EventDispatcher, ProvisioningEngine};
use dbsync_registry::{RegistryError, RegistryResult, RegistryStore};

pub const MANAGED_GROUP: &str = "g-analysts";
pub const MANAGED_ROLE: &str = "analyst_role";
pub const IDENTITY_STORE: &str = "d-9067000000";

// =============================================================================
// Account gateway
// =============================================================================

/// In-memory database: account name -> granted roles.
#[derive(Default)]
pub struct MockGateway {
    accounts: Mutex<BTreeMap<String, BTreeSet<String>>>,
    fail_exists: AtomicBool,
    fail_create: AtomicBool,
    fail_grant: AtomicBool,
    fail_drop: AtomicBool,
    exists_calls: AtomicUsize,
    create_calls: AtomicUsize,
    grant_calls: AtomicUsize,
    drop_calls: AtomicUsize,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account that exists before the test starts.
    pub fn with_account(self, name: &str) -> Self {
        self.accounts
            .lock()
            .unwrap()
            .insert(name.to_string(), BTreeSet::new());
        self
    }

    pub fn with_exists_error(self) -> Self {
        self.fail_exists.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_create_error(self) -> Self {
        self.fail_create.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_grant_error(self) -> Self {
        self.fail_grant.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_drop_error(self) -> Self {
        self.fail_drop.store(true, Ordering::SeqCst);
        self
    }

    pub fn set_grant_error(&self, fail: bool) {
        self.fail_grant.store(fail, Ordering::SeqCst);
    }

    pub fn has_account(&self, name: &str) -> bool {
        self.accounts.lock().unwrap().contains_key(name)
    }

    pub fn roles_of(&self, name: &str) -> Vec<String> {
        self.accounts
            .lock()
            .unwrap()
            .get(name)
            .map(|roles| roles.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn account_count(&self) -> usize {
        self.accounts.lock().unwrap().len()
    }

    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn grant_calls(&self) -> usize {
        self.grant_calls.load(Ordering::SeqCst)
    }

    pub fn drop_calls(&self) -> usize {
        self.drop_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockGateway {
    fn display_name(&self) -> &str {
        "mock-gateway"
    }

    async fn test_connection(&self) -> ConnectorResult<()> {
        Ok(())
    }

    async fn dispose(&self) -> ConnectorResult<()> {
        Ok(())
    }
}

#[async_trait]
impl AccountGateway for MockGateway {
    async fn exists(&self, account: &AccountName) -> ConnectorResult<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_exists.load(Ordering::SeqCst) {
            return Err(ConnectorError::connection_failed("database unreachable"));
        }
        Ok(self.has_account(account.as_str()))
    }

    async fn create(&self, account: &AccountName) -> ConnectorResult<()> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(ConnectorError::operation_failed(
                "create account",
                "permission denied",
            ));
        }
        self.accounts
            .lock()
            .unwrap()
            .entry(account.as_str().to_string())
            .or_default();
        Ok(())
    }

    async fn grant(&self, account: &AccountName, role: &RoleName) -> ConnectorResult<()> {
        self.grant_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_grant.load(Ordering::SeqCst) {
            return Err(ConnectorError::ObjectNotFound {
                identifier: role.as_str().to_string(),
            });
        }
        match self.accounts.lock().unwrap().get_mut(account.as_str()) {
            Some(roles) => {
                roles.insert(role.as_str().to_string());
                Ok(())
            }
            None => Err(ConnectorError::ObjectNotFound {
                identifier: account.as_str().to_string(),
            }),
        }
    }

    async fn drop_account(&self, account: &AccountName) -> ConnectorResult<()> {
        self.drop_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_drop.load(Ordering::SeqCst) {
            return Err(ConnectorError::connection_failed("database unreachable"));
        }
        self.accounts.lock().unwrap().remove(account.as_str());
        Ok(())
    }
}

// =============================================================================
// Registry
// =============================================================================

/// In-memory registry: principal id -> username.
#[derive(Default)]
pub struct MockRegistry {
    records: Mutex<HashMap<String, String>>,
    fail_get: AtomicBool,
    fail_put: AtomicBool,
    fail_delete: AtomicBool,
    get_calls: AtomicUsize,
    put_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(self, principal_id: &str, username: &str) -> Self {
        self.records
            .lock()
            .unwrap()
            .insert(principal_id.to_string(), username.to_string());
        self
    }

    pub fn with_get_error(self) -> Self {
        self.fail_get.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_put_error(self) -> Self {
        self.fail_put.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_delete_error(self) -> Self {
        self.fail_delete.store(true, Ordering::SeqCst);
        self
    }

    pub fn username_of(&self, principal_id: &str) -> Option<String> {
        self.records.lock().unwrap().get(principal_id).cloned()
    }

    pub fn record_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegistryStore for MockRegistry {
    fn backend_name(&self) -> &'static str {
        "mock"
    }

    async fn get(&self, principal_id: &PrincipalId) -> RegistryResult<Option<RegistryRecord>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(RegistryError::backend("get", "throttled"));
        }
        Ok(self.username_of(principal_id.as_str()).map(|username| {
            RegistryRecord::new(principal_id.clone(), AccountName::new(username).unwrap())
        }))
    }

    async fn put(&self, record: &RegistryRecord) -> RegistryResult<()> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(RegistryError::backend("put", "throttled"));
        }
        self.records.lock().unwrap().insert(
            record.principal_id.as_str().to_string(),
            record.username.as_str().to_string(),
        );
        Ok(())
    }

    async fn delete(&self, principal_id: &PrincipalId) -> RegistryResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(RegistryError::backend("delete", "throttled"));
        }
        self.records.lock().unwrap().remove(principal_id.as_str());
        Ok(())
    }

    async fn check(&self) -> RegistryResult<()> {
        Ok(())
    }
}

// =============================================================================
// Directory
// =============================================================================

/// Directory with a fixed principal -> user name table.
#[derive(Default)]
pub struct MockDirectory {
    users: HashMap<String, String>,
    fail: AtomicBool,
    lookups: AtomicUsize,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, principal_id: &str, user_name: &str) -> Self {
        self.users
            .insert(principal_id.to_string(), user_name.to_string());
        self
    }

    pub fn with_error(self) -> Self {
        self.fail.store(true, Ordering::SeqCst);
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DirectoryService for MockDirectory {
    async fn resolve_principal(
        &self,
        _identity_store_id: Option<&IdentityStoreId>,
        principal_id: &PrincipalId,
    ) -> DirectoryResult<Option<AccountName>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(DirectoryError::LookupFailed {
                message: "throttled".to_string(),
            });
        }
        Ok(self
            .users
            .get(principal_id.as_str())
            .map(|name| AccountName::new(name.as_str()).unwrap()))
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub struct Harness {
    pub gateway: Arc<MockGateway>,
    pub registry: Arc<MockRegistry>,
    pub directory: Arc<MockDirectory>,
    pub provisioning: ProvisioningEngine,
    pub deprovisioning: DeprovisioningEngine,
    pub dispatcher: EventDispatcher,
    pub policy: Arc<GroupPolicy>,
}

impl Harness {
    pub fn new(gateway: MockGateway, registry: MockRegistry, directory: MockDirectory) -> Self {
        let gateway = Arc::new(gateway);
        let registry = Arc::new(registry);
        let directory = Arc::new(directory);
        let policy = Arc::new(policy());

        let resolver = DirectoryResolver::new(directory.clone());
        let provisioning = ProvisioningEngine::new(gateway.clone(), registry.clone(), resolver);
        let deprovisioning = DeprovisioningEngine::new(gateway.clone(), registry.clone());
        let dispatcher =
            EventDispatcher::new(provisioning.clone(), deprovisioning.clone(), policy.clone());

        Self {
            gateway,
            registry,
            directory,
            provisioning,
            deprovisioning,
            dispatcher,
            policy,
        }
    }
}

pub fn policy() -> GroupPolicy {
    GroupPolicy::from_json(&format!(r#"{{"{MANAGED_GROUP}": "{MANAGED_ROLE}"}}"#)).unwrap()
}

pub fn add_member(principal_id: &str, group_id: &str) -> MembershipEvent {
    MembershipEvent::new(EventKind::AddMember, PrincipalId::new(principal_id).unwrap())
        .with_group(GroupId::new(group_id).unwrap())
        .with_identity_store(IdentityStoreId::new(IDENTITY_STORE).unwrap())
}

pub fn remove_member(principal_id: &str, group_id: &str) -> MembershipEvent {
    MembershipEvent::new(EventKind::RemoveMember, PrincipalId::new(principal_id).unwrap())
        .with_group(GroupId::new(group_id).unwrap())
        .with_identity_store(IdentityStoreId::new(IDENTITY_STORE).unwrap())
}

pub fn delete_principal(principal_id: &str) -> MembershipEvent {
    MembershipEvent::new(EventKind::DeletePrincipal, PrincipalId::new(principal_id).unwrap())
        .with_identity_store(IdentityStoreId::new(IDENTITY_STORE).unwrap())
}

pub fn create_principal(principal_id: &str) -> MembershipEvent {
    MembershipEvent::new(EventKind::CreatePrincipal, PrincipalId::new(principal_id).unwrap())
        .with_identity_store(IdentityStoreId::new(IDENTITY_STORE).unwrap())
}
