//! Wires the configured backends into an event dispatcher.

use std::sync::Arc;

use aws_config::{BehaviorVersion, SdkConfig};
use tracing::{info, warn};

use dbsync_connector::config::ConnectorConfig;
use dbsync_connector::resilience::{RetryConfig, RetryingGateway};
use dbsync_connector::traits::AccountGateway;
use dbsync_connector_database::gateway_with_aws_config;
use dbsync_directory::{DirectoryResolver, IdentityStoreDirectory};
use dbsync_provisioning::{DeprovisioningEngine, EventDispatcher, ProvisioningEngine, SyncError, SyncResult};
use dbsync_registry::{DynamoRegistryStore, PgRegistryStore, RegistryStore};

use crate::config::{RegistryBackend, WorkerConfig};

/// Collaborators for one invocation.
pub struct Runtime {
    pub gateway: Arc<dyn AccountGateway>,
    pub registry: Arc<dyn RegistryStore>,
    pub dispatcher: EventDispatcher,
}

impl Runtime {
    /// Build every collaborator from configuration. Nothing connects yet.
    pub async fn build(config: &WorkerConfig) -> SyncResult<Self> {
        info!(
            database = ?config.database.redacted(),
            registry = config.registry.name(),
            managed_groups = config.policy.len(),
            "Building runtime"
        );

        let sdk_config = aws_config::defaults(BehaviorVersion::latest()).load().await;

        let gateway = gateway_with_aws_config(config.database.clone(), sdk_config.clone())
            .map_err(|e| SyncError::configuration(e.to_string()))?;
        let gateway: Arc<dyn AccountGateway> = Arc::new(RetryingGateway::new(
            gateway,
            RetryConfig::with_max_retries(config.max_retries),
        ));

        let registry = build_registry(config, &sdk_config).await?;

        let mut directory =
            IdentityStoreDirectory::new(aws_sdk_identitystore::Client::new(&sdk_config));
        if let Some(identity_store_id) = &config.identity_store_id {
            directory = directory.with_default_identity_store(identity_store_id.clone());
        }
        let resolver = DirectoryResolver::new(Arc::new(directory));

        let dispatcher = EventDispatcher::new(
            ProvisioningEngine::new(gateway.clone(), registry.clone(), resolver),
            DeprovisioningEngine::new(gateway.clone(), registry.clone()),
            Arc::new(config.policy.clone()),
        );

        Ok(Self {
            gateway,
            registry,
            dispatcher,
        })
    }

    /// Release the gateway's pool.
    pub async fn shutdown(&self) {
        if let Err(e) = self.gateway.dispose().await {
            warn!(error = %e, "Failed to dispose gateway");
        }
    }
}

async fn build_registry(
    config: &WorkerConfig,
    sdk_config: &SdkConfig,
) -> SyncResult<Arc<dyn RegistryStore>> {
    match &config.registry {
        RegistryBackend::DynamoDb { table_name } => Ok(Arc::new(DynamoRegistryStore::new(
            aws_sdk_dynamodb::Client::new(sdk_config),
            table_name.clone(),
        ))),
        RegistryBackend::Postgres { database_url } => {
            let store = PgRegistryStore::connect_lazy(
                database_url,
                config.database.connection.connection_timeout(),
            )
            .map_err(|e| SyncError::configuration(e.to_string()))?;
            store
                .ensure_schema()
                .await
                .map_err(SyncError::registry_lookup)?;
            Ok(Arc::new(store))
        }
    }
}
