use dbsync_connector::config::{ConnectionSettings, ConnectorConfig};
use dbsync_connector_database::{DatabaseConfig, DatabaseDriver, SslMode};
use dbsync_core::IdentityStoreId;
use dbsync_directory::GroupPolicy;

/// Where ownership records are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryBackend {
    /// DynamoDB table keyed by `userID`.
    DynamoDb { table_name: String },
    /// PostgreSQL `managed_accounts` table.
    Postgres { database_url: String },
}

impl RegistryBackend {
    /// Backend name as accepted by `REGISTRY_BACKEND`.
    pub fn name(&self) -> &'static str {
        match self {
            RegistryBackend::DynamoDb { .. } => "dynamodb",
            RegistryBackend::Postgres { .. } => "postgres",
        }
    }
}

/// Configuration for the sync worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Target database and admin credentials.
    pub database: DatabaseConfig,

    /// Managed groups and the role each one grants.
    pub policy: GroupPolicy,

    /// Ownership registry.
    pub registry: RegistryBackend,

    /// Identity store used when an event does not carry one.
    pub identity_store_id: Option<IdentityStoreId>,

    /// Retries of transient database failures per gateway call.
    pub max_retries: u32,
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_reader(|key| std::env::var(key))
    }

    /// Load configuration from a custom variable reader.
    pub fn from_reader<F>(reader: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let required = |key: &str| {
            reader(key)
                .ok()
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingVar(key.into()))
        };
        let optional = |key: &str| reader(key).ok().filter(|value| !value.trim().is_empty());

        let host = required("RDS_DB_EP")?;
        let username = required("RDS_DB_USER")?;

        let engine = optional("RDS_DB_ENGINE").unwrap_or_else(|| "mysql".to_string());
        let driver = DatabaseDriver::from_engine_name(&engine).ok_or_else(|| {
            ConfigError::InvalidValue("RDS_DB_ENGINE".into(), format!("unsupported engine '{engine}'"))
        })?;

        let connect_timeout_secs = optional("DB_CONNECT_TIMEOUT_SECS")
            .map(|value| {
                value.parse::<u64>().map_err(|e| {
                    ConfigError::InvalidValue("DB_CONNECT_TIMEOUT_SECS".into(), e.to_string())
                })
            })
            .transpose()?
            .unwrap_or(3);

        let mut database = DatabaseConfig::new(driver, host, username).with_connection(
            ConnectionSettings::new().with_connection_timeout(connect_timeout_secs),
        );

        if let Some(port) = optional("RDS_DB_PORT") {
            let port = port
                .parse::<u16>()
                .map_err(|e| ConfigError::InvalidValue("RDS_DB_PORT".into(), e.to_string()))?;
            database = database.with_port(port);
        }

        if let Some(name) = optional("RDS_DB_NAME") {
            database = database.with_database(name);
        }

        if let Some(mode) = optional("RDS_DB_SSL_MODE") {
            let mode = SslMode::parse(&mode).ok_or_else(|| {
                ConfigError::InvalidValue("RDS_DB_SSL_MODE".into(), format!("unknown mode '{mode}'"))
            })?;
            database = database.with_ssl_mode(mode);
        }

        // No password means the admin connection uses an RDS IAM token.
        database = match optional("RDS_DB_PASSWORD") {
            Some(password) => database.with_password(password),
            None => database.with_rds_iam(optional("AWS_REGION")),
        };

        database
            .validate()
            .map_err(|e| ConfigError::InvalidValue("RDS_DB_*".into(), e.to_string()))?;

        let policy = GroupPolicy::from_json(&required("IDENTITYSTORE_GROUP_IDS")?).map_err(|e| {
            ConfigError::InvalidValue("IDENTITYSTORE_GROUP_IDS".into(), e.to_string())
        })?;

        let backend = optional("REGISTRY_BACKEND").unwrap_or_else(|| "dynamodb".to_string());
        let registry = match backend.to_ascii_lowercase().as_str() {
            "dynamodb" => RegistryBackend::DynamoDb {
                table_name: required("DDB_TABLE")?,
            },
            "postgres" | "postgresql" => RegistryBackend::Postgres {
                database_url: required("REGISTRY_DATABASE_URL")?,
            },
            other => {
                return Err(ConfigError::InvalidValue(
                    "REGISTRY_BACKEND".into(),
                    format!("unknown backend '{other}'"),
                ))
            }
        };

        let identity_store_id = optional("IDENTITYSTORE_ID")
            .map(IdentityStoreId::new)
            .transpose()
            .map_err(|e| ConfigError::InvalidValue("IDENTITYSTORE_ID".into(), e.to_string()))?;

        let max_retries = optional("DB_MAX_RETRIES")
            .map(|value| {
                value
                    .parse::<u32>()
                    .map_err(|e| ConfigError::InvalidValue("DB_MAX_RETRIES".into(), e.to_string()))
            })
            .transpose()?
            .unwrap_or(2);

        Ok(Self {
            database,
            policy,
            registry,
            identity_store_id,
            max_retries,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(String),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}
