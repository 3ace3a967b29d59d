//! Database gateway configuration
//!
//! Connection parameters for the target database and the authentication
//! method given to accounts the gateway creates.

use serde::{Deserialize, Serialize};

use dbsync_connector::config::{ConnectionSettings, ConnectorConfig};
use dbsync_connector::error::{ConnectorError, ConnectorResult};

/// Database engine family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// MySQL, MariaDB and Aurora MySQL.
    #[default]
    MySql,
    /// PostgreSQL and Aurora PostgreSQL.
    PostgreSql,
}

impl DatabaseDriver {
    /// Get the default port for this driver.
    #[must_use]
    pub fn default_port(&self) -> u16 {
        match self {
            DatabaseDriver::MySql => 3306,
            DatabaseDriver::PostgreSql => 5432,
        }
    }

    /// Get the driver identifier string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseDriver::MySql => "mysql",
            DatabaseDriver::PostgreSql => "postgresql",
        }
    }

    /// Map an engine name to a driver.
    ///
    /// Matching is by case-insensitive substring so RDS engine names such as
    /// `aurora-mysql` or `aurora-postgresql` are accepted.
    #[must_use]
    pub fn from_engine_name(engine: &str) -> Option<Self> {
        let engine = engine.to_ascii_lowercase();
        if engine.contains("postgres") {
            Some(DatabaseDriver::PostgreSql)
        } else if engine.contains("mysql") || engine.contains("mariadb") {
            Some(DatabaseDriver::MySql)
        } else {
            None
        }
    }
}

/// SSL mode for database connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SslMode {
    /// No SSL.
    Disable,
    /// Use SSL if available, but don't require it.
    Prefer,
    /// Require SSL.
    #[default]
    Require,
    /// Require SSL and verify CA certificate.
    VerifyCa,
    /// Require SSL and verify CA and hostname.
    VerifyFull,
}

impl SslMode {
    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SslMode::Disable => "disable",
            SslMode::Prefer => "prefer",
            SslMode::Require => "require",
            SslMode::VerifyCa => "verify-ca",
            SslMode::VerifyFull => "verify-full",
        }
    }

    /// Parse a mode string as accepted by libpq.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "disable" | "disabled" => Some(SslMode::Disable),
            "prefer" | "preferred" => Some(SslMode::Prefer),
            "require" | "required" => Some(SslMode::Require),
            "verify-ca" | "verify_ca" => Some(SslMode::VerifyCa),
            "verify-full" | "verify_full" | "verify-identity" => Some(SslMode::VerifyFull),
            _ => None,
        }
    }
}

/// How the gateway's own administrative session authenticates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DatabaseCredentials {
    /// Static password.
    Password { password: String },
    /// Short-lived RDS IAM authentication token generated per pool.
    RdsIam {
        /// Region used to sign the token. Falls back to the ambient AWS region.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        region: Option<String>,
    },
}

impl Default for DatabaseCredentials {
    fn default() -> Self {
        DatabaseCredentials::RdsIam { region: None }
    }
}

/// Authentication method attached to accounts the gateway creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccountAuthentication {
    /// Accounts log in with RDS IAM tokens.
    #[default]
    RdsIam,
    /// Accounts are created with the engine's default authentication and no password.
    DatabaseDefault,
}

/// Configuration for a database account gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database engine.
    #[serde(default)]
    pub driver: DatabaseDriver,

    /// Database server hostname or IP address.
    pub host: String,

    /// Database server port.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Database to connect to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    /// Administrative user the gateway connects as.
    pub username: String,

    /// Credentials for the administrative user.
    #[serde(default)]
    pub credentials: DatabaseCredentials,

    /// Authentication method for created accounts.
    #[serde(default)]
    pub account_auth: AccountAuthentication,

    /// SSL mode.
    #[serde(default)]
    pub ssl_mode: SslMode,

    /// Connection settings (timeouts, pool size).
    #[serde(default)]
    pub connection: ConnectionSettings,
}

impl DatabaseConfig {
    /// Create a new database config with required fields.
    pub fn new(driver: DatabaseDriver, host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            driver,
            host: host.into(),
            port: None,
            database: None,
            username: username.into(),
            credentials: DatabaseCredentials::default(),
            account_auth: AccountAuthentication::default(),
            ssl_mode: SslMode::default(),
            connection: ConnectionSettings::default(),
        }
    }

    /// Authenticate with a static password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.credentials = DatabaseCredentials::Password {
            password: password.into(),
        };
        self
    }

    /// Authenticate with an RDS IAM token.
    #[must_use]
    pub fn with_rds_iam(mut self, region: Option<String>) -> Self {
        self.credentials = DatabaseCredentials::RdsIam { region };
        self
    }

    /// Set port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set database name.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set SSL mode.
    #[must_use]
    pub fn with_ssl_mode(mut self, mode: SslMode) -> Self {
        self.ssl_mode = mode;
        self
    }

    /// Set the authentication method for created accounts.
    #[must_use]
    pub fn with_account_auth(mut self, auth: AccountAuthentication) -> Self {
        self.account_auth = auth;
        self
    }

    /// Set connection settings.
    #[must_use]
    pub fn with_connection(mut self, connection: ConnectionSettings) -> Self {
        self.connection = connection;
        self
    }

    /// Get the effective port (default if not specified).
    #[must_use]
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.driver.default_port())
    }

    /// Display name used in logs: `driver:user@host:port[/database]`.
    #[must_use]
    pub fn display_name(&self) -> String {
        let mut name = format!(
            "{}:{}@{}:{}",
            self.driver.as_str(),
            self.username,
            self.host,
            self.effective_port()
        );
        if let Some(ref database) = self.database {
            name.push('/');
            name.push_str(database);
        }
        name
    }
}

impl ConnectorConfig for DatabaseConfig {
    fn validate(&self) -> ConnectorResult<()> {
        if self.host.trim().is_empty() {
            return Err(ConnectorError::InvalidConfiguration {
                message: "host is required".to_string(),
            });
        }

        if self.username.trim().is_empty() {
            return Err(ConnectorError::InvalidConfiguration {
                message: "username is required".to_string(),
            });
        }

        if self.port == Some(0) {
            return Err(ConnectorError::InvalidConfiguration {
                message: "port must be greater than zero".to_string(),
            });
        }

        if let DatabaseCredentials::Password { ref password } = self.credentials {
            if password.is_empty() {
                return Err(ConnectorError::InvalidConfiguration {
                    message: "password must not be empty".to_string(),
                });
            }
        }

        if self.connection.pool_size == 0 {
            return Err(ConnectorError::InvalidConfiguration {
                message: "pool_size must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    fn redacted(&self) -> Self {
        let mut config = self.clone();
        if let DatabaseCredentials::Password { ref mut password } = config.credentials {
            *password = "***REDACTED***".to_string();
        }
        config
    }
}
