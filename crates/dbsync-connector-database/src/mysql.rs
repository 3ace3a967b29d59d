//! MySQL account gateway.
//!
//! Accounts are created as `'name'@'%'`. With RDS IAM account
//! authentication they are identified by `AWSAuthenticationPlugin`.

use async_trait::async_trait;
use aws_config::SdkConfig;
use sqlx::mysql::{MySqlConnectOptions, MySqlDatabaseError, MySqlPoolOptions, MySqlSslMode};
use sqlx::{MySql, MySqlPool};
use tracing::{debug, info, instrument};

use dbsync_connector::config::ConnectorConfig;
use dbsync_connector::error::{ConnectorError, ConnectorResult};
use dbsync_connector::traits::{AccountGateway, Connector};
use dbsync_core::{AccountName, RoleName};

use crate::config::{AccountAuthentication, DatabaseConfig, DatabaseCredentials, SslMode};
use crate::credentials::resolve_password;
use crate::pool::{map_sqlx_error, LazyPool};
use crate::quote::{quote_mysql_account, quote_mysql_name, validate_mysql_name};

// Server error numbers
const ER_DBACCESS_DENIED: u16 = 1044;
const ER_ACCESS_DENIED: u16 = 1045;
const ER_TABLEACCESS_DENIED: u16 = 1142;
const ER_SPECIFIC_ACCESS_DENIED: u16 = 1227;
const ER_CON_COUNT: u16 = 1040;
const ER_UNKNOWN_AUTHID: u16 = 3523;

/// Account gateway for MySQL, MariaDB and Aurora MySQL.
pub struct MySqlAccountGateway {
    config: DatabaseConfig,
    display_name: String,
    sdk_config: Option<SdkConfig>,
    pool: LazyPool<MySql>,
}

impl std::fmt::Debug for MySqlAccountGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlAccountGateway")
            .field("config", &self.config.redacted())
            .field("display_name", &self.display_name)
            .finish()
    }
}

impl MySqlAccountGateway {
    /// Create a gateway. No connection is opened until the first operation.
    pub fn new(config: DatabaseConfig) -> ConnectorResult<Self> {
        config.validate()?;

        let display_name = config.display_name();

        Ok(Self {
            config,
            display_name,
            sdk_config: None,
            pool: LazyPool::new(),
        })
    }

    /// Use an already loaded AWS configuration for IAM token generation.
    #[must_use]
    pub fn with_aws_config(mut self, sdk_config: SdkConfig) -> Self {
        self.sdk_config = Some(sdk_config);
        self
    }

    async fn get_pool(&self) -> ConnectorResult<MySqlPool> {
        self.pool.get_or_connect(|| self.create_pool()).await
    }

    async fn create_pool(&self) -> ConnectorResult<MySqlPool> {
        let password = resolve_password(&self.config, self.sdk_config.as_ref()).await?;

        let mut options = MySqlConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.effective_port())
            .username(&self.config.username)
            .password(&password)
            .ssl_mode(mysql_ssl_mode(self.config.ssl_mode));
        if let Some(ref database) = self.config.database {
            options = options.database(database);
        }
        // IAM tokens are sent with the cleartext plugin over TLS.
        if matches!(self.config.credentials, DatabaseCredentials::RdsIam { .. }) {
            options = options.enable_cleartext_plugin(true);
        }

        debug!(host = %self.config.host, port = self.config.effective_port(), "Creating MySQL connection pool");

        let pool = MySqlPoolOptions::new()
            .max_connections(self.config.connection.pool_size)
            .acquire_timeout(self.config.connection.connection_timeout())
            .connect_with(options)
            .await
            .map_err(|e| self.connect_error(e))?;

        info!(host = %self.config.host, "MySQL connection pool established");

        Ok(pool)
    }

    fn connect_error(&self, error: sqlx::Error) -> ConnectorError {
        if error_number(&error) == Some(ER_ACCESS_DENIED) {
            return ConnectorError::AuthenticationFailed {
                message: error.to_string(),
            };
        }
        if matches!(error, sqlx::Error::PoolTimedOut) {
            return ConnectorError::ConnectionTimeout {
                timeout_secs: self.config.connection.connection_timeout_secs,
            };
        }
        ConnectorError::connection_failed_with_source(
            format!(
                "Failed to connect to database at {}:{}",
                self.config.host,
                self.config.effective_port()
            ),
            error,
        )
    }

    fn statement_error(&self, operation: &str, error: sqlx::Error) -> ConnectorError {
        match error_number(&error) {
            Some(
                ER_DBACCESS_DENIED | ER_ACCESS_DENIED | ER_TABLEACCESS_DENIED
                | ER_SPECIFIC_ACCESS_DENIED,
            ) => ConnectorError::AuthorizationFailed {
                operation: operation.to_string(),
            },
            Some(ER_UNKNOWN_AUTHID) => ConnectorError::ObjectNotFound {
                identifier: error.to_string(),
            },
            Some(ER_CON_COUNT) => ConnectorError::TargetUnavailable {
                message: error.to_string(),
            },
            _ => map_sqlx_error(
                operation,
                self.config.connection.connection_timeout_secs,
                error,
            ),
        }
    }

    async fn execute(&self, operation: &str, sql: &str) -> ConnectorResult<()> {
        let pool = self.get_pool().await?;
        sqlx::raw_sql(sql)
            .execute(&pool)
            .await
            .map_err(|e| self.statement_error(operation, e))?;
        Ok(())
    }
}

fn error_number(error: &sqlx::Error) -> Option<u16> {
    match error {
        sqlx::Error::Database(db) => db
            .try_downcast_ref::<MySqlDatabaseError>()
            .map(MySqlDatabaseError::number),
        _ => None,
    }
}

fn mysql_ssl_mode(mode: SslMode) -> MySqlSslMode {
    match mode {
        SslMode::Disable => MySqlSslMode::Disabled,
        SslMode::Prefer => MySqlSslMode::Preferred,
        SslMode::Require => MySqlSslMode::Required,
        SslMode::VerifyCa => MySqlSslMode::VerifyCa,
        SslMode::VerifyFull => MySqlSslMode::VerifyIdentity,
    }
}

fn create_statement(account: &AccountName, auth: AccountAuthentication) -> ConnectorResult<String> {
    let account = quote_mysql_account(account.as_str())?;
    Ok(match auth {
        AccountAuthentication::RdsIam => format!(
            "CREATE USER IF NOT EXISTS {account} IDENTIFIED WITH AWSAuthenticationPlugin AS 'RDS'"
        ),
        AccountAuthentication::DatabaseDefault => format!("CREATE USER IF NOT EXISTS {account}"),
    })
}

fn grant_statement(account: &AccountName, role: &RoleName) -> ConnectorResult<String> {
    Ok(format!(
        "GRANT {} TO {}",
        quote_mysql_name(role.as_str())?,
        quote_mysql_account(account.as_str())?
    ))
}

fn drop_statement(account: &AccountName) -> ConnectorResult<String> {
    Ok(format!(
        "DROP USER IF EXISTS {}",
        quote_mysql_account(account.as_str())?
    ))
}

#[async_trait]
impl Connector for MySqlAccountGateway {
    fn display_name(&self) -> &str {
        &self.display_name
    }

    #[instrument(skip(self), fields(gateway = %self.display_name))]
    async fn test_connection(&self) -> ConnectorResult<()> {
        let pool = self.get_pool().await?;

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(|e| ConnectorError::connection_failed_with_source("Test query failed", e))?;

        info!(host = %self.config.host, "MySQL connection test successful");
        Ok(())
    }

    async fn dispose(&self) -> ConnectorResult<()> {
        self.pool.dispose().await;
        info!(gateway = %self.display_name, "MySQL gateway disposed");
        Ok(())
    }
}

#[async_trait]
impl AccountGateway for MySqlAccountGateway {
    #[instrument(skip(self, account), fields(account = %account))]
    async fn exists(&self, account: &AccountName) -> ConnectorResult<bool> {
        validate_mysql_name(account.as_str())?;
        let pool = self.get_pool().await?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM mysql.user WHERE user = ?")
            .bind(account.as_str())
            .fetch_one(&pool)
            .await
            .map_err(|e| self.statement_error("check account", e))?;

        debug!(count, "Checked account existence");
        Ok(count > 0)
    }

    #[instrument(skip(self, account), fields(account = %account))]
    async fn create(&self, account: &AccountName) -> ConnectorResult<()> {
        let sql = create_statement(account, self.config.account_auth)?;
        self.execute("create account", &sql).await?;
        info!("Created account");
        Ok(())
    }

    #[instrument(skip(self, account, role), fields(account = %account, role = %role))]
    async fn grant(&self, account: &AccountName, role: &RoleName) -> ConnectorResult<()> {
        let sql = grant_statement(account, role)?;
        self.execute("grant role", &sql).await?;
        info!("Granted role");
        Ok(())
    }

    #[instrument(skip(self, account), fields(account = %account))]
    async fn drop_account(&self, account: &AccountName) -> ConnectorResult<()> {
        let sql = drop_statement(account)?;
        self.execute("drop account", &sql).await?;
        info!("Dropped account");
        Ok(())
    }
}
