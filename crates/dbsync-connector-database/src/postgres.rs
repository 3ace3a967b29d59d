//! PostgreSQL account gateway.
//!
//! Login accounts are roles with `LOGIN`. With RDS IAM account
//! authentication every created role is also granted `rds_iam`.

use async_trait::async_trait;
use aws_config::SdkConfig;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::{Executor, PgPool, Postgres};
use tracing::{debug, info, instrument};

use dbsync_connector::config::ConnectorConfig;
use dbsync_connector::error::{ConnectorError, ConnectorResult};
use dbsync_connector::traits::{AccountGateway, Connector};
use dbsync_core::{AccountName, RoleName};

use crate::config::{AccountAuthentication, DatabaseConfig, SslMode};
use crate::credentials::resolve_password;
use crate::pool::{map_sqlx_error, LazyPool};
use crate::quote::{quote_postgres_identifier, validate_postgres_identifier};

const ROLE_EXISTS: &str = "SELECT EXISTS (SELECT 1 FROM pg_catalog.pg_roles WHERE rolname = $1)";

/// SQLSTATE `duplicate_object`, raised by `CREATE USER` for an existing role.
const DUPLICATE_OBJECT: &str = "42710";
/// SQLSTATE `undefined_object`, raised by `GRANT` for an unknown role.
const UNDEFINED_OBJECT: &str = "42704";
/// SQLSTATE `insufficient_privilege`.
const INSUFFICIENT_PRIVILEGE: &str = "42501";

/// Account gateway for PostgreSQL and Aurora PostgreSQL.
pub struct PostgresAccountGateway {
    config: DatabaseConfig,
    display_name: String,
    sdk_config: Option<SdkConfig>,
    pool: LazyPool<Postgres>,
}

impl std::fmt::Debug for PostgresAccountGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresAccountGateway")
            .field("config", &self.config.redacted())
            .field("display_name", &self.display_name)
            .finish()
    }
}

impl PostgresAccountGateway {
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

    async fn get_pool(&self) -> ConnectorResult<PgPool> {
        self.pool.get_or_connect(|| self.create_pool()).await
    }

    async fn create_pool(&self) -> ConnectorResult<PgPool> {
        let password = resolve_password(&self.config, self.sdk_config.as_ref()).await?;

        let mut options = PgConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.effective_port())
            .username(&self.config.username)
            .password(&password)
            .ssl_mode(pg_ssl_mode(self.config.ssl_mode));
        if let Some(ref database) = self.config.database {
            options = options.database(database);
        }

        debug!(host = %self.config.host, port = self.config.effective_port(), "Creating PostgreSQL connection pool");

        let pool = PgPoolOptions::new()
            .max_connections(self.config.connection.pool_size)
            .acquire_timeout(self.config.connection.connection_timeout())
            .connect_with(options)
            .await
            .map_err(|e| self.connect_error(e))?;

        info!(host = %self.config.host, "PostgreSQL connection pool established");

        Ok(pool)
    }

    fn connect_error(&self, error: sqlx::Error) -> ConnectorError {
        if let sqlx::Error::Database(ref db) = error {
            if matches!(db.code().as_deref(), Some("28P01" | "28000")) {
                return ConnectorError::AuthenticationFailed {
                    message: db.message().to_string(),
                };
            }
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
        if let sqlx::Error::Database(ref db) = error {
            match db.code().as_deref() {
                Some(INSUFFICIENT_PRIVILEGE) => {
                    return ConnectorError::AuthorizationFailed {
                        operation: operation.to_string(),
                    }
                }
                Some(UNDEFINED_OBJECT) => {
                    return ConnectorError::ObjectNotFound {
                        identifier: db.message().to_string(),
                    }
                }
                // connection_exception class, cannot_connect_now, too_many_connections
                Some(code) if code.starts_with("08") || code == "57P03" || code == "53300" => {
                    return ConnectorError::TargetUnavailable {
                        message: db.message().to_string(),
                    }
                }
                _ => {}
            }
        }
        map_sqlx_error(
            operation,
            self.config.connection.connection_timeout_secs,
            error,
        )
    }

    /// A concurrent transaction created the role between our check and
    /// `CREATE USER`. Retrying sees the committed role.
    fn create_error(&self, error: sqlx::Error) -> ConnectorError {
        if let sqlx::Error::Database(ref db) = error {
            if db.code().as_deref() == Some(DUPLICATE_OBJECT) {
                return ConnectorError::TargetUnavailable {
                    message: format!("account created concurrently: {}", db.message()),
                };
            }
        }
        self.statement_error("create account", error)
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

fn pg_ssl_mode(mode: SslMode) -> PgSslMode {
    match mode {
        SslMode::Disable => PgSslMode::Disable,
        SslMode::Prefer => PgSslMode::Prefer,
        SslMode::Require => PgSslMode::Require,
        SslMode::VerifyCa => PgSslMode::VerifyCa,
        SslMode::VerifyFull => PgSslMode::VerifyFull,
    }
}

/// Statements creating a login role, run in one transaction.
fn create_statements(
    account: &AccountName,
    auth: AccountAuthentication,
) -> ConnectorResult<(String, Option<String>)> {
    let name = quote_postgres_identifier(account.as_str())?;
    let create = format!("CREATE USER {name}");
    let iam_grant = match auth {
        AccountAuthentication::RdsIam => Some(format!("GRANT rds_iam TO {name}")),
        AccountAuthentication::DatabaseDefault => None,
    };
    Ok((create, iam_grant))
}

fn grant_statement(account: &AccountName, role: &RoleName) -> ConnectorResult<String> {
    Ok(format!(
        "GRANT {} TO {}",
        quote_postgres_identifier(role.as_str())?,
        quote_postgres_identifier(account.as_str())?
    ))
}

fn drop_statement(account: &AccountName) -> ConnectorResult<String> {
    Ok(format!(
        "DROP USER IF EXISTS {}",
        quote_postgres_identifier(account.as_str())?
    ))
}

#[async_trait]
impl Connector for PostgresAccountGateway {
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

        info!(host = %self.config.host, "PostgreSQL connection test successful");
        Ok(())
    }

    async fn dispose(&self) -> ConnectorResult<()> {
        self.pool.dispose().await;
        info!(gateway = %self.display_name, "PostgreSQL gateway disposed");
        Ok(())
    }
}

#[async_trait]
impl AccountGateway for PostgresAccountGateway {
    #[instrument(skip(self, account), fields(account = %account))]
    async fn exists(&self, account: &AccountName) -> ConnectorResult<bool> {
        validate_postgres_identifier(account.as_str())?;
        let pool = self.get_pool().await?;

        let exists: bool = sqlx::query_scalar(ROLE_EXISTS)
            .bind(account.as_str())
            .fetch_one(&pool)
            .await
            .map_err(|e| self.statement_error("check account", e))?;

        debug!(exists, "Checked account existence");
        Ok(exists)
    }

    #[instrument(skip(self, account), fields(account = %account))]
    async fn create(&self, account: &AccountName) -> ConnectorResult<()> {
        let (create, iam_grant) = create_statements(account, self.config.account_auth)?;
        let pool = self.get_pool().await?;

        // Role creation and the rds_iam grant commit together. Dropping the
        // transaction on an early return rolls both back.
        let mut tx = pool
            .begin()
            .await
            .map_err(|e| self.statement_error("begin create account", e))?;

        let existing: bool = sqlx::query_scalar(ROLE_EXISTS)
            .bind(account.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| self.statement_error("check account", e))?;

        if existing {
            debug!("Account already exists");
        } else {
            (&mut *tx).execute(sqlx::raw_sql(&create))
                .await
                .map_err(|e| self.create_error(e))?;
        }

        if let Some(iam_grant) = iam_grant {
            (&mut *tx).execute(sqlx::raw_sql(&iam_grant))
                .await
                .map_err(|e| self.statement_error("enable IAM authentication", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| self.statement_error("commit create account", e))?;

        if !existing {
            info!("Created account");
        }
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
