//! PostgreSQL gateway tests.
//!
//! These need a reachable database whose admin user may create roles. Run with:
//!
//! ```text
//! PGHOST=localhost PGUSER=postgres PGPASSWORD=postgres \
//!     cargo test -p dbsync-connector-database -- --ignored
//! ```

use dbsync_connector::traits::{AccountGateway, Connector};
use dbsync_connector::error::ConnectorError;
use dbsync_connector_database::{
    AccountAuthentication, DatabaseConfig, DatabaseDriver, PostgresAccountGateway, SslMode,
};
use dbsync_core::AccountName;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn create_test_gateway(auth: AccountAuthentication) -> PostgresAccountGateway {
    let port = env_or("PGPORT", "5432").parse().expect("PGPORT must be a port");
    let config = DatabaseConfig::new(
        DatabaseDriver::PostgreSql,
        env_or("PGHOST", "localhost"),
        env_or("PGUSER", "postgres"),
    )
    .with_password(env_or("PGPASSWORD", "postgres"))
    .with_port(port)
    .with_database(env_or("PGDATABASE", "postgres"))
    .with_ssl_mode(SslMode::Disable)
    .with_account_auth(auth);

    PostgresAccountGateway::new(config).expect("Failed to build gateway")
}

fn unique_account(tag: &str) -> AccountName {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    AccountName::new(format!("{tag}_{nanos}")).unwrap()
}

#[tokio::test]
#[ignore]
async fn test_failed_iam_grant_leaves_no_account() {
    let gateway = create_test_gateway(AccountAuthentication::RdsIam);

    // Only meaningful where rds_iam is absent, i.e. outside RDS.
    if gateway.exists(&AccountName::new("rds_iam").unwrap()).await.unwrap() {
        return;
    }

    let account = unique_account("iam_grant_fails");
    assert!(!gateway.exists(&account).await.unwrap());

    let err = gateway.create(&account).await.unwrap_err();
    assert!(matches!(err, ConnectorError::ObjectNotFound { .. }));
    assert!(!gateway.exists(&account).await.unwrap());

    gateway.dispose().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_create_is_idempotent_and_drop_removes() {
    let gateway = create_test_gateway(AccountAuthentication::DatabaseDefault);
    let account = unique_account("create_twice");

    gateway.create(&account).await.unwrap();
    gateway.create(&account).await.unwrap();
    assert!(gateway.exists(&account).await.unwrap());

    gateway.drop_account(&account).await.unwrap();
    assert!(!gateway.exists(&account).await.unwrap());

    gateway.dispose().await.unwrap();
}
