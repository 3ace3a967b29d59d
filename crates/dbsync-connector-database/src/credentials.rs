//! Credentials for the gateway's administrative session.
//!
//! A static password is used as-is. For RDS IAM, a signed token is
//! generated with the ambient AWS credentials each time a pool is built;
//! tokens are valid for fifteen minutes and are only needed to open
//! connections.

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_rds::auth_token::{AuthTokenGenerator, Config as AuthTokenConfig};
use tracing::debug;

use dbsync_connector::error::{ConnectorError, ConnectorResult};

use crate::config::{DatabaseConfig, DatabaseCredentials};

/// Resolve the password used to open connections.
pub async fn resolve_password(
    config: &DatabaseConfig,
    sdk_config: Option<&SdkConfig>,
) -> ConnectorResult<String> {
    match config.credentials {
        DatabaseCredentials::Password { ref password } => Ok(password.clone()),
        DatabaseCredentials::RdsIam { ref region } => {
            let loaded;
            let sdk_config = match sdk_config {
                Some(sdk_config) => sdk_config,
                None => {
                    loaded = load_sdk_config(region.clone()).await;
                    &loaded
                }
            };
            generate_auth_token(config, region.as_deref(), sdk_config).await
        }
    }
}

async fn load_sdk_config(region: Option<String>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region));
    }
    loader.load().await
}

/// Generate an RDS IAM authentication token for the configured user.
pub async fn generate_auth_token(
    config: &DatabaseConfig,
    region: Option<&str>,
    sdk_config: &SdkConfig,
) -> ConnectorResult<String> {
    let mut builder = AuthTokenConfig::builder()
        .hostname(config.host.clone())
        .port(u64::from(config.effective_port()))
        .username(config.username.clone());
    if let Some(region) = region {
        builder = builder.region(Region::new(region.to_string()));
    }

    let token_config = builder
        .build()
        .map_err(|e| ConnectorError::AuthenticationFailed {
            message: format!("invalid RDS auth token parameters: {e}"),
        })?;

    let token = AuthTokenGenerator::new(token_config)
        .auth_token(sdk_config)
        .await
        .map_err(|e| ConnectorError::AuthenticationFailed {
            message: format!("failed to generate RDS auth token: {e}"),
        })?;

    debug!(host = %config.host, username = %config.username, "Generated RDS IAM auth token");

    Ok(token.as_str().to_string())
}
