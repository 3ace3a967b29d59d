//! DynamoDB registry backend.
//!
//! Item layout: partition key `userID` (string), attribute `username`
//! (string).

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use tracing::{debug, instrument};

use dbsync_core::{AccountName, PrincipalId, RegistryRecord};

use crate::error::{RegistryError, RegistryResult};
use crate::store::RegistryStore;

/// Partition key attribute.
pub const KEY_ATTRIBUTE: &str = "userID";
/// Login name attribute.
pub const USERNAME_ATTRIBUTE: &str = "username";

/// Registry backed by a DynamoDB table.
#[derive(Debug, Clone)]
pub struct DynamoRegistryStore {
    client: Client,
    table_name: String,
}

impl DynamoRegistryStore {
    /// Create a store over an existing table.
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    /// Get the table name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

fn key_of(principal_id: &PrincipalId) -> AttributeValue {
    AttributeValue::S(principal_id.as_str().to_string())
}

/// Decode an item read for `principal_id`.
fn record_from_item(
    principal_id: &PrincipalId,
    item: &HashMap<String, AttributeValue>,
) -> RegistryResult<RegistryRecord> {
    let username = item
        .get(USERNAME_ATTRIBUTE)
        .ok_or_else(|| RegistryError::corrupt(principal_id.as_str(), "username attribute missing"))?
        .as_s()
        .map_err(|_| RegistryError::corrupt(principal_id.as_str(), "username is not a string"))?;

    let username = AccountName::new(username.as_str())
        .map_err(|e| RegistryError::corrupt(principal_id.as_str(), e.to_string()))?;

    Ok(RegistryRecord::new(principal_id.clone(), username))
}

fn item_from_record(record: &RegistryRecord) -> HashMap<String, AttributeValue> {
    HashMap::from([
        (KEY_ATTRIBUTE.to_string(), key_of(&record.principal_id)),
        (
            USERNAME_ATTRIBUTE.to_string(),
            AttributeValue::S(record.username.as_str().to_string()),
        ),
    ])
}

#[async_trait]
impl RegistryStore for DynamoRegistryStore {
    fn backend_name(&self) -> &'static str {
        "dynamodb"
    }

    #[instrument(skip(self, principal_id), fields(principal_id = %principal_id, table = %self.table_name))]
    async fn get(&self, principal_id: &PrincipalId) -> RegistryResult<Option<RegistryRecord>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(KEY_ATTRIBUTE, key_of(principal_id))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| RegistryError::backend("get", DisplayErrorContext(&e).to_string()))?;

        let record = output
            .item()
            .map(|item| record_from_item(principal_id, item))
            .transpose()?;

        debug!(found = record.is_some(), "Registry lookup");
        Ok(record)
    }

    #[instrument(skip(self, record), fields(principal_id = %record.principal_id, table = %self.table_name))]
    async fn put(&self, record: &RegistryRecord) -> RegistryResult<()> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item_from_record(record)))
            .send()
            .await
            .map_err(|e| RegistryError::backend("put", DisplayErrorContext(&e).to_string()))?;

        debug!(username = %record.username, "Registry record written");
        Ok(())
    }

    #[instrument(skip(self, principal_id), fields(principal_id = %principal_id, table = %self.table_name))]
    async fn delete(&self, principal_id: &PrincipalId) -> RegistryResult<()> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key(KEY_ATTRIBUTE, key_of(principal_id))
            .send()
            .await
            .map_err(|e| RegistryError::backend("delete", DisplayErrorContext(&e).to_string()))?;

        debug!("Registry record deleted");
        Ok(())
    }

    async fn check(&self) -> RegistryResult<()> {
        self.client
            .describe_table()
            .table_name(&self.table_name)
            .send()
            .await
            .map_err(|e| RegistryError::backend("check", DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }
}
