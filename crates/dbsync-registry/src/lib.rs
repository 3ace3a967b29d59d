//! # Registry Store
//!
//! Durable key-value record of every database account this system created,
//! keyed by directory principal id.
//!
//! A record exists if and only if the system created, and still owns, the
//! corresponding account. The store holds no business logic; the engines
//! decide when records are written and removed.
//!
//! Backends:
//!
//! - [`DynamoRegistryStore`] - DynamoDB table keyed by `userID`
//! - [`PgRegistryStore`] - PostgreSQL table `managed_accounts`

pub mod dynamo;
pub mod error;
pub mod postgres;
pub mod store;

pub use dynamo::DynamoRegistryStore;
pub use error::{RegistryError, RegistryResult};
pub use postgres::PgRegistryStore;
pub use store::RegistryStore;
