//! Strongly Typed Identifiers
//!
//! Directory identifiers and database names are all plain strings on the
//! wire. Wrapping them in newtypes keeps a principal id from being passed
//! where an account name is expected, and gives every value a single
//! validation point before it reaches a gateway.
//!
//! # Example
//!
//! ```
//! use dbsync_core::{AccountName, PrincipalId};
//!
//! let id = PrincipalId::new("906753a1-b0c1-70d6-1a2b-3c4d5e6f7a8b").unwrap();
//! let name: AccountName = "alice".parse().unwrap();
//!
//! fn requires_account(name: &AccountName) -> &str {
//!     name.as_str()
//! }
//!
//! assert_eq!(requires_account(&name), "alice");
//! // requires_account(&id); // This would not compile!
//! # let _ = id;
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Upper bound on any identifier length, independent of engine limits.
pub const MAX_IDENTIFIER_LEN: usize = 128;

/// Error type for identifier validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {id_type}: {message}")]
pub struct ParseIdError {
    /// The type of identifier that failed validation
    pub id_type: &'static str,
    /// Why the value was rejected
    pub message: String,
}

fn validate(id_type: &'static str, value: &str) -> Result<(), ParseIdError> {
    if value.trim().is_empty() {
        return Err(ParseIdError {
            id_type,
            message: "value is empty".to_string(),
        });
    }

    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(ParseIdError {
            id_type,
            message: format!("value exceeds {MAX_IDENTIFIER_LEN} bytes"),
        });
    }

    if value.chars().any(char::is_control) {
        return Err(ParseIdError {
            id_type,
            message: "value contains control characters".to_string(),
        });
    }

    Ok(())
}

/// Macro to define a validated string identifier type
macro_rules! define_name {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a validated identifier.
            ///
            /// Rejects empty values, control characters and values longer
            /// than [`MAX_IDENTIFIER_LEN`].
            pub fn new(value: impl Into<String>) -> Result<Self, ParseIdError> {
                let value = value.into();
                validate(stringify!($name), &value)?;
                Ok(Self(value))
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the identifier and returns the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ParseIdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_name!(
    /// Stable identifier of a principal (user) in the directory service.
    ///
    /// This is the key of the ownership registry; it never changes when the
    /// user is renamed.
    PrincipalId
);

define_name!(
    /// Identifier of a directory group.
    GroupId
);

define_name!(
    /// Identifier of the directory instance (identity store) an event came from.
    IdentityStoreId
);

define_name!(
    /// Login name of a database account.
    ///
    /// Engine specific limits (length, quoting) are enforced by the gateway
    /// that executes statements with it.
    AccountName
);

define_name!(
    /// Name of a database role granted to managed accounts.
    RoleName
);
