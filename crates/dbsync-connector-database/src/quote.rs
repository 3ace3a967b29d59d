//! Identifier validation and quoting.
//!
//! Account and role names end up in DDL, which cannot take bound
//! parameters. Every name is validated against the engine's limits and
//! then quoted so it is always read as a single identifier.

use dbsync_connector::error::{ConnectorError, ConnectorResult};

/// PostgreSQL truncates identifiers longer than `NAMEDATALEN - 1` bytes.
pub const POSTGRES_MAX_IDENTIFIER_BYTES: usize = 63;

/// MySQL user and role names are limited to 32 characters.
pub const MYSQL_MAX_NAME_CHARS: usize = 32;

fn check_common(name: &str) -> ConnectorResult<()> {
    if name.is_empty() {
        return Err(ConnectorError::invalid_identifier(name, "must not be empty"));
    }
    if name.chars().any(char::is_control) {
        return Err(ConnectorError::invalid_identifier(
            name,
            "must not contain control characters",
        ));
    }
    Ok(())
}

/// Validate a PostgreSQL role name.
pub fn validate_postgres_identifier(name: &str) -> ConnectorResult<()> {
    check_common(name)?;
    if name.len() > POSTGRES_MAX_IDENTIFIER_BYTES {
        return Err(ConnectorError::invalid_identifier(
            name,
            format!("longer than {POSTGRES_MAX_IDENTIFIER_BYTES} bytes"),
        ));
    }
    Ok(())
}

/// Quote a PostgreSQL identifier: wrap in `"` and double embedded quotes.
pub fn quote_postgres_identifier(name: &str) -> ConnectorResult<String> {
    validate_postgres_identifier(name)?;
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

/// Validate a MySQL user or role name.
///
/// Backslashes are rejected because their meaning inside a string literal
/// depends on the server's `NO_BACKSLASH_ESCAPES` mode.
pub fn validate_mysql_name(name: &str) -> ConnectorResult<()> {
    check_common(name)?;
    if name.chars().count() > MYSQL_MAX_NAME_CHARS {
        return Err(ConnectorError::invalid_identifier(
            name,
            format!("longer than {MYSQL_MAX_NAME_CHARS} characters"),
        ));
    }
    if name.contains('\\') {
        return Err(ConnectorError::invalid_identifier(
            name,
            "must not contain backslashes",
        ));
    }
    Ok(())
}

/// Quote a MySQL user or role name as a string literal: wrap in `'` and double embedded quotes.
pub fn quote_mysql_name(name: &str) -> ConnectorResult<String> {
    validate_mysql_name(name)?;
    Ok(format!("'{}'", name.replace('\'', "''")))
}

/// Quote a MySQL account as `'name'@'%'`.
pub fn quote_mysql_account(name: &str) -> ConnectorResult<String> {
    Ok(format!("{}@'%'", quote_mysql_name(name)?))
}
