//! Error types for the dbsync-directory crate.

use dbsync_core::ParseIdError;
use thiserror::Error;

/// Errors raised while decoding a membership event.
#[derive(Debug, Error)]
pub enum EventError {
    /// Payload is not valid JSON or does not have the expected shape.
    #[error("Malformed event: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Event name is not one this system handles.
    #[error("Unsupported event: {event_name}")]
    UnsupportedEvent { event_name: String },

    /// A field required for this event name is absent.
    #[error("Event {event_name} is missing {field}")]
    MissingField {
        event_name: String,
        field: &'static str,
    },

    /// An identifier in the event failed validation.
    #[error("Invalid identifier in event: {0}")]
    InvalidIdentifier(#[from] ParseIdError),
}

/// Errors raised while loading a group policy.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Policy is not a JSON object of strings.
    #[error("Invalid group policy: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Policy maps no groups.
    #[error("Group policy is empty")]
    Empty,

    /// A group is listed more than once.
    #[error("Group {group_id} is mapped more than once")]
    DuplicateGroup { group_id: String },
}

/// Errors raised by directory lookups.
///
/// "Principal not found" is not an error: lookups return `Ok(None)`.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Directory request failed.
    #[error("Directory lookup failed: {message}")]
    LookupFailed { message: String },

    /// Directory returned a record that cannot be used.
    #[error("Directory returned invalid data for {principal_id}: {message}")]
    InvalidResponse {
        principal_id: String,
        message: String,
    },

    /// No identity store id in the event and none configured.
    #[error("No identity store id available to resolve {principal_id}")]
    MissingIdentityStore { principal_id: String },
}

/// Result type for directory lookups.
pub type DirectoryResult<T> = Result<T, DirectoryError>;
