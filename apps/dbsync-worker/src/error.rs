//! Worker error types and exit codes

use thiserror::Error;

use dbsync_provisioning::HandlerStatus;

/// Exit codes for the worker
/// - 0: Success
/// - 1: Retryable failure
/// - 2: Non-retryable failure
pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Failed to read event from {origin}: {source}")]
    ReadEvent {
        origin: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode status: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Connectivity check failed: {0}")]
    CheckFailed(String),
}

impl WorkerError {
    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            WorkerError::ReadEvent { .. } | WorkerError::Encode(_) => 2,
            WorkerError::CheckFailed(_) => 1,
        }
    }

    /// Print the error to stderr
    pub fn print(&self) {
        eprintln!("Error: {self}");
    }
}

/// Exit code reported for a handled event.
pub fn status_exit_code(status: &HandlerStatus) -> i32 {
    if status.is_success() {
        0
    } else if status.retryable.unwrap_or(true) {
        1
    } else {
        2
    }
}
