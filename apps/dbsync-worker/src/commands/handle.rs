//! Handle command - Process one membership event

use std::path::{Path, PathBuf};

use clap::Args;
use tokio::io::AsyncReadExt;
use tracing::{error, info};

use dbsync_provisioning::{HandlerStatus, SyncError};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::runtime::Runtime;

/// Arguments for the handle command
#[derive(Args, Debug)]
pub struct HandleArgs {
    /// Event file, or `-` to read from stdin
    #[arg(long, default_value = "-")]
    pub event: PathBuf,
}

/// Handle the event and return the status to report.
pub async fn execute(args: HandleArgs) -> WorkerResult<HandlerStatus> {
    let payload = read_event(&args.event).await?;

    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            let err = SyncError::configuration(e.to_string());
            error!(error = %err, "Invalid configuration");
            return Ok(HandlerStatus::failure(&err));
        }
    };

    let runtime = match Runtime::build(&config).await {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to build runtime");
            return Ok(HandlerStatus::failure(&e));
        }
    };

    let status = match runtime.dispatcher.handle_json(&payload).await {
        Ok(status) => {
            info!("Event handled");
            status
        }
        Err(e) => {
            error!(error = %e, code = e.error_code(), retryable = e.is_retryable(), "Event failed");
            HandlerStatus::failure(&e)
        }
    };

    runtime.shutdown().await;
    Ok(status)
}

/// Read the raw event payload from a file or stdin.
pub async fn read_event(path: &Path) -> WorkerResult<String> {
    if path.as_os_str() == "-" {
        let mut payload = String::new();
        tokio::io::stdin()
            .read_to_string(&mut payload)
            .await
            .map_err(|source| WorkerError::ReadEvent {
                origin: "stdin".to_string(),
                source,
            })?;
        return Ok(payload);
    }

    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| WorkerError::ReadEvent {
            origin: path.display().to_string(),
            source,
        })
}
