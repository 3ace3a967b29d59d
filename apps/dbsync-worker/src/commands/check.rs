//! Check command - Verify connectivity to the database and the registry

use clap::Args;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::runtime::Runtime;

/// Arguments for the check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Result of one connectivity probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub name: &'static str,
    pub target: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckResult {
    fn pass(name: &'static str, target: impl Into<String>) -> Self {
        Self {
            name,
            target: target.into(),
            passed: true,
            message: None,
        }
    }

    fn fail(name: &'static str, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name,
            target: target.into(),
            passed: false,
            message: Some(message.into()),
        }
    }
}

/// Execute the check command
pub async fn execute(args: CheckArgs) -> WorkerResult<()> {
    let mut results = Vec::new();

    let config = match WorkerConfig::from_env() {
        Ok(config) => {
            results.push(CheckResult::pass("configuration", "environment"));
            Some(config)
        }
        Err(e) => {
            results.push(CheckResult::fail("configuration", "environment", e.to_string()));
            None
        }
    };

    if let Some(config) = config {
        match Runtime::build(&config).await {
            Ok(runtime) => {
                let target = runtime.gateway.display_name().to_string();
                results.push(match runtime.gateway.test_connection().await {
                    Ok(()) => CheckResult::pass("database", target),
                    Err(e) => CheckResult::fail("database", target, e.to_string()),
                });

                let target = runtime.registry.backend_name();
                results.push(match runtime.registry.check().await {
                    Ok(()) => CheckResult::pass("registry", target),
                    Err(e) => CheckResult::fail("registry", target, e.to_string()),
                });

                runtime.shutdown().await;
            }
            Err(e) => results.push(CheckResult::fail("runtime", config.registry.name(), e.to_string())),
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print_results(&results);
    }

    let failed: Vec<&str> = results
        .iter()
        .filter(|r| !r.passed)
        .map(|r| r.name)
        .collect();

    if failed.is_empty() {
        info!("All checks passed");
        Ok(())
    } else {
        warn!(failed = ?failed, "Connectivity check failed");
        Err(WorkerError::CheckFailed(failed.join(", ")))
    }
}

fn print_results(results: &[CheckResult]) {
    for result in results {
        let mark = if result.passed { "ok" } else { "FAIL" };
        match &result.message {
            Some(message) => println!("[{mark}] {} ({}): {message}", result.name, result.target),
            None => println!("[{mark}] {} ({})", result.name, result.target),
        }
    }
}
