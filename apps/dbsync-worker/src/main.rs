//! dbsync worker - keeps database login accounts in step with directory groups
//!
//! Handles one IAM Identity Center membership event per invocation:
//! - `handle` reads an EventBridge event from a file or stdin and prints the
//!   handler status as JSON
//! - `check` verifies connectivity to the target database and the registry

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod error;
mod runtime;

use error::{status_exit_code, WorkerResult};

/// dbsync worker - directory to database account sync
#[derive(Parser)]
#[command(name = "dbsync-worker")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle one membership event
    Handle(commands::handle::HandleArgs),

    /// Check database and registry connectivity
    Check(commands::check::CheckArgs),
}

#[tokio::main]
async fn main() {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match run(cli.command).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,dbsync_provisioning=debug"));

    // Logs go to stderr; stdout carries the status document.
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn run(command: Commands) -> WorkerResult<i32> {
    match command {
        Commands::Handle(args) => {
            let status = commands::handle::execute(args).await?;
            println!("{}", serde_json::to_string(&status)?);
            Ok(status_exit_code(&status))
        }
        Commands::Check(args) => {
            commands::check::execute(args).await?;
            Ok(0)
        }
    }
}
