use anyhow::Result;
use clap::Parser;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use cve_ingest::cli::commands::{handle_config, handle_index, handle_status, handle_upload};
use cve_ingest::cli::{Cli, Commands};
use cve_ingest::models::OutputFormat;

/// Logs go to stderr so formatted output on stdout stays parseable.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "cve_ingest=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let format = cli.format.unwrap_or_default();
    let verbose = cli.verbose;

    // Spawned so the signal branch is still polled while a worker reads a partition.
    let command = tokio::spawn(run_command(cli.command, format, verbose));

    tokio::select! {
        result = command => {
            result??;
        }
        _ = shutdown_signal() => {
            eprintln!("\nReceived shutdown signal, stopping upload...");
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            // A partition read may still hold a worker; don't wait for it.
            std::process::exit(130);
        }
    }

    Ok(())
}

async fn run_command(command: Commands, format: OutputFormat, verbose: bool) -> Result<()> {
    match command {
        Commands::Upload(args) => {
            handle_upload(args, format, verbose).await?;
        }
        Commands::Index(cmd) => {
            handle_index(cmd, format, verbose).await?;
        }
        Commands::Status(args) => {
            handle_status(args, format, verbose).await?;
        }
        Commands::Config(cmd) => {
            handle_config(cmd, format, verbose).await?;
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
