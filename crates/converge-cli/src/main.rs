//! Converge CLI - reconcile orchestrator applications from the shell.
//!
//! This is the entry point for the `converge` binary.

mod cli;
mod manifest;
mod report;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::bail;
use clap::Parser;
use converge_client::{AppRepository, ClientConfig, HttpTransport};
use converge_control::{AppId, Reconcile, Reconciler, ReconcilerConfig};

use cli::{ApplyArgs, Cli, Command, InspectArgs};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only the result
    let default_filter = if cli.debug { "info,converge=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = cli.connection.client_config();
    let result = match &cli.command {
        Command::Apply(args) => apply(&config, args).await,
        Command::Inspect(args) => inspect(&config, args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report::print_error(&err);
            ExitCode::from(report::exit_code(&err))
        }
    }
}

async fn apply(config: &ClientConfig, args: &ApplyArgs) -> anyhow::Result<()> {
    let request = manifest::request(args)?;
    let reconciler = Reconciler::connect(config, &ReconcilerConfig::default())?;

    let outcome = reconciler.reconcile(&request).await?;
    println!("{}", serde_json::to_string_pretty(&report::outcome(&outcome))?);
    Ok(())
}

async fn inspect(config: &ClientConfig, args: &InspectArgs) -> anyhow::Result<()> {
    let id = AppId::parse(&args.id)?;
    let apps = AppRepository::new(Arc::new(HttpTransport::new(config)?));

    let response = if args.versions {
        apps.versions(&id).await?
    } else {
        apps.fetch(&id).await?
    };
    if !response.is_success() {
        bail!("{} {id}: {}", response.status, response.message);
    }

    println!("{}", serde_json::to_string_pretty(&response.body)?);
    Ok(())
}
