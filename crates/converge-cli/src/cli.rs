//! Command line arguments.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use converge_client::ClientConfig;
use converge_control::DesiredState;

/// Converge - declarative application reconciliation.
#[derive(Parser, Debug)]
#[command(name = "converge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub connection: Connection,

    /// Enable debug logging.
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Orchestrator connection flags.
#[derive(Args, Debug)]
pub struct Connection {
    /// Orchestrator URI.
    #[arg(
        long,
        global = true,
        env = "CONVERGE_URI",
        default_value = "http://localhost:8080"
    )]
    pub uri: String,

    /// Username for HTTP Basic auth.
    #[arg(long, global = true, env = "CONVERGE_USERNAME")]
    pub username: Option<String>,

    /// Password for HTTP Basic auth.
    #[arg(long, global = true, env = "CONVERGE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Validate TLS certificates.
    #[arg(
        long,
        global = true,
        env = "CONVERGE_VALIDATE_CERTS",
        default_value_t = true,
        action = ArgAction::Set
    )]
    pub validate_certs: bool,

    /// Accept invalid TLS certificates. Same as `--validate-certs false`.
    #[arg(long, global = true)]
    pub insecure: bool,
}

impl Connection {
    /// Build the client configuration.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            uri: self.uri.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            validate_certs: self.validate_certs && !self.insecure,
            ..ClientConfig::default()
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Reconcile an application toward a desired state.
    Apply(ApplyArgs),
    /// Show an application as the orchestrator sees it.
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// JSON application manifest.
    #[arg(long, short = 'f')]
    pub manifest: Option<PathBuf>,

    /// Application id; overrides the manifest's `id`.
    #[arg(long)]
    pub id: Option<String>,

    /// Desired state: present, absent, restarted or killed.
    #[arg(long, default_value = "present")]
    pub state: DesiredState,

    /// Override a deployment currently holding the app.
    #[arg(long)]
    pub force: bool,

    /// Seconds to wait for the resulting deployment. 0 does not wait.
    #[arg(long)]
    pub wait_timeout: Option<u64>,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Application id.
    #[arg(long)]
    pub id: String,

    /// List stored versions instead of the current definition.
    #[arg(long)]
    pub versions: bool,
}
