//! Groupgate - directory group authorization
//!
//! Resolves which accepted groups a subject belongs to, either by searching the directory
//! over LDAP or through the HTTP API in front of it.

use anyhow::Context;
use clap::{Parser, Subcommand};
use groupgate_api::ApiSearcher;
use groupgate_core::config::{ApiConfig, ProcessEnv};
use groupgate_core::{AcceptedGroups, Backend, DirectorySearcher, GroupResolver, StatusError};
use groupgate_ldap::{LdapConfig, LdapSearcher};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Parser)]
#[command(name = "groupgate")]
#[command(author = "Groupgate Team")]
#[command(version)]
#[command(about = "Directory group-membership authorization", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory transport (ldap or api)
    #[arg(long, env = "DIRECTORY_BACKEND", default_value = "api", global = true)]
    backend: Backend,

    /// Comma-separated accepted groups
    #[arg(long, env = "ACCEPTED_GROUPS", global = true)]
    accepted_groups: Option<String>,

    /// LDAP connect and operation timeout in seconds
    #[arg(long, env = "LDAP_TIMEOUT_SECS", global = true)]
    ldap_timeout: Option<u64>,

    /// Log level (trace, debug, info, warn, error); overrides RUST_LOG when given
    #[arg(long, env = "GROUPGATE_LOG_LEVEL", global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the accepted groups of a subject
    Resolve {
        /// Account name to look up
        subject: String,
    },

    /// Check that the directory is reachable
    Health,
}

#[derive(Serialize)]
struct HealthReport {
    backend: Backend,
    status: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only the JSON result
    let directive = log_directive(cli.log_level.as_deref(), std::env::var("RUST_LOG").ok());
    let filter =
        EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();

    let resolver = build_resolver(&cli)?;

    match cli.command {
        Commands::Resolve { subject } => {
            let resolution = resolver.resolve_groups(&subject).await;
            match resolution {
                Ok(resolution) => print_json(&resolution),
                Err(err) => fail(err),
            }
        }
        Commands::Health => match resolver.health_check().await {
            Ok(status) => print_json(&HealthReport {
                backend: resolver.backend(),
                status,
            }),
            Err(err) => fail(err),
        },
    }
}

fn build_resolver(cli: &Cli) -> anyhow::Result<GroupResolver> {
    let accepted = match cli.accepted_groups.as_deref() {
        Some(list) => AcceptedGroups::parse(list).context("invalid accepted group list")?,
        None => AcceptedGroups::default(),
    };
    debug!(%accepted, "Accepted groups loaded");

    let searcher = build_searcher(cli.backend, cli.ldap_timeout)?;
    info!(backend = %cli.backend, "Directory searcher ready");

    Ok(GroupResolver::new(searcher, accepted))
}

fn build_searcher(
    backend: Backend,
    ldap_timeout: Option<u64>,
) -> anyhow::Result<Arc<dyn DirectorySearcher>> {
    let searcher: Arc<dyn DirectorySearcher> = match backend {
        Backend::Ldap => {
            let mut config =
                LdapConfig::from_env(&ProcessEnv).context("incomplete LDAP configuration")?;
            if let Some(seconds) = ldap_timeout {
                config = config
                    .with_connection_timeout_secs(seconds)
                    .with_operation_timeout_secs(seconds);
            }
            Arc::new(LdapSearcher::new(config))
        }
        Backend::Api => {
            let config =
                ApiConfig::from_env(&ProcessEnv).context("incomplete directory API configuration")?;
            Arc::new(ApiSearcher::from_config(config).context("failed to build API client")?)
        }
    };
    Ok(searcher)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Picks the log filter: an explicit level wins over `RUST_LOG`, then the default.
fn log_directive(cli_level: Option<&str>, rust_log: Option<String>) -> String {
    cli_level
        .map(str::to_string)
        .or(rust_log.filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
}

fn fail(err: StatusError) -> anyhow::Result<()> {
    if err.error.should_log() {
        error!(code = err.error.error_code(), status = err.status, error = %err, "Request failed");
    } else {
        warn!(code = err.error.error_code(), status = err.status, error = %err, "Request denied");
    }
    let message = err.to_string();
    print_json(&err.into_error_response())?;
    anyhow::bail!(message)
}
