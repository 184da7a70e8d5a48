//! search-binder
//!
//! Loads a search client configuration, builds every resource, and runs
//! single operations inside a transaction against one of them.
//!
//! ```text
//! search-binder --config search.toml check --connect
//! search-binder --config search.toml query --resource catalog "title:rust"
//! search-binder --config search.toml commit catalog
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;
use thiserror::Error;

use search_binder::client::ClientError;
use search_binder::config::{load_config, ConfigError};
use search_binder::observability::{logging, metrics};
use search_binder::{BinderError, ClassifierTable, ResolvedResource, ResourceName, SearchRuntime};

#[derive(Parser)]
#[command(name = "search-binder")]
#[command(about = "Run transactions against configured search clients", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "search-binder.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every configured client, then close them
    Check {
        /// Also fetch cluster state for cloud clients
        #[arg(long)]
        connect: bool,
    },
    /// Ping a resource (the default resource when omitted)
    Ping { resource: Option<String> },
    /// Commit pending updates
    Commit { resource: Option<String> },
    /// Roll back pending updates
    Rollback { resource: Option<String> },
    /// Run a select query
    Query {
        #[arg(short, long)]
        resource: Option<String>,

        #[arg(long)]
        collection: Option<String>,

        query: String,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Binder(#[from] BinderError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(&cli.config).map_err(CliError::from)?;
    logging::init(&config.observability.log_level);
    tracing::info!(config = %cli.config.display(), "search-binder v0.1.0 starting");

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| CliError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr);
    }

    let runtime = SearchRuntime::start(&config, &ClassifierTable::new()).map_err(CliError::from)?;
    let outcome = run(&runtime, cli.command).await;
    if let Err(CliError::Binder(e)) = &outcome {
        if let Some(resource) = e.resource() {
            tracing::error!(%resource, error = %e, "Command failed");
        }
    }

    let report = runtime.shutdown().await;
    if !report.is_clean() {
        tracing::warn!(failures = report.failures.len(), "Some search clients failed to close");
    }

    outcome?;
    Ok(())
}

async fn run(runtime: &SearchRuntime, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Check { connect } => {
            for (name, entry) in runtime.registry().iter() {
                if connect {
                    entry.client.connect().await?;
                }
                println!("{}: {} ok", name, entry.client.topology());
            }
            Ok(())
        }
        Commands::Ping { resource } => {
            let resolved = resolve(runtime, resource)?;
            let mut binder = runtime.binder();
            let response = runtime
                .handler()
                .execute(&mut binder, &resolved, |binder| {
                    Box::pin(async move {
                        let client = binder.current()?;
                        Ok::<_, CliError>(client.ping().await?)
                    })
                })
                .await?;
            print_json(&response);
            Ok(())
        }
        Commands::Commit { resource } => {
            let resolved = resolve(runtime, resource)?;
            let mut binder = runtime.binder();
            runtime
                .handler()
                .execute(&mut binder, &resolved, |binder| {
                    Box::pin(async move {
                        binder.current()?;
                        Ok::<_, CliError>(())
                    })
                })
                .await?;
            println!("committed");
            Ok(())
        }
        Commands::Rollback { resource } => {
            let resolved = resolve(runtime, resource)?;
            let mut binder = runtime.binder();
            let handler = runtime.handler();
            let mut tx = handler.begin_resolved(&mut binder, &resolved)?;
            let result = tx.rollback().await;
            handler.end(&mut binder, tx);
            result?;
            println!("rolled back");
            Ok(())
        }
        Commands::Query {
            resource,
            collection,
            query,
        } => {
            let resolved = resolve(runtime, resource)?;
            let mut binder = runtime.binder();
            let response = runtime
                .handler()
                .execute(&mut binder, &resolved, move |binder| {
                    Box::pin(async move {
                        let client = binder.current()?;
                        Ok::<_, CliError>(client.select(collection.as_deref(), &query).await?)
                    })
                })
                .await?;
            print_json(&response);
            Ok(())
        }
    }
}

fn resolve(runtime: &SearchRuntime, resource: Option<String>) -> Result<ResolvedResource, CliError> {
    let explicit = resource.map(ResourceName::new).transpose()?;
    runtime
        .resolver()
        .resolve(explicit.as_ref(), true)
        .ok_or(CliError::Binder(BinderError::NoDefaultResource))
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(_) => println!("{}", value),
    }
}
