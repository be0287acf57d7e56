//! Zentinel SOAP client binary.
//!
//! Run with: `zentinel-soap-client --config client.yaml --list-operations`
//!
//! Resolves the WSDL (cache or network), builds the client and reports the
//! service endpoint and operations.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use zentinel_soap_client::{ClientBuilder, ClientConfig};

/// SOAP client for Zentinel.
///
/// Fetches and caches a service WSDL, then builds a client from it.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long, default_value = "client.yaml")]
    config: PathBuf,

    /// WSDL URL (overrides the configuration file)
    #[arg(short, long)]
    wsdl: Option<String>,

    /// Print the operations declared in the WSDL
    #[arg(long)]
    list_operations: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = args.log_level.parse().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Starting Zentinel SOAP client v{}", env!("CARGO_PKG_VERSION"));

    let mut config = if args.config.exists() {
        info!("Config file: {}", args.config.display());
        ClientConfig::load(&args.config).context("Failed to load config file")?
    } else {
        info!("Config file not found, using defaults");
        ClientConfig::default()
    };

    if let Some(wsdl) = args.wsdl {
        config.wsdl = Some(wsdl);
    }

    info!(
        wsdl = config.wsdl.as_deref().unwrap_or("<unset>"),
        verify_peer = config.tls.verify_peer,
        cache = config.cache.enabled,
        "Configuration loaded"
    );

    let builder = ClientBuilder::from_config(&config).context("Invalid client configuration")?;
    let client = builder.build().await.context("Failed to build SOAP client")?;

    info!(
        wsdl_cache = %client.wsdl_path().display(),
        version = ?client.version(),
        "Client ready"
    );

    if let Some(endpoint) = client.endpoint() {
        println!("endpoint: {} ({:?})", endpoint.location, endpoint.version);
    }

    if args.list_operations {
        for operation in client.operations() {
            println!("{}", operation);
        }
    }

    Ok(())
}
