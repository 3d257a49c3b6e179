//! sitegate: static site edge gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────────┐
//!                    │                        SITEGATE                          │
//!                    │                                                          │
//!   Client Request   │  ┌─────────┐   ┌───────────┐   ┌───────────┐             │
//!   ─────────────────┼─▶│  http   │──▶│  routing  │──▶│  routing  │             │
//!                    │  │ server  │   │ host+table│   │   path    │             │
//!                    │  └─────────┘   └───────────┘   └─────┬─────┘             │
//!                    │                                      │ object key        │
//!                    │                                      ▼                   │
//!   Client Response  │  ┌─────────┐                  ┌─────────────┐            │
//!   ◀────────────────┼──│response │◀─────────────────│   storage   │◀───────────┼── Bucket
//!                    │  │ stream  │                  │   gateway   │            │
//!                    │  └─────────┘                  └─────────────┘            │
//!                    │                                                          │
//!                    │  Cross-cutting: config · observability · lifecycle       │
//!                    └──────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use sitegate::config::load_config;
use sitegate::lifecycle::{signals, Shutdown};
use sitegate::observability::{logging, metrics};
use sitegate::HttpServer;

#[derive(Parser)]
#[command(name = "sitegate", version, about = "Serve static sites from an object-storage bucket by hostname")]
struct Cli {
    /// Path to the TOML configuration file. Built-in defaults when omitted.
    #[arg(short, long, env = "SITEGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Validate the configuration, print the route table and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    if cli.check {
        println!("bucket: {} ({:?})", config.storage.bucket, config.storage.backend);
        println!("routes version: {}", config.routing.version);
        for site in &config.routing.sites {
            println!("{} -> {}", site.hostname, site.prefix);
        }
        return Ok(());
    }

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "sitegate starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        bucket = %config.storage.bucket,
        sites = config.routing.sites.len(),
        host_trust = ?config.routing.host_trust,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::from_config(config)?;

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(&shutdown);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
