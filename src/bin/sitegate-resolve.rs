use std::path::PathBuf;
use std::sync::Arc;

use axum::http::header::HOST;
use axum::http::{HeaderMap, HeaderValue};
use clap::{Parser, Subcommand};

use sitegate::config::load_config;
use sitegate::http::GatewayError;
use sitegate::http::RequestPipeline;
use sitegate::routing::host::X_FORWARDED_HOST;
use sitegate::storage::{MemoryStore, ObjectGateway};

#[derive(Parser)]
#[command(name = "sitegate-resolve")]
#[command(about = "Show how sitegate maps hosts and paths to object keys", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "SITEGATE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a host and path to the object key that would be fetched
    Resolve {
        /// Value of the Host header
        #[arg(long)]
        host: String,

        /// Value of X-Forwarded-Host, if the load balancer sets one
        #[arg(long)]
        forwarded_host: Option<String>,

        /// Request path
        #[arg(long, default_value = "/")]
        path: String,
    },
    /// List the configured route table
    Routes,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    // Resolution never reaches storage; an empty in-memory store is enough.
    let store = Arc::new(MemoryStore::new());
    let gateway = ObjectGateway::new(store, config.storage.bucket.clone());
    let pipeline = RequestPipeline::from_config(&config, gateway);

    match cli.command {
        Commands::Resolve {
            host,
            forwarded_host,
            path,
        } => {
            let mut headers = HeaderMap::new();
            headers.insert(HOST, HeaderValue::from_str(&host)?);
            if let Some(forwarded) = forwarded_host {
                headers.insert(X_FORWARDED_HOST, HeaderValue::from_str(&forwarded)?);
            }

            match pipeline.resolve(&headers, &path) {
                Ok(resolved) => {
                    println!("host:       {}", resolved.hostname);
                    println!("prefix:     {}", resolved.prefix);
                    println!("fallback:   {}", !resolved.has_extension);
                    println!("object:     gs://{}/{}", config.storage.bucket, resolved.object_key);
                }
                Err(err @ (GatewayError::RoutingMiss { .. } | GatewayError::PathRejected(_))) => {
                    eprintln!("{} ({})", err, err.status());
                    std::process::exit(1);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Commands::Routes => {
            println!("# version {}", pipeline.routes().version());
            for (host, prefix) in pipeline.routes().entries() {
                println!("{host:<40} {prefix}");
            }
        }
    }

    Ok(())
}
