//! `blest` server.
//!
//! Serves a small demo route registry over HTTP. Configuration comes from an
//! optional TOML file; `--bind` overrides the listener address.

use std::path::PathBuf;

use clap::Parser;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use blest::config::{load_config, validate_config, BlestConfig};
use blest::dispatch::{Context, HandlerError};
use blest::lifecycle::{shutdown_on_signal, Shutdown};
use blest::observability::{logging, metrics};
use blest::routing::{RegistryError, Router, RouterOptions};
use blest::HttpServer;

#[derive(Parser)]
#[command(name = "blest")]
#[command(about = "Batched RPC server", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listener address, overriding the config file
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => BlestConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
        if let Err(errors) = validate_config(&config) {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            return Err(messages.join(", ").into());
        }
    }

    logging::init(&config.observability);
    tracing::info!("blest v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let router = demo_router(config.router.clone())?;
    tracing::info!(routes = ?router.route_names(), "Routes registered");

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let shutdown = Shutdown::new();
    tokio::spawn(shutdown_on_signal(shutdown.clone()));

    let server = HttpServer::new(router, &config.listener);
    server.run(listener, shutdown.subscribe()).await?;
    if !shutdown.is_triggered() {
        tracing::warn!("HTTP server stopped without a shutdown signal");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

fn demo_router(options: RouterOptions) -> Result<Router, RegistryError> {
    let mut router = Router::new(options)?;

    router.route("hello", |_body: Value, _ctx: Context| async {
        Ok(Some(json!({ "hello": "world" })))
    })?;

    router.route("greet", |body: Value, _ctx: Context| async move {
        let name = body
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| HandlerError::new("Name is required").with_status(400))?;
        Ok(Some(json!({ "greeting": format!("Hi, {name}!") })))
    })?;

    router.route("fail", |_body: Value, _ctx: Context| async {
        Err(HandlerError::new("Intentional failure").with_code("DEMO_FAILURE"))
    })?;

    Ok(router)
}
