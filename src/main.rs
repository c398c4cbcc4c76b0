//! Cabinet Gateway (v1)
//!
//! HTTP front door for the classifieds backend. Every routed request passes
//! a fixed security pipeline before it reaches a handler.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────────┐
//!                         │                   CABINET GATEWAY                     │
//!                         │                                                       │
//!   Client Request        │  ┌──────────┐   ┌──────────┐   ┌──────────────────┐  │
//!   ──────────────────────┼─▶│ request  │──▶│  kernel  │──▶│ routing          │  │
//!                         │  │ id layer │   │          │   │ requirements map │  │
//!                         │  └──────────┘   └────┬─────┘   └──────────────────┘  │
//!                         │                      │                                │
//!                         │                      ▼                                │
//!                         │  ┌─────────────────────────────────────────────────┐ │
//!                         │  │ security pipeline                                │ │
//!                         │  │ auth → nonce → signature → encryption →         │ │
//!                         │  │ scope/role → rate limit                          │ │
//!                         │  └───────────────────────┬─────────────────────────┘ │
//!                         │                          │                            │
//!   Client Response       │  ┌──────────┐            ▼                            │
//!   ◀─────────────────────┼──│ 403/404/ │◀──── handlers (probes, echoes)          │
//!                         │  │ 413/200  │                                         │
//!                         │  └──────────┘                                         │
//!                         │                                                       │
//!                         │  Cross-cutting: config (+ watcher), observability,    │
//!                         │  lifecycle (signals, shutdown, sweepers)              │
//!                         └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use cabinet_gateway::config::loader::load_config;
use cabinet_gateway::config::watcher::ConfigWatcher;
use cabinet_gateway::config::GatewayConfig;
use cabinet_gateway::lifecycle::{signals, Shutdown};
use cabinet_gateway::observability::{logging, metrics};
use cabinet_gateway::GatewayServer;

#[derive(Parser)]
#[command(name = "cabinet-gateway")]
#[command(about = "Request security gateway for the Cabinet backend", long_about = None)]
struct Args {
    /// TOML configuration file. Built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload the actor roster when the config file changes.
    #[arg(long, requires = "config")]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init_tracing(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "cabinet-gateway starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        routes = config.routes.len(),
        actors = config.actors.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Keep the watcher handle alive for the lifetime of the server
    let (_watcher, config_updates) = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        _ => (None, mpsc::unbounded_channel().1),
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = GatewayServer::new(config);
    let server_task = tokio::spawn(server.run(listener, config_updates, shutdown.subscribe()));

    signals::shutdown_on_signal(&shutdown).await;
    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
