//! nestroute server
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ dispatch ──┬──▶ routing (best / nested match)
//!                    (request id,                │
//!                     trace, timeout)            └──▶ tasks (per-request Ctx,
//!                                                     at-most-once execution)
//!     Client Response
//!     ◀────────────── JSON (api result | page slots | error)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use nestroute::config::{load_config, override_bind, ServerConfig};
use nestroute::observability::{logging, metrics};
use nestroute::{app, HttpServer, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "nestroute", version, about = "Nested route dispatch server")]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config = override_bind(config, bind)?;
    }

    logging::init(&config.observability.log_level);
    tracing::info!("nestroute v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        api_prefix = %config.dispatch.api_prefix,
        request_timeout_ms = config.dispatch.request_timeout_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let dispatcher = Arc::new(app::build_dispatcher(&config));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_ctrl_c();

    let server = HttpServer::new(config, dispatcher);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
