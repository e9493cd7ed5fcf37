//! HTTP Request Capture Service
//!
//! Accepts any HTTP request on any path, records it durably, answers `OK!`.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ───────────────▶ ┌──────────┐    ┌───────────┐    ┌──────────────┐    ┌──────────────┐
//!                      │  axum    │───▶│ auth gate │───▶│   capture    │───▶│ record store │
//!                      │ listener │    │  (401)    │    │   handler    │    │   (SQLite)   │
//!     Client Response  └──────────┘    └───────────┘    └──────┬───────┘    └──────────────┘
//!     ◀────────────────────────────────────────────────────────┘ 200 OK! / 500
//!
//!     every stage ──▶ EventSink ──▶ tracing + metrics
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use request_capture::config::load_config;
use request_capture::lifecycle::{bootstrap, signals, Shutdown};
use request_capture::observability::{logging, TracingSink};

#[derive(Parser)]
#[command(name = "request-capture")]
#[command(about = "Capture and store every inbound HTTP request", long_about = None)]
struct Cli {
    /// Optional TOML configuration file.
    #[arg(short, long, env = "CAPTURE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            logging::init_logging("info");
            tracing::error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!("request-capture v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        storage_path = %config.storage.path,
        max_body_bytes = config.limits.max_body_bytes,
        auth_enabled = !config.auth.api_key.is_empty(),
        "Configuration loaded"
    );

    let service = match bootstrap(&config, Arc::new(TracingSink)).await {
        Ok(service) => service,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    if let Ok(addr) = service.local_addr() {
        tracing::info!(address = %addr, "Server started, listening at http://{}", addr);
    }

    if let Err(e) = service.server.run(service.listener, shutdown.subscribe()).await {
        tracing::error!(error = %e, "Server error");
        return ExitCode::FAILURE;
    }

    tracing::info!("Shutdown complete");
    ExitCode::SUCCESS
}
