//! Fraud ML Pipeline - HTTP API Entry Point
//!
//! Serves batch predictions and drift checks over the trained run artifacts.

use anyhow::{Context, Result};
use clap::Parser;
use fraud_ml_pipeline::{
    api::{self, AppState},
    config::LoggingConfig,
    telemetry,
};
use std::net::SocketAddr;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "fraud-ml-pipeline", version, about = "Fraud detection API server")]
struct Args {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8000)]
    port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log format (json, pretty)
    #[arg(long, env = "LOG_FORMAT", default_value = "pretty")]
    log_format: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    telemetry::init_tracing(
        &LoggingConfig {
            level: args.log_level.clone(),
            format: args.log_format.clone(),
        },
        env!("CARGO_CRATE_NAME"),
    )?;

    info!("Starting Fraud Detection API");

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("invalid HOST:PORT '{}:{}'", args.host, args.port))?;

    let app = api::router(AppState::new());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(
        "fraud-ml-pipeline v{} listening on {}",
        env!("CARGO_PKG_VERSION"),
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("API shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
