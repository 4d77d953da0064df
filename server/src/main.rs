//! Fundlock Server Binary
//!
//! Binds the HTTP adapter to a ledger engine, runs the expiry sweep in
//! the background, and shuts down gracefully on Ctrl+C.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fundlock_ledger::LedgerEngine;
use fundlock_server::{router, AppState, ServerConfig, ServerMetrics};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting fundlock server");

    let config = ServerConfig::from_env();
    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    let engine = Arc::new(LedgerEngine::new(config.ledger_config()));
    let metrics = Arc::new(ServerMetrics::new());

    // Background expiry sweep; exits once the engine stops accepting.
    let sweep_engine = engine.clone();
    tokio::spawn(async move {
        sweep_engine.run_sweep_loop().await;
    });

    let app = router(AppState {
        engine: engine.clone(),
        metrics,
    });

    let addr = format!("{}:{}", config.listen_addr, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(
        addr = %addr,
        hold_ttl_ms = config.hold_ttl.as_millis() as u64,
        "HTTP server listening"
    );

    let shutdown_engine = engine.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to listen for Ctrl+C");
            info!("Shutdown signal received");
            shutdown_engine.shutdown();
        })
        .await?;

    engine.mark_stopped();
    info!("Server shutdown complete");
    Ok(())
}
