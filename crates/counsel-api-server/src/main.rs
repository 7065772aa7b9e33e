use anyhow::Result;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use counsel_api_server::{build_router, AppState, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,counsel_api_server=debug")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .init();

    info!("Starting counsel API server...");

    let settings = Settings::load()?;
    info!(
        "Configuration loaded: primary={}, fallback={:?}, timeout={}s",
        settings.llm.primary_model,
        settings.llm.fallback(),
        settings.llm.timeout_seconds
    );
    if settings.llm.api_key.trim().is_empty() {
        warn!("No LLM API key configured; model calls will be rejected upstream");
    }

    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));
    let sweep_interval = Duration::from_secs(settings.session.sweep_interval_seconds);

    let state = AppState::from_settings(settings)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = state.sessions.spawn_sweeper(sweep_interval, shutdown_rx);
    info!("Session sweeper started (every {}s)", sweep_interval.as_secs());

    let app = build_router(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = sweeper.await {
        warn!("Session sweeper ended abnormally: {}", e);
    }
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
