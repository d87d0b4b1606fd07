//! RemoveTube classification server binary

use anyhow::Result;
use clap::Parser;
use removetube_server::{
    api_key_from_env, create_router, telemetry, AppState, Cli, ServerConfig,
};
use std::net::SocketAddr;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    telemetry::init_tracing(cli.verbose);

    info!("Starting RemoveTube classifier server");

    let config = ServerConfig::load(&cli.config, &cli)?;
    info!("Backend: {}", config.scorer.backend);
    info!("Model: {}", config.scorer.model_name());
    info!("Degraded mode: {:?}", config.policy.degraded);

    let metrics_handle = telemetry::init_metrics()?;

    let addr: SocketAddr = config.addr().parse()?;
    let state = AppState::new(config, metrics_handle);

    // Model loading can take a while; serve /health in the meantime
    state.spawn_oracle_init(api_key_from_env());

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    let shutdown = async {
        shutdown_signal().await;
        warn!("Shutdown signal received, stopping server...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
