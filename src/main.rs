use anyhow::Context;
use tracing_subscriber::EnvFilter;

use wakaa::config;
use wakaa::database;
use wakaa::handlers::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATA_API_URL, WAKAA_API_PORT, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wakaa=info,tower_http=info")),
        )
        .init();

    let config = config::config();
    tracing::info!("Starting Wakaa API in {:?} mode", config.environment);
    if wakaa::is_production!() && config.uses_memory_store() {
        tracing::warn!("Production mode is running on the in-memory store");
    }

    let store = database::connect(config).context("failed to configure data store")?;
    let app = handlers::router(AppState::new(store));

    // Allow tests or deployments to override port via env
    let port = std::env::var("WAKAA_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Wakaa API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Wakaa API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
