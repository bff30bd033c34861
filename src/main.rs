use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use aven_support_agent::core::config::AppConfig;
use aven_support_agent::core::logging;
use aven_support_agent::server;
use aven_support_agent::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing required credentials abort here, before any socket is opened.
    let config = AppConfig::from_env().context("configuration error")?;
    logging::init(&config.paths);

    let state = AppState::initialize(config);

    let bind_addr = format!("127.0.0.1:{}", state.config.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    tracing::info!("Listening on {}", addr);

    let app: Router = server::router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
