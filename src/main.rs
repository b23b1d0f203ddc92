use std::sync::Arc;

use homasage_backend::core::config::AppConfig;
use homasage_backend::state::AppState;
use homasage_backend::{logging, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    logging::init(&config.server.log_dir);

    let port = config.server.port;
    let state = Arc::new(AppState::initialize(config).await?);
    let router = server::build_router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "listening");
    axum::serve(listener, router).await?;

    Ok(())
}
