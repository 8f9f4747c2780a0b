mod config;
mod directory;
mod error;
mod gateway;
mod handlers;
mod legacy;
mod resolver;
mod state;
mod store;

use crate::config::ServerConfig;
use crate::state::AppState;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "server=debug,tower_http=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = ServerConfig::from_env();
    info!(
        "logs legacy en {}, max_retries={}",
        config.prgs_dir.display(),
        config.max_retries
    );

    let state = AppState::new(&config);

    // router HTTP
    let app = handlers::build_router(state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("servidor escuchando en {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
