pub mod client;
pub mod controllers;
pub mod core;
pub(crate) mod routes;
pub mod token;
pub mod types;
pub(crate) mod utils;

use axum::Router;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::core::error::ConfigError as Error;

pub use crate::core::config::Args;
pub use crate::core::state::AppState;

/// Builds the HTTP application. Must be called from within a tokio runtime.
pub fn app(state: AppState, rate_limit_per_second: u64) -> Router {
    routes::router::routes(state, rate_limit_per_second)
}

pub async fn run() -> Result<(), Error> {
    let config = Args::load()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_new(&config.log_level).unwrap_or_default())
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::debug!(?config, "loaded configuration");

    let state = AppState::new(&config)?;

    let app = app(state.clone(), config.rate_limit_per_second);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .map_err(Error::IO)?;

    tracing::info!("listening on {}", listener.local_addr().map_err(Error::IO)?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(Error::IO)?;

    state.shutdown();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {:?}", e);
        std::future::pending::<()>().await;
    }

    tracing::info!("shutting down");
}
