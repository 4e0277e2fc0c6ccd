//! Server binary: settings from the environment, one database pool, one listener.

use sql_gateway::{app, config::AppEnv, connect, logging, AppState, Settings};
use std::net::SocketAddr;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    logging::init(&settings.logging)?;

    tracing::info!(target: "app", env = settings.server.env.as_str(), "starting {}", env!("CARGO_PKG_NAME"));
    if settings.server.env == AppEnv::Development {
        tracing::warn!(target: "app", "running in development mode");
    }
    if !settings.api.auth_enabled() {
        tracing::warn!(target: "app", "API_KEYS is empty; API key authentication is disabled");
    }

    let db = connect(&settings.database).await?;
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let state = AppState::new(db, settings);

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(target: "server", "listening on {}", listener.local_addr()?);
    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    tracing::info!(target: "server", "server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(target: "server", error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!(target: "server", "shutdown signal received");
}
