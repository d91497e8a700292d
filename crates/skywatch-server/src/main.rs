//! Skywatch Server - Always-on backend for airspace monitoring

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skywatch_core::models::Role;
use skywatch_server::api;
use skywatch_server::config::Config;
use skywatch_server::loops;
use skywatch_server::persistence::{self, operators};
use skywatch_server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("skywatch_server=debug".parse()?),
        )
        .init();

    tracing::info!("Starting Skywatch server...");

    let config = Config::from_env();
    let port = config.server_port;

    let db = persistence::init_database(&config.database_path, config.database_max_connections)
        .await?;
    let state = Arc::new(AppState::new(db, config));
    state.load_from_database().await?;
    bootstrap_admin(&state).await?;

    // Start background loops; they stop when the shutdown channel fires.
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);
    tokio::spawn(loops::retention_loop::run_retention_loop(
        state.clone(),
        shutdown_tx.subscribe(),
    ));
    tokio::spawn(loops::alert_idle_loop::run_alert_idle_loop(
        state.clone(),
        shutdown_tx.subscribe(),
    ));

    // Build the app
    let app = api::routes(state).layer(CorsLayer::permissive());

    // Run server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;

    Ok(())
}

async fn shutdown_signal(shutdown_tx: tokio::sync::broadcast::Sender<()>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        return;
    }
    tracing::info!("Shutdown signal received");
    let _ = shutdown_tx.send(());
}

/// Seed the first admin account so a fresh deployment is reachable.
async fn bootstrap_admin(state: &AppState) -> Result<()> {
    if operators::count(state.db.pool()).await? > 0 {
        return Ok(());
    }

    let email = state.config.bootstrap_email.clone();
    let hash = api::operators::hash_password(&state.config.bootstrap_password)
        .map_err(|e| anyhow::anyhow!("failed to hash bootstrap password: {:?}", e))?;
    operators::create(state.db.pool(), &email, &hash, Role::Admin).await?;
    tracing::info!("Seeded bootstrap admin account {}", email);

    Ok(())
}
