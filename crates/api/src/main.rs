//! Placement Portal API server binary entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use placement_common::config::AppConfig;
use placement_common::db::create_pool;
use placement_notifier::{Dispatcher, ProviderSet};

use placement_api::routes::create_router;
use placement_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("placement_api=debug,placement_engine=debug,placement_notifier=debug,tower_http=debug")
        }))
        .init();

    tracing::info!("Starting Placement Portal API server...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Create database connection pool
    let pool = create_pool(&config.database_url, config.db_max_connections).await?;
    tracing::info!("Database pool created");

    // Build notification providers and spawn the dispatch worker
    let providers = Arc::new(ProviderSet::from_config(&config));
    let dispatcher = Dispatcher::spawn(pool.clone(), providers.clone(), &config);
    tracing::info!("Dispatch worker started");

    // Build application state
    let state = AppState::new(pool, config, providers, dispatcher);

    // Build router
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], 8000));
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
