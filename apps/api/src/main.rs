mod auth;
mod config;
mod db;
mod discovery;
mod errors;
mod matching;
mod moderation;
mod ontology;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::EnvPasswordVerifier;
use crate::config::Config;
use crate::db::{create_pool, init_schema};
use crate::discovery::job::DiscoveryStatus;
use crate::discovery::signal::SimulatedMarketFeed;
use crate::matching::extract::FileTextExtractor;
use crate::matching::scoring::CatalogResourceLookup;
use crate::ontology::seed::seed_catalog;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Career Match API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL and the catalog
    let db = create_pool(&config.database_url).await?;
    init_schema(&db).await?;
    seed_catalog(&db).await?;

    // Collaborator seams: credential check, market feed, learning resources,
    // resume parsing. Each is swappable without touching handler code.
    let auth = Arc::new(EnvPasswordVerifier::new(config.admin_password.clone()));
    let signal_source = Arc::new(SimulatedMarketFeed);
    let resources = Arc::new(CatalogResourceLookup);
    let extractor = Arc::new(FileTextExtractor);

    let state = AppState {
        db,
        config: config.clone(),
        auth,
        signal_source,
        resources,
        extractor,
        discovery_status: Arc::new(RwLock::new(DiscoveryStatus::idle())),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
