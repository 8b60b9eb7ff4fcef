//! searchable-rs server
//!
//! Serves the config-driven search types over HTTP.

use anyhow::{Context, Result};
use searchable::{
    backend::SqliteBackend,
    config,
    metrics::Metrics,
    models::TypeLoader,
    search::Searchable,
    web::{create_router, AppState},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("Starting searchable-rs v{}", searchable::VERSION);

    let settings = config::init(config::load()?)?;
    if settings.general.debug {
        info!("Debug mode enabled");
    }
    info!(
        "Loaded configuration for instance: {}",
        settings.general.instance_name
    );

    let backend = SqliteBackend::connect(&settings.database)
        .await
        .with_context(|| format!("Failed to open database {}", settings.database.url))?;

    for type_config in settings.enabled_types() {
        match backend
            .ensure_fts_index(&type_config.collection, &type_config.fields)
            .await
        {
            Ok(true) => info!("Created fulltext index for {}", type_config.collection),
            Ok(false) => {}
            Err(e) => warn!(
                "Could not index {} for type {}: {}",
                type_config.collection, type_config.name, e
            ),
        }
    }

    let registry = Arc::new(TypeLoader::load(settings));
    if registry.is_empty() {
        warn!("No searchable types configured");
    }

    let metrics = Arc::new(Metrics::new());
    let mut search = Searchable::new(Arc::new(backend), &settings.search).with_registry(registry);
    if settings.general.enable_metrics {
        search = search.with_metrics(Arc::clone(&metrics));
    }

    let app = create_router(AppState::new(settings.clone(), search, metrics));

    let addr = SocketAddr::new(settings.server.bind_address.parse()?, settings.server.port);
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
