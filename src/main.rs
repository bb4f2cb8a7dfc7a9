//! poap-rankings server entry point.
//!
//! Loads configuration, selects the data store, and starts the Axum HTTP
//! server with graceful shutdown.

use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use poap_rankings::api;
use poap_rankings::app_state::AppState;
use poap_rankings::cache::Cache;
use poap_rankings::config::{AppConfig, LogFormat};
use poap_rankings::persistence::seed::seed_initial_collections;
use poap_rankings::persistence::{CatalogStore, DataStore, InMemoryStore, PostgresStore};
use poap_rankings::service::{CatalogService, RankingsService};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn open_stores(
    config: &AppConfig,
) -> anyhow::Result<(Arc<dyn DataStore>, Arc<dyn CatalogStore>)> {
    if config.persistence_enabled {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(config.database_connect_timeout())
            .connect(&config.database_url)
            .await
            .context("connecting to PostgreSQL")?;
        tracing::info!("using PostgreSQL catalog store");
        let store = Arc::new(PostgresStore::new(pool));
        let data: Arc<dyn DataStore> = Arc::clone(&store) as Arc<dyn DataStore>;
        let catalog: Arc<dyn CatalogStore> = store;
        return Ok((data, catalog));
    }

    let store = Arc::new(InMemoryStore::new());
    if config.seed_demo_data {
        let created = seed_initial_collections(store.as_ref())
            .await
            .context("seeding initial collections")?;
        tracing::info!(created, "seeded in-memory catalog");
    }
    tracing::info!("using in-memory catalog store");
    let data: Arc<dyn DataStore> = Arc::clone(&store) as Arc<dyn DataStore>;
    let catalog: Arc<dyn CatalogStore> = store;
    Ok((data, catalog))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        tracing::info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                tracing::info!("received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid LISTEN_ADDR")?;
    init_tracing(config.log_format);
    tracing::info!(addr = %config.listen_addr, "starting poap-rankings");

    // Build persistence and service layers
    let (data, catalog_store) = open_stores(&config).await?;
    let cache = Arc::new(Cache::new());
    let rankings = Arc::new(RankingsService::new(
        data,
        &cache,
        config.rankings_cache_ttl(),
    ));
    let catalog = Arc::new(CatalogService::new(catalog_store, Arc::clone(&rankings)));

    let app = api::build_app(AppState { rankings, catalog }, config.request_timeout());

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}
