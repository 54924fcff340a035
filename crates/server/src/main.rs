use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use productsvc_core::{
    create_authenticator, load_config, validate_config, Authenticator, CatalogStore,
    HttpShopDirectory, SearchEngine, ShopDirectory, SnapshotSyncer, SqliteCatalog,
    StalenessPolicy,
};
use productsvc_server::api::create_router;
use productsvc_server::state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("PRODUCTSVC_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Auth method: {:?}", config.auth.method);
    info!("Database path: {:?}", config.database.path);

    // Create authenticator
    let authenticator: Arc<dyn Authenticator> = Arc::from(
        create_authenticator(&config.auth).context("Failed to create authenticator")?,
    );
    info!("Using authenticator: {}", authenticator.method_name());

    // Create SQLite catalog
    let catalog: Arc<dyn CatalogStore> = Arc::new(
        SqliteCatalog::new(&config.database.path).context("Failed to open product catalog")?,
    );
    match catalog.stats() {
        Ok(stats) => info!(
            entries = stats.total_entries,
            shops = stats.distinct_shops,
            "Product catalog initialized"
        ),
        Err(e) => warn!("Product catalog opened but stats failed: {}", e),
    }

    // Search engine, flagging stale snapshots when a bound is configured
    let mut engine = SearchEngine::new(Arc::clone(&catalog));
    if let Some(policy) = config.sync.as_ref().and_then(StalenessPolicy::from_config) {
        info!(
            max_age_secs = policy.max_age().as_secs(),
            "Reporting stale shop snapshots"
        );
        engine = engine.with_staleness(policy);
    }

    // Snapshot syncer if configured
    let syncer = match &config.sync {
        Some(sync_config) => {
            let directory: Arc<dyn ShopDirectory> = Arc::new(
                HttpShopDirectory::new(sync_config).context("Failed to create shop directory")?,
            );
            info!("Shop directory at {}", sync_config.shop_service_url);

            let syncer = SnapshotSyncer::new(
                sync_config.clone(),
                Arc::clone(&catalog),
                directory,
            );
            syncer.start();
            Some(Arc::new(syncer))
        }
        None => {
            info!("Snapshot sync not configured; shop locations will not be refreshed");
            None
        }
    };

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        authenticator,
        catalog,
        engine,
        syncer.clone(),
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Server shutting down...");

    if let Some(syncer) = &syncer {
        syncer.stop().await;
        info!("Snapshot syncer stopped");
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
