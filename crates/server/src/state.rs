use std::sync::Arc;

use productsvc_core::{
    Authenticator, CatalogStore, Config, SanitizedConfig, SearchEngine, SnapshotSyncer,
};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    catalog: Arc<dyn CatalogStore>,
    engine: SearchEngine,
    syncer: Option<Arc<SnapshotSyncer>>,
}

impl AppState {
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        catalog: Arc<dyn CatalogStore>,
        engine: SearchEngine,
        syncer: Option<Arc<SnapshotSyncer>>,
    ) -> Self {
        Self {
            config,
            authenticator,
            catalog,
            engine,
            syncer,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn catalog(&self) -> &dyn CatalogStore {
        self.catalog.as_ref()
    }

    pub fn engine(&self) -> &SearchEngine {
        &self.engine
    }

    /// Snapshot syncer, if `[sync]` is configured.
    pub fn syncer(&self) -> Option<&Arc<SnapshotSyncer>> {
        self.syncer.as_ref()
    }
}
