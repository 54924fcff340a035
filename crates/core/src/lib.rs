pub mod auth;
pub mod catalog;
pub mod config;
pub mod geo;
pub mod manage;
pub mod metrics;
pub mod search;
pub mod sync;
pub mod testing;

pub use auth::{
    create_authenticator, AuthContext, AuthError, AuthRequest, Authenticator, Identity,
    NoneAuthenticator,
};
pub use catalog::{
    AttributeFilter, CatalogEntry, CatalogEntryPatch, CatalogError, CatalogStats, CatalogStore,
    Category, ShopLocation, ShopSnapshot, SqliteCatalog,
};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthMethod, Config, ConfigError,
    SanitizedConfig,
};
pub use geo::{haversine_km, BoundingBox, Coordinate, GeoError};
pub use manage::{CatalogManager, ManageError, NewProduct};
pub use search::{
    RadiusFilter, SearchEngine, SearchError, SearchHit, SearchPage, SearchParams, SearchQuery,
    SortOrder,
};
pub use sync::{
    HttpShopDirectory, ShopDirectory, ShopDirectoryError, SnapshotSyncer, StalenessPolicy,
    SyncError, SyncReport, SyncStatus,
};
