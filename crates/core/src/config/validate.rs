use super::{types::Config, AuthMethod, ConfigError};

/// Longest allowed delay between failed sync rounds (one day).
const MAX_BACKOFF_SECS: u64 = 24 * 60 * 60;

/// Validate configuration
/// Currently validates:
/// - Auth section exists (enforced by serde) and api_key auth has keys
/// - Server port is not 0
/// - Search page limits are ordered
/// - Sync URL, interval and backoff parameters
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Auth validation
    if config.auth.method == AuthMethod::ApiKey {
        if config.auth.api_keys.is_empty() {
            return Err(ConfigError::invalid(
                "auth.api_keys must not be empty when method = \"api_key\"",
            ));
        }
        if config.auth.api_keys.iter().any(|k| k.key.trim().is_empty()) {
            return Err(ConfigError::invalid("auth.api_keys entries must have a non-empty key"));
        }
    }

    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::invalid("server.port cannot be 0"));
    }

    // Search validation
    if config.search.default_limit == 0 {
        return Err(ConfigError::invalid("search.default_limit must be at least 1"));
    }
    if config.search.max_limit < config.search.default_limit {
        return Err(ConfigError::invalid(format!(
            "search.max_limit ({}) must be >= search.default_limit ({})",
            config.search.max_limit, config.search.default_limit
        )));
    }

    // Sync validation
    if let Some(ref sync) = config.sync {
        if !sync.shop_service_url.starts_with("http://")
            && !sync.shop_service_url.starts_with("https://")
        {
            return Err(ConfigError::invalid(format!(
                "sync.shop_service_url must be an http(s) URL, got '{}'",
                sync.shop_service_url
            )));
        }
        if sync.interval_secs == 0 {
            return Err(ConfigError::invalid("sync.interval_secs cannot be 0"));
        }
        if sync.request_timeout_secs == 0 {
            return Err(ConfigError::invalid("sync.request_timeout_secs cannot be 0"));
        }
        if sync.initial_backoff_secs == 0 || sync.max_backoff_secs < sync.initial_backoff_secs {
            return Err(ConfigError::invalid(
                "sync backoff requires 0 < initial_backoff_secs <= max_backoff_secs",
            ));
        }
        if sync.max_backoff_secs > MAX_BACKOFF_SECS {
            return Err(ConfigError::invalid(format!(
                "sync.max_backoff_secs must be at most {}, got {}",
                MAX_BACKOFF_SECS, sync.max_backoff_secs
            )));
        }
        if !sync.backoff_multiplier.is_finite() || sync.backoff_multiplier < 1.0 {
            return Err(ConfigError::invalid("sync.backoff_multiplier must be >= 1.0"));
        }
        if sync.max_snapshot_age_secs == Some(0) {
            return Err(ConfigError::invalid("sync.max_snapshot_age_secs cannot be 0"));
        }
    }

    Ok(())
}
