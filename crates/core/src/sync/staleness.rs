use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::SyncConfig;

/// Bound on how old a shop snapshot may be before it is reported as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessPolicy {
    max_age: Duration,
}

impl StalenessPolicy {
    pub fn new(max_age: Duration) -> Self {
        Self { max_age }
    }

    /// Policy from `sync.max_snapshot_age_secs`, if configured.
    pub fn from_config(config: &SyncConfig) -> Option<Self> {
        config
            .max_snapshot_age_secs
            .map(|secs| Self::new(Duration::from_secs(secs)))
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// A snapshot that was never synced is always stale. A sync time in the
    /// future (clock skew) counts as fresh.
    pub fn is_stale(&self, synced_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match synced_at {
            None => true,
            Some(synced_at) => match (now - synced_at).to_std() {
                Ok(age) => age > self.max_age,
                Err(_) => false,
            },
        }
    }
}
