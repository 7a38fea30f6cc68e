//! Collaborator traits for the configuration core.
//!
//! Everything behind these traits is an external subsystem: the key-value
//! persistence layer, the cache purge executor, cloud synchronization, the
//! crawler map, and the versioned migration scripts. The configuration core
//! only emits instructions through them; it never blocks on network I/O.

use crate::types::{SettingId, SettingScope, SettingValue, SiteId};
use errors::{MigrationError, StoreError};

/// Key-value persistence adapter, scoped to global or network storage.
///
/// Calls are synchronous and treated as fast local operations. Cross-process
/// consistency is last-writer-wins at the single-key level; `add_if_missing`
/// is the idempotency safety net for racing migrations.
pub trait SettingsStore {
    /// Read one value, falling back to `default` when the key is absent.
    fn get(
        &self,
        scope: SettingScope,
        id: &SettingId,
        default: &SettingValue,
    ) -> Result<SettingValue, StoreError>;

    /// Read one value from a specific site's global storage (primary-site
    /// loads in network mode).
    fn get_for_site(
        &self,
        site: SiteId,
        id: &SettingId,
        default: &SettingValue,
    ) -> Result<SettingValue, StoreError>;

    /// Write one value. Returns `false` when the adapter deduped an
    /// identical write.
    fn set(
        &self,
        scope: SettingScope,
        id: &SettingId,
        value: &SettingValue,
    ) -> Result<bool, StoreError>;

    /// Persist `value` only if the key does not exist yet. Never overwrites.
    fn add_if_missing(
        &self,
        scope: SettingScope,
        id: &SettingId,
        value: &SettingValue,
    ) -> Result<(), StoreError>;
}

/// Version-gated migration scripts. Each step must be idempotent: two
/// processes racing to migrate may both run it.
pub trait UpgradeRunner {
    /// One-time conversion of pre-schema-v3 data layouts.
    fn run_legacy_upgrade(&self) -> Result<(), MigrationError>;

    /// Upgrade steps keyed by the stored (stale) version.
    fn run_versioned_upgrade(&self, from: &str) -> Result<(), MigrationError>;

    /// Network-scope variant, keyed by the network layer's own version.
    fn run_network_versioned_upgrade(&self, from: &str) -> Result<(), MigrationError>;
}

/// Cache invalidation instructions emitted when a watched setting changes.
pub trait PurgeSink {
    fn purge_url(&self, path: &str);
    fn purge_all(&self, reason: &str);
    fn purge_by_tag(&self, tag: &str);
}

/// Cloud/CDN collaborator.
pub trait CloudBridge {
    /// Drop all cached cloud node state (API key rotated).
    fn clear_cloud_state(&self);
}

/// Crawler sitemap collaborator.
pub trait CrawlerMap {
    /// Reset the crawl map (domain handling changed).
    fn reset_map(&self);
}
