//! # Default Registry
//!
//! The static catalog of known setting identifiers with their typed
//! defaults and per-id policies (site-only, multi-switch cardinality,
//! secret masking, string limits, list filters, purge-on-change).
//!
//! The catalog is defined once at process start and may only be extended
//! afterwards: trusted collaborators append new entries, nothing is ever
//! removed or redefined.

use std::collections::HashMap;

use fc_core::{SettingId, SettingValue};

/// Well-known setting identifiers.
pub mod ids {
    /// Reserved schema version key. Never writable through the update
    /// pipeline.
    pub const VER: &str = "_version";

    pub const CACHE: &str = "cache";
    pub const UTIL_CHECK_ADVCACHE: &str = "util.check_advcache";
    pub const CLOUD_ENABLED: &str = "cloud.enabled";
    pub const CLOUD_API_KEY: &str = "cloud.api_key";
    pub const CRAWLER_DROP_DOMAIN: &str = "crawler.drop_domain";
    pub const CRAWLER_SITEMAP: &str = "crawler.sitemap";
    pub const SERVER_IP: &str = "server_ip";
    pub const CACHE_FORCE_URI: &str = "cache.force_uri";
    pub const CACHE_PRIV_URI: &str = "cache.priv_uri";
    pub const CACHE_EXC_URIS: &str = "cache.exc_uris";
    pub const CACHE_MOBILE: &str = "cache.mobile";
    pub const CACHE_BROWSER: &str = "cache.browser";
    pub const ESI: &str = "esi";
    pub const MEDIA_LAZYLOAD: &str = "media.lazyload";
    pub const TTL_PUB: &str = "ttl.pub";
    pub const TTL_PRIV: &str = "ttl.priv";
    pub const TTL_FRONT: &str = "ttl.front";
    pub const OPTM_EXC_ROLES: &str = "optm.exc_roles";
    pub const DEBUG: &str = "debug";
    pub const AUTO_UPGRADE: &str = "auto_upgrade";

    pub const NETWORK_USE_PRIMARY: &str = "network.use_primary";
}

/// Cache switch states. `ON2` defers to the network-level setting.
pub const VAL_OFF: i64 = 0;
pub const VAL_ON: i64 = 1;
pub const VAL_ON2: i64 = 2;

/// Per-line cleanup applied when a list setting is parsed from text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineFilter {
    /// Trim, drop empties, dedupe.
    #[default]
    Basic,
    /// Basic plus scheme/host stripping, keeping the path part. Leading `^`
    /// and trailing `$` pattern anchors pass through untouched.
    Uri,
}

/// Cache-invalidation reaction when the setting's value changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PurgePolicy {
    #[default]
    None,
    /// Emit one purge-by-URL per entry of the old/new symmetric difference.
    Urls,
    /// Purge everything, tagged with the setting id.
    All,
    /// Purge one cache tag.
    Tag(&'static str),
}

/// One registry entry: a setting id, its typed default and its policies.
#[derive(Debug, Clone)]
pub struct DefaultEntry {
    pub id: SettingId,
    pub default: SettingValue,
    pub site_only: bool,
    pub multi_switch: Option<i64>,
    pub secret: bool,
    pub max_len: Option<usize>,
    pub filter: LineFilter,
    pub purge: PurgePolicy,
}

impl DefaultEntry {
    pub fn new(id: &str, default: SettingValue) -> Self {
        Self {
            id: SettingId::from(id),
            default,
            site_only: false,
            multi_switch: None,
            secret: false,
            max_len: None,
            filter: LineFilter::Basic,
            purge: PurgePolicy::None,
        }
    }

    pub fn site_only(mut self) -> Self {
        self.site_only = true;
        self
    }

    /// Allow cycling through `0..=max` states instead of plain on/off.
    pub fn multi_switch(mut self, max: i64) -> Self {
        self.multi_switch = Some(max);
        self
    }

    /// Mask-guarded secret: an all-`*` update is treated as "unchanged".
    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    pub fn max_len(mut self, max: usize) -> Self {
        self.max_len = Some(max);
        self
    }

    pub fn filter(mut self, filter: LineFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn purge(mut self, purge: PurgePolicy) -> Self {
        self.purge = purge;
        self
    }
}

/// Append-only, ordered catalog of setting definitions.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<DefaultEntry>,
    index: HashMap<SettingId, usize>,
}

impl Registry {
    /// Append one entry. Returns `false` (and keeps the original) when the
    /// id is already cataloged.
    pub fn append(&mut self, entry: DefaultEntry) -> bool {
        if self.index.contains_key(&entry.id) {
            return false;
        }
        self.index.insert(entry.id.clone(), self.entries.len());
        self.entries.push(entry);
        true
    }

    pub fn get(&self, id: &SettingId) -> Option<&DefaultEntry> {
        self.index.get(id).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, id: &SettingId) -> bool {
        self.index.contains_key(id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &DefaultEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pure defaults, id to value, exactly as cataloged.
    pub fn defaults_map(&self) -> HashMap<SettingId, SettingValue> {
        self.entries
            .iter()
            .map(|e| (e.id.clone(), e.default.clone()))
            .collect()
    }

    /// The full per-site catalog.
    pub fn site_defaults() -> Self {
        let mut r = Self::default();
        for entry in [
            DefaultEntry::new(ids::VER, SettingValue::Str(String::new())),
            // Cache switch: 0 off, 1 on, 2 use network default. Defaults to
            // deferring to the network layer.
            DefaultEntry::new(ids::CACHE, SettingValue::Int(VAL_ON2))
                .multi_switch(VAL_ON2)
                .purge(PurgePolicy::All),
            DefaultEntry::new(ids::UTIL_CHECK_ADVCACHE, SettingValue::Bool(true)),
            DefaultEntry::new(ids::CLOUD_ENABLED, SettingValue::Bool(false)),
            DefaultEntry::new(ids::CLOUD_API_KEY, SettingValue::Str(String::new()))
                .secret()
                .max_len(128),
            DefaultEntry::new(ids::CRAWLER_DROP_DOMAIN, SettingValue::Bool(false)),
            DefaultEntry::new(ids::CRAWLER_SITEMAP, SettingValue::Str(String::new()))
                .site_only()
                .max_len(256),
            DefaultEntry::new(ids::SERVER_IP, SettingValue::Str(String::new()))
                .site_only()
                .max_len(45),
            DefaultEntry::new(ids::CACHE_FORCE_URI, SettingValue::List(Vec::new()))
                .filter(LineFilter::Uri)
                .purge(PurgePolicy::Urls),
            DefaultEntry::new(ids::CACHE_PRIV_URI, SettingValue::List(Vec::new()))
                .filter(LineFilter::Uri)
                .purge(PurgePolicy::Urls),
            DefaultEntry::new(ids::CACHE_EXC_URIS, SettingValue::List(Vec::new()))
                .filter(LineFilter::Uri),
            DefaultEntry::new(ids::CACHE_MOBILE, SettingValue::Bool(false))
                .purge(PurgePolicy::All),
            DefaultEntry::new(ids::CACHE_BROWSER, SettingValue::Bool(false))
                .purge(PurgePolicy::All),
            DefaultEntry::new(ids::ESI, SettingValue::Bool(false)).purge(PurgePolicy::All),
            DefaultEntry::new(ids::MEDIA_LAZYLOAD, SettingValue::Bool(false))
                .purge(PurgePolicy::Tag("media")),
            DefaultEntry::new(ids::TTL_PUB, SettingValue::Int(604_800)),
            DefaultEntry::new(ids::TTL_PRIV, SettingValue::Int(1800)),
            DefaultEntry::new(ids::TTL_FRONT, SettingValue::Int(604_800)),
            DefaultEntry::new(ids::OPTM_EXC_ROLES, SettingValue::List(Vec::new())),
            DefaultEntry::new(ids::DEBUG, SettingValue::Bool(false)),
            DefaultEntry::new(ids::AUTO_UPGRADE, SettingValue::Bool(false)),
        ] {
            r.append(entry);
        }
        r
    }

    /// The network-scope catalog, with its own reserved version entry.
    pub fn network_defaults() -> Self {
        let mut r = Self::default();
        for entry in [
            DefaultEntry::new(ids::VER, SettingValue::Str(String::new())),
            DefaultEntry::new(ids::NETWORK_USE_PRIMARY, SettingValue::Bool(false))
                .purge(PurgePolicy::All),
            DefaultEntry::new(ids::CACHE, SettingValue::Bool(true)).purge(PurgePolicy::All),
            DefaultEntry::new(ids::AUTO_UPGRADE, SettingValue::Bool(false)),
            DefaultEntry::new(ids::DEBUG, SettingValue::Bool(false)),
        ] {
            r.append(entry);
        }
        r
    }
}
