//! # Layer Resolver
//!
//! Builds the effective option set by merging, in ascending precedence:
//! registry defaults, persisted global values, persisted network values
//! (network mode only, never for site-only settings), and in-memory forced
//! overrides. The constant overlay is populated here too but applies only
//! at read time; it never touches stored state.

use fc_core::{RawValue, SettingScope, SettingValue, SiteId};
use tracing::{debug, warn};

use crate::coerce::coerce;
use crate::registry::{ids, VAL_OFF, VAL_ON, VAL_ON2};
use crate::service::ConfService;

/// Resolved cache-enablement flags for this process lifetime.
///
/// `enabled` is the option-derived switch; `allowed` means the host server
/// or the cloud layer permits caching; `adv_cache_ok` is the advanced-cache
/// handshake. All three must hold for the cache to actually serve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheState {
    pub allowed: bool,
    pub adv_cache_ok: bool,
    pub enabled: bool,
}

impl CacheState {
    pub fn fully_on(&self) -> bool {
        self.allowed && self.adv_cache_ok && self.enabled
    }
}

impl ConfService {
    /// Load the global layer (or one specific site's layer) over the
    /// registry defaults, then populate the constant overlay.
    ///
    /// With a `site`, site-only entries are skipped: they are resolved
    /// locally and must not be read from another tenant.
    pub(crate) fn load_options(&mut self, site: Option<SiteId>) {
        for entry in self.registry.entries() {
            if site.is_some() && entry.site_only {
                continue;
            }
            let read = match site {
                Some(s) => self.store.get_for_site(s, &entry.id, &entry.default),
                None => self.store.get(SettingScope::Global, &entry.id, &entry.default),
            };
            let value = read.unwrap_or_else(|err| {
                warn!("falling back to default for {}: {err}", entry.id);
                entry.default.clone()
            });
            self.options.insert(entry.id.clone(), value);
        }

        if self.env.constants_enabled {
            for entry in self.registry.entries() {
                let Some(raw) = self.env.shadow(&entry.id) else {
                    continue;
                };
                match coerce(entry, RawValue::from(raw)) {
                    Ok(value) => {
                        self.const_options.insert(entry.id.clone(), value);
                    }
                    Err(err) => debug!("ignoring constant shadow for {}: {err}", entry.id),
                }
            }
        }
    }

    /// Load the network layer once. Outside network mode this is a no-op.
    pub(crate) fn load_site_options(&mut self) {
        if !self.env.network_mode || !self.site_options.is_empty() {
            return;
        }
        for entry in self.network_registry.entries() {
            let value = self
                .store
                .get(SettingScope::Network, &entry.id, &entry.default)
                .unwrap_or_else(|err| {
                    warn!("falling back to network default for {}: {err}", entry.id);
                    entry.default.clone()
                });
            self.site_options.insert(entry.id.clone(), value);
        }
    }

    /// Overlay the network layer onto the effective set, honoring the
    /// "use primary config" selection.
    pub(crate) fn try_load_site_options(&mut self) {
        if !self.need_site_options() {
            return;
        }

        self.conf_site_db_init();

        // Network chose to mirror the primary site's configuration. A brand
        // new secondary visited before the primary just sees defaults, which
        // resolves itself on the next primary load.
        if self
            .site_options
            .get(&fc_core::SettingId::from(ids::NETWORK_USE_PRIMARY))
            .is_some_and(SettingValue::is_on)
        {
            let primary = self.env.primary_site;
            self.load_options(Some(primary));
        }

        // Network values win over the local layer for every id they track.
        let overrides: Vec<_> = self
            .registry
            .entries()
            .filter_map(|entry| {
                self.site_options
                    .get(&entry.id)
                    .map(|v| (entry.id.clone(), v.clone()))
            })
            .collect();
        for (id, value) in overrides {
            self.options.insert(id, value);
        }
    }

    /// Whether a network option layer applies to this process.
    pub(crate) fn need_site_options(&self) -> bool {
        self.env.network_mode && self.env.network_activated
    }

    /// Resolve [`CacheState`] from the effective set (both single-site and
    /// network variants).
    pub(crate) fn define_cache(&mut self) {
        // Advanced-cache check off means the handshake is taken for granted.
        // This couples the check setting to the handshake flag; kept as the
        // observable behavior even though the two are logically separate.
        let check = self
            .options
            .get(&fc_core::SettingId::from(ids::UTIL_CHECK_ADVCACHE))
            .is_some_and(SettingValue::is_on);
        let adv_cache_ok = !check || self.env.adv_cache_detected;

        let cloud_on = self
            .options
            .get(&fc_core::SettingId::from(ids::CLOUD_ENABLED))
            .is_some_and(SettingValue::is_on);
        let allowed = self.env.server_allowed || cloud_on;

        let cache_switch = self
            .options
            .get(&fc_core::SettingId::from(ids::CACHE))
            .map_or(0, SettingValue::as_switch);
        let mut enabled = cache_switch == VAL_ON || cloud_on;

        if !self.need_site_options() {
            // Network mode without network activation: a switch deferring to
            // the (absent) network default means cache on for this tenant.
            if self.env.network_mode && cache_switch == VAL_ON2 {
                enabled = true;
            }
        } else if cache_switch == VAL_ON2
            && self
                .site_options
                .get(&fc_core::SettingId::from(ids::CACHE))
                .is_some_and(|v| v.as_switch() != VAL_OFF)
        {
            enabled = true;
        }

        self.cache_state = CacheState {
            allowed,
            adv_cache_ok,
            enabled,
        };
    }
}
