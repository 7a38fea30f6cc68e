//! # Configuration Service
//!
//! The explicitly constructed configuration service instance. One instance
//! is built per process/request lifetime by the bootstrapper and passed by
//! reference to all consumers; there is no global singleton.

use std::collections::HashMap;

use fc_core::{
    CloudBridge, CrawlerMap, PurgeSink, RawValue, SettingId, SettingScope, SettingValue,
    SettingsStore, UpgradeRunner,
};
use tracing::{debug, info};

use crate::env::EnvOverrides;
use crate::registry::{ids, DefaultEntry, Registry};
use crate::resolver::CacheState;

/// Callback run after a batch of updates completes, with the applied pairs.
pub type AfterUpdateFn = Box<dyn Fn(&[(SettingId, RawValue)])>;

/// The option-resolution engine.
///
/// Owns the registry, the effective option set, the constant overlay and the
/// network layer, and drives migration and change dispatch through the
/// collaborator traits it was constructed with.
pub struct ConfService {
    pub(crate) store: Box<dyn SettingsStore>,
    pub(crate) purge: Box<dyn PurgeSink>,
    pub(crate) cloud: Box<dyn CloudBridge>,
    pub(crate) crawler: Box<dyn CrawlerMap>,
    pub(crate) upgrades: Box<dyn UpgradeRunner>,
    pub(crate) env: EnvOverrides,

    pub(crate) registry: Registry,
    pub(crate) network_registry: Registry,

    pub(crate) options: HashMap<SettingId, SettingValue>,
    pub(crate) const_options: HashMap<SettingId, SettingValue>,
    pub(crate) site_options: HashMap<SettingId, SettingValue>,

    pub(crate) cache_state: CacheState,
    pub(crate) after_update: Vec<AfterUpdateFn>,
}

impl ConfService {
    pub fn new(
        store: Box<dyn SettingsStore>,
        purge: Box<dyn PurgeSink>,
        cloud: Box<dyn CloudBridge>,
        crawler: Box<dyn CrawlerMap>,
        upgrades: Box<dyn UpgradeRunner>,
        env: EnvOverrides,
    ) -> Self {
        Self {
            store,
            purge,
            cloud,
            crawler,
            upgrades,
            env,
            registry: Registry::site_defaults(),
            network_registry: Registry::network_defaults(),
            options: HashMap::new(),
            const_options: HashMap::new(),
            site_options: HashMap::new(),
            cache_state: CacheState::default(),
            after_update: Vec::new(),
        }
    }

    /// Boot-time resolution: load all layers, migrate if the stored schema
    /// version is stale, then resolve the cache-enablement state.
    pub fn init(&mut self) {
        self.conf_db_init();
        self.define_cache();
    }

    /// Effective value of one setting, with the constant overlay applied.
    /// Unknown ids are logged and yield `None`, never an error.
    pub fn val(&self, id: &SettingId) -> Option<SettingValue> {
        let Some(stored) = self.options.get(id) else {
            debug!("invalid option ID {id}");
            return None;
        };
        if let Some(shadow) = self.const_overwritten(id) {
            debug!("const option {id}={shadow}");
            return Some(shadow.clone());
        }
        Some(stored.clone())
    }

    /// Effective value without the constant overlay (the stored layer view).
    pub fn raw_val(&self, id: &SettingId) -> Option<SettingValue> {
        let stored = self.options.get(id);
        if stored.is_none() {
            debug!("invalid option ID {id}");
        }
        stored.cloned()
    }

    /// The constant shadow for `id`, if one is defined and differs from the
    /// effective value. Never mutates anything.
    pub fn const_overwritten(&self, id: &SettingId) -> Option<&SettingValue> {
        let shadow = self.const_options.get(id)?;
        if self.options.get(id) == Some(shadow) {
            return None;
        }
        Some(shadow)
    }

    /// Switch view helper: true when the effective value is plainly on.
    pub fn is_on(&self, id: &SettingId) -> bool {
        self.val(id).is_some_and(|v| v.is_on())
    }

    pub fn int_val(&self, id: &SettingId) -> i64 {
        self.val(id).map_or(0, |v| v.as_switch())
    }

    pub fn str_val(&self, id: &SettingId) -> String {
        self.val(id)
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default()
    }

    pub fn list_val(&self, id: &SettingId) -> Vec<String> {
        self.val(id)
            .and_then(|v| v.as_list().map(<[String]>::to_vec))
            .unwrap_or_default()
    }

    /// Whether `role` is in the optimization-excluded roles list.
    pub fn in_exc_roles(&self, role: &str) -> bool {
        self.list_val(&SettingId::from(ids::OPTM_EXC_ROLES))
            .iter()
            .any(|r| r == role)
    }

    /// Unconditionally overwrite the in-memory effective value for this
    /// process lifetime. Not persisted. Ids outside the effective set are
    /// ignored.
    pub fn force_option(&mut self, id: &SettingId, value: SettingValue) {
        let Some(current) = self.options.get(id) else {
            return;
        };
        if *current == value {
            return;
        }
        info!("** {id} forced from {current} to {value}");
        self.options.insert(id.clone(), value);
    }

    /// Register a third-party setting at runtime (append-only) and load its
    /// persisted-or-default value into the effective set.
    ///
    /// Reads the global layer directly, so it is never affected by the
    /// network "use primary config" override.
    pub fn register_setting(&mut self, id: &SettingId, default: SettingValue) {
        let entry = DefaultEntry::new(id.as_str(), default.clone());
        if !self.registry.append(entry) {
            debug!("setting {id} already registered, keeping original definition");
            return;
        }
        let value = self
            .store
            .get(SettingScope::Global, id, &default)
            .unwrap_or(default);
        self.options.insert(id.clone(), value);
    }

    /// Snapshot of the effective option set. With `ori` the constant overlay
    /// is skipped and the stored layer is returned as-is.
    pub fn get_options(&self, ori: bool) -> HashMap<SettingId, SettingValue> {
        let mut snapshot = self.options.clone();
        if !ori {
            for (id, shadow) in &self.const_options {
                snapshot.insert(id.clone(), shadow.clone());
            }
        }
        snapshot
    }

    /// Resolved cache-enablement state, valid after [`Self::init`].
    pub fn cache_state(&self) -> &CacheState {
        &self.cache_state
    }

    /// Register a callback to run after every batch of updates completes.
    pub fn on_after_update(&mut self, cb: AfterUpdateFn) {
        self.after_update.push(cb);
    }
}
