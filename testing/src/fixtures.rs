use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use errors::{MigrationError, StoreError};
use fc_core::{
    CloudBridge, CrawlerMap, PurgeSink, SettingId, SettingScope, SettingValue, SettingsStore,
    SiteId, UpgradeRunner,
};

type KvMap = HashMap<SettingId, SettingValue>;

#[derive(Default)]
struct MemStoreInner {
    global: RefCell<KvMap>,
    network: RefCell<KvMap>,
    sites: RefCell<HashMap<SiteId, KvMap>>,
    fail_writes: Cell<bool>,
    fail_reads: Cell<bool>,
    fail_write_keys: RefCell<HashSet<SettingId>>,
}

/// In-memory scoped key-value store with last-writer-wins semantics and
/// write dedupe, like the real persistence layer.
#[derive(Clone, Default)]
pub struct MemStore(Rc<MemStoreInner>);

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, scope: SettingScope, id: &str, value: SettingValue) {
        self.map(scope)
            .borrow_mut()
            .insert(SettingId::from(id), value);
    }

    pub fn seed_site(&self, site: SiteId, id: &str, value: SettingValue) {
        self.0
            .sites
            .borrow_mut()
            .entry(site)
            .or_default()
            .insert(SettingId::from(id), value);
    }

    pub fn stored(&self, scope: SettingScope, id: &str) -> Option<SettingValue> {
        self.map(scope).borrow().get(&SettingId::from(id)).cloned()
    }

    pub fn stored_len(&self, scope: SettingScope) -> usize {
        self.map(scope).borrow().len()
    }

    /// Make every subsequent write fail, simulating adapter outage.
    pub fn fail_writes(&self, fail: bool) {
        self.0.fail_writes.set(fail);
    }

    /// Make every subsequent read fail, simulating adapter outage.
    pub fn fail_reads(&self, fail: bool) {
        self.0.fail_reads.set(fail);
    }

    /// Make writes fail for one specific key only.
    pub fn fail_writes_for(&self, id: &str) {
        self.0
            .fail_write_keys
            .borrow_mut()
            .insert(SettingId::from(id));
    }

    pub fn clear_write_failures(&self) {
        self.0.fail_writes.set(false);
        self.0.fail_write_keys.borrow_mut().clear();
    }

    fn write_fails(&self, id: &SettingId) -> bool {
        self.0.fail_writes.get() || self.0.fail_write_keys.borrow().contains(id)
    }

    fn map(&self, scope: SettingScope) -> &RefCell<KvMap> {
        match scope {
            SettingScope::Global => &self.0.global,
            SettingScope::Network => &self.0.network,
        }
    }

    fn unavailable(&self, scope: &str, id: &SettingId) -> StoreError {
        StoreError::Unavailable {
            scope: scope.to_string(),
            id: id.to_string(),
            reason: "simulated outage".to_string(),
        }
    }
}

impl SettingsStore for MemStore {
    fn get(
        &self,
        scope: SettingScope,
        id: &SettingId,
        default: &SettingValue,
    ) -> Result<SettingValue, StoreError> {
        if self.0.fail_reads.get() {
            return Err(self.unavailable(&scope.to_string(), id));
        }
        Ok(self
            .map(scope)
            .borrow()
            .get(id)
            .cloned()
            .unwrap_or_else(|| default.clone()))
    }

    fn get_for_site(
        &self,
        site: SiteId,
        id: &SettingId,
        default: &SettingValue,
    ) -> Result<SettingValue, StoreError> {
        if self.0.fail_reads.get() {
            return Err(self.unavailable("site", id));
        }
        Ok(self
            .0
            .sites
            .borrow()
            .get(&site)
            .and_then(|m| m.get(id))
            .cloned()
            .unwrap_or_else(|| default.clone()))
    }

    fn set(
        &self,
        scope: SettingScope,
        id: &SettingId,
        value: &SettingValue,
    ) -> Result<bool, StoreError> {
        if self.write_fails(id) {
            return Err(self.unavailable(&scope.to_string(), id));
        }
        let mut map = self.map(scope).borrow_mut();
        if map.get(id) == Some(value) {
            return Ok(false);
        }
        map.insert(id.clone(), value.clone());
        Ok(true)
    }

    fn add_if_missing(
        &self,
        scope: SettingScope,
        id: &SettingId,
        value: &SettingValue,
    ) -> Result<(), StoreError> {
        if self.write_fails(id) {
            return Err(self.unavailable(&scope.to_string(), id));
        }
        self.map(scope)
            .borrow_mut()
            .entry(id.clone())
            .or_insert_with(|| value.clone());
        Ok(())
    }
}

/// One recorded cache-invalidation instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurgeEvent {
    Url(String),
    All(String),
    Tag(String),
}

/// Purge sink that records every emitted instruction.
#[derive(Clone, Default)]
pub struct RecordingPurge(Rc<RefCell<Vec<PurgeEvent>>>);

impl RecordingPurge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PurgeEvent> {
        self.0.borrow().clone()
    }

    pub fn take(&self) -> Vec<PurgeEvent> {
        self.0.borrow_mut().drain(..).collect()
    }
}

impl PurgeSink for RecordingPurge {
    fn purge_url(&self, path: &str) {
        self.0.borrow_mut().push(PurgeEvent::Url(path.to_string()));
    }

    fn purge_all(&self, reason: &str) {
        self.0.borrow_mut().push(PurgeEvent::All(reason.to_string()));
    }

    fn purge_by_tag(&self, tag: &str) {
        self.0.borrow_mut().push(PurgeEvent::Tag(tag.to_string()));
    }
}

/// Cloud collaborator that counts state resets.
#[derive(Clone, Default)]
pub struct RecordingCloud(Rc<Cell<u32>>);

impl RecordingCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cleared(&self) -> u32 {
        self.0.get()
    }
}

impl CloudBridge for RecordingCloud {
    fn clear_cloud_state(&self) {
        self.0.set(self.0.get() + 1);
    }
}

/// Crawler-map collaborator that counts resets.
#[derive(Clone, Default)]
pub struct RecordingCrawler(Rc<Cell<u32>>);

impl RecordingCrawler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resets(&self) -> u32 {
        self.0.get()
    }
}

impl CrawlerMap for RecordingCrawler {
    fn reset_map(&self) {
        self.0.set(self.0.get() + 1);
    }
}

/// Migration runner that records which steps ran and always succeeds.
#[derive(Clone, Default)]
pub struct ScriptedUpgrades(Rc<RefCell<Vec<String>>>);

impl ScriptedUpgrades {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ran(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}

impl UpgradeRunner for ScriptedUpgrades {
    fn run_legacy_upgrade(&self) -> Result<(), MigrationError> {
        self.0.borrow_mut().push("legacy".to_string());
        Ok(())
    }

    fn run_versioned_upgrade(&self, from: &str) -> Result<(), MigrationError> {
        self.0.borrow_mut().push(format!("versioned:{from}"));
        Ok(())
    }

    fn run_network_versioned_upgrade(&self, from: &str) -> Result<(), MigrationError> {
        self.0.borrow_mut().push(format!("network:{from}"));
        Ok(())
    }
}

/// Migration runner whose versioned steps always fail.
#[derive(Clone, Default)]
pub struct FailingUpgrades;

impl FailingUpgrades {
    pub fn new() -> Self {
        Self
    }

    fn fail(from: &str, step: &str) -> MigrationError {
        MigrationError::StepFailed {
            from: from.to_string(),
            step: step.to_string(),
            reason: "simulated failure".to_string(),
        }
    }
}

impl UpgradeRunner for FailingUpgrades {
    fn run_legacy_upgrade(&self) -> Result<(), MigrationError> {
        Err(Self::fail("", "legacy"))
    }

    fn run_versioned_upgrade(&self, from: &str) -> Result<(), MigrationError> {
        Err(Self::fail(from, "versioned"))
    }

    fn run_network_versioned_upgrade(&self, from: &str) -> Result<(), MigrationError> {
        Err(Self::fail(from, "network"))
    }
}
