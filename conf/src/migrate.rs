//! # Version Migrator
//!
//! State machine over the stored schema version: no version at all (fresh
//! install or pre-schema data), stale (older plugin wrote it), or current.
//!
//! Fresh installs and stale data are only migrated from an administrative
//! or CLI context; frontend requests run on pure defaults without touching
//! storage. Migration never marks the version current on partial failure:
//! the stored version stays put so the same pipeline retries on the next
//! qualifying load.

use fc_core::{SettingId, SettingScope, SettingValue};
use tracing::{info, warn};

use crate::registry::ids;
use crate::service::ConfService;
use crate::CORE_VER;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum VersionState {
    NoVersion,
    Stale(String),
    Current,
}

pub(crate) fn version_state(stored: Option<&str>) -> VersionState {
    match stored {
        None | Some("") => VersionState::NoVersion,
        Some(v) if v == CORE_VER => VersionState::Current,
        Some(v) => VersionState::Stale(v.to_string()),
    }
}

impl ConfService {
    /// Load the global layer and bring it to the current schema version,
    /// then overlay the network layer.
    pub(crate) fn conf_db_init(&mut self) {
        // Load before any upgrade step so the migrator never re-enters
        // resolution while reading its own inputs.
        self.load_options(None);

        let ver_id = SettingId::from(ids::VER);
        let stored = self
            .options
            .get(&ver_id)
            .and_then(|v| v.as_str().map(str::to_string));
        let state = version_state(stored.as_deref());

        if state != VersionState::Current && !self.env.admin_or_cli {
            // Frontend visit on unmigrated data: serve pure defaults for
            // this process only, persist nothing, migrate nothing.
            self.options = self.registry.defaults_map();
            self.try_load_site_options();
            return;
        }

        match state {
            VersionState::Current => {}
            VersionState::NoVersion => {
                info!("no stored schema version, running legacy conversion");
                match self.upgrades.run_legacy_upgrade() {
                    Ok(()) => self.resync_and_stamp(),
                    Err(err) => warn!("legacy upgrade incomplete, will retry: {err}"),
                }
            }
            VersionState::Stale(from) => {
                info!("schema version {from} is stale, upgrading to {CORE_VER}");
                match self.upgrades.run_versioned_upgrade(&from) {
                    Ok(()) => self.resync_and_stamp(),
                    Err(err) => warn!("upgrade from {from} incomplete, will retry: {err}"),
                }
            }
        }

        self.try_load_site_options();
    }

    /// Persist defaults for registry entries missing from storage (never
    /// overwriting an existing value), then stamp the current version.
    ///
    /// Any failed write leaves the version untouched: a stamped version
    /// means every default made it to storage.
    fn resync_and_stamp(&mut self) {
        let ver_id = SettingId::from(ids::VER);
        let mut complete = true;
        for entry in self.registry.entries() {
            if entry.id == ver_id {
                continue;
            }
            if let Err(err) =
                self.store
                    .add_if_missing(SettingScope::Global, &entry.id, &entry.default)
            {
                warn!("resync skipped {}: {err}", entry.id);
                complete = false;
            }
        }
        if !complete {
            warn!("resync incomplete, leaving schema version for retry");
            return;
        }

        let current = SettingValue::Str(CORE_VER.to_string());
        match self.store.set(SettingScope::Global, &ver_id, &current) {
            Ok(_) => {
                self.options.insert(ver_id, current);
            }
            Err(err) => warn!("could not stamp schema version, will retry: {err}"),
        }
    }

    /// Network-layer mirror of [`Self::conf_db_init`], with its own stored
    /// version and registry.
    pub(crate) fn conf_site_db_init(&mut self) {
        self.load_site_options();

        let ver_id = SettingId::from(ids::VER);
        let stored = self
            .site_options
            .get(&ver_id)
            .and_then(|v| v.as_str().map(str::to_string));
        let state = version_state(stored.as_deref());

        if state != VersionState::Current && !self.env.admin_or_cli {
            self.site_options = self.network_registry.defaults_map();
            return;
        }

        match state {
            VersionState::Current => {}
            VersionState::NoVersion => self.network_resync_and_stamp(),
            VersionState::Stale(from) => {
                info!("network schema version {from} is stale, upgrading to {CORE_VER}");
                match self.upgrades.run_network_versioned_upgrade(&from) {
                    Ok(()) => self.network_resync_and_stamp(),
                    Err(err) => {
                        warn!("network upgrade from {from} incomplete, will retry: {err}");
                    }
                }
            }
        }
    }

    fn network_resync_and_stamp(&mut self) {
        let ver_id = SettingId::from(ids::VER);
        let mut complete = true;
        for entry in self.network_registry.entries() {
            if entry.id == ver_id {
                continue;
            }
            if let Err(err) =
                self.store
                    .add_if_missing(SettingScope::Network, &entry.id, &entry.default)
            {
                warn!("network resync skipped {}: {err}", entry.id);
                complete = false;
            }
        }
        if !complete {
            warn!("network resync incomplete, leaving schema version for retry");
            return;
        }

        let current = SettingValue::Str(CORE_VER.to_string());
        match self.store.set(SettingScope::Network, &ver_id, &current) {
            Ok(_) => {
                self.site_options.insert(ver_id, current);
            }
            Err(err) => warn!("could not stamp network schema version, will retry: {err}"),
        }
    }
}
