//! # Environment Overrides
//!
//! Every environment signal the resolver recognizes, gathered into one
//! explicit struct at boot instead of scattered global constant lookups.
//!
//! # Naming Convention
//! - `FC_CONF`: constant overlay enabled (per-id shadows are honored)
//! - `FC_CONF__<ID>`: per-id shadow value, id uppercased with `.`/`-`
//!   mangled to `_` (e.g. `FC_CONF__TTL_PUB`)
//! - `FC_NETWORK`: multi-tenant deployment mode
//! - `FC_NETWORK_ACTIVATED`: plugin activated at the network level
//! - `FC_ADMIN_CLI`: administrative or CLI context (fresh installs migrate
//!   and persist only in this context)
//! - `FC_SERVER_ALLOWED`: host server permits caching
//! - `FC_ADV_CACHE`: advanced-cache handshake detected
//! - `FC_PRIMARY_SITE`: primary site id for `use primary config`

use std::collections::HashMap;
use std::env;

use fc_core::{SettingId, SiteId};

use crate::registry::Registry;

/// Environment-level signals, fixed for the process lifetime.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    /// Honor per-id constant shadows at read time.
    pub constants_enabled: bool,
    /// Multi-tenant deployment.
    pub network_mode: bool,
    /// Plugin activated network-wide (a network option layer exists).
    pub network_activated: bool,
    /// Administrative or CLI context; gates migration and fresh-install
    /// persistence.
    pub admin_or_cli: bool,
    /// The host server permits caching regardless of cloud state.
    pub server_allowed: bool,
    /// An advanced-cache handshake was detected by the host environment.
    pub adv_cache_detected: bool,
    /// Primary site, read when the network selects "use primary config".
    pub primary_site: SiteId,

    /// Per-id raw shadow values, keyed by setting id.
    pub shadows: HashMap<SettingId, String>,
}

impl EnvOverrides {
    /// Gather all recognized signals from the process environment. Per-id
    /// shadows are scanned for every id in `registry`, but only honored
    /// when `FC_CONF` is set.
    pub fn from_env(registry: &Registry) -> Self {
        let mut overrides = Self {
            constants_enabled: flag("FC_CONF"),
            network_mode: flag("FC_NETWORK"),
            network_activated: flag("FC_NETWORK_ACTIVATED"),
            admin_or_cli: flag("FC_ADMIN_CLI"),
            server_allowed: flag("FC_SERVER_ALLOWED"),
            adv_cache_detected: flag("FC_ADV_CACHE"),
            primary_site: SiteId(
                env::var("FC_PRIMARY_SITE")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1),
            ),
            shadows: HashMap::new(),
        };

        if overrides.constants_enabled {
            for entry in registry.entries() {
                if let Ok(raw) = env::var(const_name(&entry.id)) {
                    overrides.shadows.insert(entry.id.clone(), raw);
                }
            }
        }

        overrides
    }

    /// Raw shadow value for one id, if its constant is defined.
    pub fn shadow(&self, id: &SettingId) -> Option<&str> {
        self.shadows.get(id).map(String::as_str)
    }

    /// Test/bootstrap helper: inject a shadow directly.
    pub fn with_shadow(mut self, id: &str, raw: &str) -> Self {
        self.shadows.insert(SettingId::from(id), raw.to_string());
        self
    }
}

/// Mangled constant name for one setting id.
pub fn const_name(id: &SettingId) -> String {
    let mangled: String = id
        .as_str()
        .chars()
        .map(|c| match c {
            '.' | '-' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect();
    format!("FC_CONF__{mangled}")
}

fn flag(name: &str) -> bool {
    match env::var(name) {
        Ok(v) => {
            let v = v.trim().to_ascii_lowercase();
            !(v.is_empty() || v == "0" || v == "false")
        }
        Err(_) => false,
    }
}
