//! # Change Dispatcher
//!
//! The write path: validate and coerce one raw value, persist it, compare
//! against the previous effective value, and emit the configured side
//! effects (cloud reset, crawler map reset, purge instructions) when the
//! value actually changed. The in-memory effective value is refreshed
//! unconditionally so reads in the same process see the write immediately.

use errors::ConfError;
use fc_core::{
    CloudBridge, CrawlerMap, PurgeSink, RawValue, SettingId, SettingScope, SettingValue,
};
use tracing::{debug, warn};

use crate::coerce::coerce;
use crate::registry::{ids, DefaultEntry, PurgePolicy};
use crate::service::ConfService;

/// Aggregate result of a batch update.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub applied: Vec<SettingId>,
    pub rejected: Vec<(SettingId, ConfError)>,
}

impl BatchOutcome {
    pub fn ok(&self) -> bool {
        self.rejected.is_empty()
    }
}

impl ConfService {
    /// Validate, coerce and persist one setting, dispatching side effects
    /// on change.
    ///
    /// Rejections (reserved key, unknown id, failed validation) are logged
    /// and leave the prior effective value untouched; they surface as `Err`
    /// only so the batch surface can report them per id. A persistence
    /// failure is a silently dropped write.
    pub fn update(&mut self, id: &SettingId, raw: RawValue) -> Result<(), ConfError> {
        if id.as_str() == ids::VER {
            debug!("refusing write to reserved key {id}");
            return Err(ConfError::ReservedSettingId { id: id.to_string() });
        }
        let Some(entry) = self.registry.get(id) else {
            debug!("invalid option ID {id}");
            return Err(ConfError::UnknownSettingId { id: id.to_string() });
        };

        // A secret rendered back from a form arrives as its own mask; that
        // is "unchanged", not a new value.
        if entry.secret && is_masked(&raw) {
            debug!("masked value for {id}, keeping stored secret");
            return Ok(());
        }

        let value = coerce(entry, raw).inspect_err(|err| debug!("{err}"))?;

        if let Err(err) = self.store.set(SettingScope::Global, id, &value) {
            warn!("dropped write for {id}: {err}");
            return Ok(());
        }

        // The in-memory value may have been force-overridden, so the stored
        // comparison baseline is whatever this process currently sees.
        let old = self.options.get(id);
        if old != Some(&value) {
            dispatch_change(
                self.purge.as_ref(),
                self.cloud.as_ref(),
                self.crawler.as_ref(),
                entry,
                old,
                &value,
            );
        }

        self.options.insert(id.clone(), value);
        Ok(())
    }

    /// Network-scope variant of [`Self::update`]. Only purge-all policies
    /// fire here, and the new value is mirrored into the local effective
    /// set when that id is tracked locally.
    pub fn network_update(&mut self, id: &SettingId, raw: RawValue) -> Result<(), ConfError> {
        if id.as_str() == ids::VER {
            debug!("refusing write to reserved network key {id}");
            return Err(ConfError::ReservedSettingId { id: id.to_string() });
        }
        let Some(entry) = self.network_registry.get(id) else {
            debug!("invalid network option ID {id}");
            return Err(ConfError::UnknownSettingId { id: id.to_string() });
        };

        if entry.secret && is_masked(&raw) {
            debug!("masked value for network {id}, keeping stored secret");
            return Ok(());
        }

        let value = coerce(entry, raw).inspect_err(|err| debug!("{err}"))?;

        if let Err(err) = self.store.set(SettingScope::Network, id, &value) {
            warn!("dropped network write for {id}: {err}");
            return Ok(());
        }

        if self.site_options.get(id) != Some(&value) && matches!(entry.purge, PurgePolicy::All) {
            self.purge
                .purge_all(&format!("network conf changed [id] {id}"));
        }

        self.site_options.insert(id.clone(), value.clone());
        if self.options.contains_key(id) {
            self.options.insert(id.clone(), value);
        }
        Ok(())
    }

    /// Run a whole id-to-value mapping through the update pipeline, then
    /// notify after-update callbacks with the applied pairs.
    pub fn update_confs(&mut self, matrix: Vec<(SettingId, RawValue)>) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let mut applied_pairs = Vec::new();

        for (id, raw) in matrix {
            match self.update(&id, raw.clone()) {
                Ok(()) => {
                    applied_pairs.push((id.clone(), raw));
                    outcome.applied.push(id);
                }
                Err(err) => outcome.rejected.push((id, err)),
            }
        }

        for cb in &self.after_update {
            cb(&applied_pairs);
        }

        outcome
    }
}

fn is_masked(raw: &RawValue) -> bool {
    match raw {
        RawValue::Str(s) => !s.is_empty() && s.chars().all(|c| c == '*'),
        _ => false,
    }
}

/// Emit the side effects configured for a changed entry.
fn dispatch_change(
    purge: &dyn PurgeSink,
    cloud: &dyn CloudBridge,
    crawler: &dyn CrawlerMap,
    entry: &DefaultEntry,
    old: Option<&SettingValue>,
    new: &SettingValue,
) {
    // Rotating the cloud API key invalidates every provisioned node.
    if entry.id.as_str() == ids::CLOUD_API_KEY {
        cloud.clear_cloud_state();
    }

    // The crawl map is domain-shaped; changing domain handling voids it.
    if entry.id.as_str() == ids::CRAWLER_DROP_DOMAIN {
        crawler.reset_map();
    }

    match entry.purge {
        PurgePolicy::None => {}
        PurgePolicy::Urls => {
            let empty = Vec::new();
            let old_list = old.and_then(SettingValue::as_list).unwrap_or(&empty);
            let new_list = new.as_list().unwrap_or(&empty);
            for item in symmetric_diff(old_list, new_list) {
                let path = item.trim_start_matches('^').trim_end_matches('$');
                purge.purge_url(path);
            }
        }
        PurgePolicy::All => {
            purge.purge_all(&format!("conf changed [id] {}", entry.id));
        }
        PurgePolicy::Tag(tag) => {
            purge.purge_by_tag(tag);
        }
    }
}

/// Entries in exactly one of the two lists: new-only first, then old-only.
fn symmetric_diff<'a>(old: &'a [String], new: &'a [String]) -> Vec<&'a str> {
    let mut diff: Vec<&str> = new
        .iter()
        .filter(|v| !old.contains(v))
        .map(String::as_str)
        .collect();
    diff.extend(
        old.iter()
            .filter(|v| !new.contains(v))
            .map(String::as_str),
    );
    diff
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetric_diff_orders_new_then_old() {
        let old = vec!["a".to_string(), "b".to_string()];
        let new = vec!["a".to_string(), "c".to_string()];
        assert_eq!(symmetric_diff(&old, &new), vec!["c", "b"]);
    }

    #[test]
    fn masked_detection() {
        assert!(is_masked(&RawValue::from("****")));
        assert!(!is_masked(&RawValue::from("")));
        assert!(!is_masked(&RawValue::from("**x*")));
        assert!(!is_masked(&RawValue::Int(1)));
    }
}
