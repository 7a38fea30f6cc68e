//! # Fleetcache Core
//!
//! Shared types and collaborator traits for the configuration-resolution
//! core of the Fleetcache caching plugin.
//!
//! This crate defines:
//! - The tagged value union carried by every setting (`SettingValue`)
//! - The uncoerced input side of the update pipeline (`RawValue`)
//! - Identifiers and scopes (`SettingId`, `SettingScope`, `SiteId`)
//! - Narrow interfaces to external collaborators (persistence, purge,
//!   cloud, crawler map, migration)
//!
//! The execution model is single-threaded and synchronous: one effective
//! option set per process/request lifetime, no retries, no cancellation.

pub mod traits;
pub mod types;

pub use traits::{CloudBridge, CrawlerMap, PurgeSink, SettingsStore, UpgradeRunner};
pub use types::{RawValue, SettingId, SettingScope, SettingValue, SiteId};
