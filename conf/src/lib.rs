//! # Option Resolution
//!
//! Configuration-resolution core of the Fleetcache caching plugin.
//!
//! This crate provides:
//! - The default registry of typed setting definitions
//! - Layered resolution (defaults, persisted global values, network
//!   overrides, forced in-memory values) with a read-time constant overlay
//! - Version-gated migration with add-if-missing resync
//! - Change dispatch: typed coercion, persistence, and purge/cloud/crawler
//!   side effects on value changes
//!
//! # Best Practices
//!
//! - One explicitly constructed [`ConfService`] per process/request
//!   lifetime, passed by reference to consumers
//! - All configuration errors are absorbed: the fallback is always the
//!   last-known or default value
//! - Every rejection and forced override is logged via `tracing`

pub mod coerce;
pub mod env;
pub mod migrate;
pub mod registry;
pub mod resolver;
pub mod service;
pub mod update;

pub use coerce::{coerce, sanitize_lines};
pub use env::{const_name, EnvOverrides};
pub use registry::{ids, DefaultEntry, LineFilter, PurgePolicy, Registry, VAL_OFF, VAL_ON, VAL_ON2};
pub use resolver::CacheState;
pub use service::ConfService;
pub use update::BatchOutcome;

/// Current plugin schema version. Stored alongside options under
/// [`ids::VER`]; a mismatch drives the one-time migration pipeline.
pub const CORE_VER: &str = "4.1";
