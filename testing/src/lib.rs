//! Shared test fixtures for the Fleetcache workspace.
//!
//! Provides in-memory, single-threaded stand-ins for every collaborator the
//! configuration core talks to: a scoped key-value store, recording purge /
//! cloud / crawler sinks, and scriptable migration runners.
//!
//! All fixtures are cheap `Rc` handles: clone one before boxing it into the
//! service and inspect it afterwards.

mod fixtures;

pub use fixtures::*;
