//! # Fleetcache Errors
//!
//! Error taxonomy for the configuration-resolution core.
//!
//! Every error here is locally absorbed by the service boundary: a
//! configuration problem never aborts a request. The variants exist so that
//! rejections can be logged with structure and reported per-id by the batch
//! update surface.

use thiserror::Error;

/// Option update / resolution errors
#[derive(Debug, Error)]
pub enum ConfError {
    #[error("Unknown setting ID: {id}")]
    UnknownSettingId { id: String },

    #[error("Setting ID is reserved: {id}")]
    ReservedSettingId { id: String },

    #[error("Value rejected for {id}: {reason}")]
    ValidationRejected { id: String, reason: String },
}

/// Persistence adapter errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable for {scope} key {id}: {reason}")]
    Unavailable {
        scope: String,
        id: String,
        reason: String,
    },
}

/// Version migration errors
///
/// A failed step must leave the stored schema version untouched so the same
/// pipeline retries on the next admin/CLI-context load.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Upgrade step {step} from version {from} failed: {reason}")]
    StepFailed {
        from: String,
        step: String,
        reason: String,
    },
}
