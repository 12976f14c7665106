//! Days-remaining computation.
//!
//! Time-based expiry is exact. Height-based expiry is an estimate: the block
//! distance is converted to seconds with the snapshot's average block
//! interval. Results may be negative for names that have already lapsed and
//! are never clamped.

use crate::types::{ChainSnapshot, NameRecord, SECONDS_PER_DAY};

/// Why days remaining could not be computed
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ExpiryError {
    /// Neither expiry height nor expiry time is known
    #[error("missing expiry data")]
    MissingExpiryData,
    /// Height-based expiry but the node did not report a chain height
    #[error("chain height unavailable")]
    ChainHeightUnavailable,
}

/// Days until `record` lapses, measured against `snap`
pub fn days_remaining(record: &NameRecord, snap: &ChainSnapshot) -> Result<f64, ExpiryError> {
    if let Some(expiry_time) = record.expiry_time {
        let seconds = (expiry_time - snap.current_time).num_milliseconds() as f64 / 1000.0;
        return Ok(seconds / SECONDS_PER_DAY);
    }

    if let Some(expiry_height) = record.expiry_height {
        let current = snap
            .current_height
            .ok_or(ExpiryError::ChainHeightUnavailable)?;
        let blocks = i128::from(expiry_height) - i128::from(current);
        return Ok(blocks as f64 * snap.seconds_per_block / SECONDS_PER_DAY);
    }

    Err(ExpiryError::MissingExpiryData)
}
