//! Core types for namekeeper.
//!
//! Everything in here is rebuilt from live backend state once per cycle.
//! Nothing is persisted between cycles.

pub mod chain;
pub mod name;

pub use chain::{BalanceSnapshot, ChainSnapshot, WalletInfo, DOLLARYDOOS_PER_HNS};
pub use name::{NameRecord, NameState};

use chrono::{DateTime, Utc};

/// Wall-clock timestamp (UTC)
pub type Timestamp = DateTime<Utc>;

/// Seconds in one day
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Get current time
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}
