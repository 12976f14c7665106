//! Chain and wallet state captured at the start of a cycle.

use serde::{Deserialize, Serialize};

use super::Timestamp;

/// Base units per whole HNS
pub const DOLLARYDOOS_PER_HNS: f64 = 1_000_000.0;

/// Consistent view of the chain for one cycle.
///
/// Taken once before evaluation and never refreshed mid-cycle, so every name
/// is judged against the same height and time.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    /// Current chain height, if the node answered
    pub current_height: Option<u64>,
    /// Wall-clock time of the snapshot
    pub current_time: Timestamp,
    /// Estimated average block interval
    pub seconds_per_block: f64,
}

impl ChainSnapshot {
    /// Create a snapshot
    #[must_use]
    pub fn new(current_height: Option<u64>, current_time: Timestamp, seconds_per_block: f64) -> Self {
        Self {
            current_height,
            current_time,
            seconds_per_block,
        }
    }
}

/// Wallet balance as reported by the wallet backend, in dollarydoos
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    /// Confirmed balance
    pub confirmed: i64,
    /// Unconfirmed balance (includes confirmed)
    pub unconfirmed: i64,
    /// Confirmed coins locked in name auctions
    pub locked_confirmed: i64,
    /// Unconfirmed coins locked in name auctions
    pub locked_unconfirmed: i64,
}

impl BalanceSnapshot {
    /// Spendable balance in whole HNS
    #[must_use]
    pub fn spendable_hns(&self) -> f64 {
        (self.unconfirmed - self.locked_unconfirmed) as f64 / DOLLARYDOOS_PER_HNS
    }
}

/// Wallet metadata needed by the status report
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletInfo {
    /// Wallet id on the backend
    pub id: String,
    /// Current receive address of the configured account
    pub receive_address: Option<String>,
}

impl WalletInfo {
    /// Receive address shortened for chat output (`hs1qmock...456789`)
    #[must_use]
    pub fn short_address(&self) -> Option<String> {
        let addr = self.receive_address.as_deref()?;
        if addr.len() <= 14 || !addr.is_ascii() {
            return Some(addr.to_string());
        }
        Some(format!("{}...{}", &addr[..8], &addr[addr.len() - 6..]))
    }
}
