//! Renewal decision-and-execution engine.
//!
//! ## Pipeline
//!
//! 1. [`expiry`] turns a name's expiry height or time into days remaining,
//!    measured against one [`ChainSnapshot`](crate::types::ChainSnapshot)
//! 2. [`policy`] compares that against the threshold: RENEW, SKIP or ERROR
//! 3. [`executor`] submits a renewal for every RENEW decision, isolating
//!    each name so one failure never blocks the others
//!
//! Decisions and results are plain data. Per-name problems never surface as
//! `Err` past the executor; they end up in the cycle report.

pub mod executor;
pub mod expiry;
pub mod policy;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use executor::RenewalExecutor;
pub use expiry::{days_remaining, ExpiryError};
pub use policy::{decide, evaluate};

/// What to do with a name this cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionOutcome {
    /// Submit a renewal
    Renew,
    /// Leave it alone
    Skip,
    /// Could not decide
    Error,
}

impl fmt::Display for DecisionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Renew => "RENEW",
            Self::Skip => "SKIP",
            Self::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// Per-name decision, recomputed every cycle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenewalDecision {
    /// Name
    pub name: String,
    /// Decision
    pub outcome: DecisionOutcome,
    /// Days until expiry, if it could be computed
    pub days_remaining: Option<f64>,
    /// Human-readable reason
    pub reason: String,
}

impl RenewalDecision {
    /// Whether this decision asks for a renewal
    #[must_use]
    pub fn is_renew(&self) -> bool {
        self.outcome == DecisionOutcome::Renew
    }
}

/// Outcome of one renewal submission
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenewalStatus {
    /// Transaction accepted and broadcast
    Submitted,
    /// Backend refused; definitive, not retried
    Rejected,
    /// Backend unreachable, timed out or answered garbage
    NetworkError,
}

impl fmt::Display for RenewalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Submitted => "submitted",
            Self::Rejected => "rejected",
            Self::NetworkError => "network error",
        };
        f.write_str(s)
    }
}

/// Per-name renewal result
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewalResult {
    /// Name
    pub name: String,
    /// Outcome
    pub status: RenewalStatus,
    /// Backend message or error text
    pub detail: String,
    /// Transaction hash when submitted
    pub transaction_id: Option<String>,
    /// Calls made, including the retry
    pub attempts: u32,
}

impl RenewalResult {
    /// Whether the renewal went out
    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.status == RenewalStatus::Submitted
    }
}
