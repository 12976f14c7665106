//! Cycle report.
//!
//! One report per cycle, built from the decisions and results of that cycle
//! and rendered to plain text for the operator channel.

use std::fmt::Write as _;

use serde::Serialize;

use crate::renewal::{days_remaining, DecisionOutcome, RenewalDecision, RenewalResult};
use crate::types::{BalanceSnapshot, ChainSnapshot, NameRecord, Timestamp};

/// A name and how long it has left
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExpiringName {
    /// Name
    pub name: String,
    /// Days until expiry at snapshot time
    pub days_remaining: f64,
}

impl ExpiringName {
    /// Owned name with the fewest days left; ties go to the first listed
    #[must_use]
    pub fn soonest(records: &[NameRecord], snap: &ChainSnapshot) -> Option<Self> {
        records
            .iter()
            .filter(|r| r.state.is_owned())
            .filter_map(|r| {
                days_remaining(r, snap)
                    .ok()
                    .filter(|d| !d.is_nan())
                    .map(|d| (r, d))
            })
            .fold(None, |best: Option<(&NameRecord, f64)>, (r, d)| match best {
                Some((_, best_days)) if best_days <= d => best,
                _ => Some((r, d)),
            })
            .map(|(r, d)| Self {
                name: r.name.clone(),
                days_remaining: d,
            })
    }
}

/// Something that went wrong in a cycle
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CycleError {
    /// Policy could not decide for a name
    Decision(RenewalDecision),
    /// Renewal was attempted and did not go out
    Renewal(RenewalResult),
    /// The wallet could not list names at all
    Inventory {
        /// Backend error text
        message: String,
    },
}

impl CycleError {
    /// Name the error refers to, if any
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Decision(d) => Some(&d.name),
            Self::Renewal(r) => Some(&r.name),
            Self::Inventory { .. } => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Decision(d) => format!("{}: {}", d.name, d.reason),
            Self::Renewal(r) => format!("{}: {} ({})", r.name, r.status, r.detail),
            Self::Inventory { message } => message.clone(),
        }
    }
}

/// Outcome of one cycle
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CycleReport {
    /// When the cycle's snapshot was taken
    pub timestamp: Timestamp,
    /// Wallet the cycle ran against
    pub wallet_id: String,
    /// Chain height at snapshot time
    pub chain_height: Option<u64>,
    /// Names in the inventory after normalization
    pub total_names: usize,
    /// Renewals that went out
    pub renewed: Vec<RenewalResult>,
    /// Names left alone
    pub skipped: Vec<RenewalDecision>,
    /// Per-name failures, or the inventory failure
    pub errors: Vec<CycleError>,
    /// Wallet balance, when the backend answered
    pub wallet_balance: Option<BalanceSnapshot>,
    /// Owned name closest to expiry
    pub soonest_expiring: Option<ExpiringName>,
}

impl CycleReport {
    /// Build the report for a cycle whose inventory fetch succeeded.
    ///
    /// Every decision ends up in exactly one of `renewed`, `skipped` or
    /// `errors`, so their lengths sum to `total_names`.
    #[must_use]
    pub fn assemble(
        timestamp: Timestamp,
        wallet_id: impl Into<String>,
        chain_height: Option<u64>,
        decisions: Vec<RenewalDecision>,
        results: Vec<RenewalResult>,
        wallet_balance: Option<BalanceSnapshot>,
        soonest_expiring: Option<ExpiringName>,
    ) -> Self {
        let total_names = decisions.len();

        let mut skipped = Vec::new();
        let mut errors = Vec::new();
        for decision in decisions {
            match decision.outcome {
                DecisionOutcome::Skip => skipped.push(decision),
                DecisionOutcome::Error => errors.push(CycleError::Decision(decision)),
                DecisionOutcome::Renew => {}
            }
        }

        let mut renewed = Vec::new();
        for result in results {
            if result.is_submitted() {
                renewed.push(result);
            } else {
                errors.push(CycleError::Renewal(result));
            }
        }

        Self {
            timestamp,
            wallet_id: wallet_id.into(),
            chain_height,
            total_names,
            renewed,
            skipped,
            errors,
            wallet_balance,
            soonest_expiring,
        }
    }

    /// Error-only report for a cycle that could not list names
    #[must_use]
    pub fn inventory_failure(
        timestamp: Timestamp,
        wallet_id: impl Into<String>,
        chain_height: Option<u64>,
        message: impl Into<String>,
        wallet_balance: Option<BalanceSnapshot>,
    ) -> Self {
        Self {
            timestamp,
            wallet_id: wallet_id.into(),
            chain_height,
            total_names: 0,
            renewed: Vec::new(),
            skipped: Vec::new(),
            errors: vec![CycleError::Inventory {
                message: message.into(),
            }],
            wallet_balance,
            soonest_expiring: None,
        }
    }

    /// Whether the inventory fetch failed
    #[must_use]
    pub fn is_inventory_failure(&self) -> bool {
        self.errors
            .iter()
            .any(|e| matches!(e, CycleError::Inventory { .. }))
    }

    /// Render for the operator channel
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let height = self
            .chain_height
            .map_or_else(|| "unknown".to_string(), |h| h.to_string());

        if self.is_inventory_failure() {
            let _ = writeln!(out, "Wallet {}: renewal check failed", self.wallet_id);
            for error in &self.errors {
                let _ = writeln!(out, "{}", error.describe());
            }
            return out;
        }

        let _ = writeln!(out, "Wallet {} at Handshake block {}", self.wallet_id, height);
        if let Some(balance) = &self.wallet_balance {
            let _ = writeln!(out, "HNS balance: {:.2}", balance.spendable_hns());
        }

        let attempted = self.renewed.len()
            + self
                .errors
                .iter()
                .filter(|e| matches!(e, CycleError::Renewal(_)))
                .count();
        if attempted == 0 {
            let _ = writeln!(out, "No names to renew at block {height}");
        } else if !self.renewed.is_empty() {
            let _ = writeln!(out, "Renewed {} name(s):", self.renewed.len());
            for result in &self.renewed {
                let tx = result.transaction_id.as_deref().unwrap_or("-");
                let _ = writeln!(out, "  {} (tx {})", result.name, tx);
            }
        }

        if !self.errors.is_empty() {
            let _ = writeln!(out, "Failed {} name(s):", self.errors.len());
            for error in &self.errors {
                let _ = writeln!(out, "  {}", error.describe());
            }
        }

        let _ = writeln!(out, "Skipped {} of {} name(s)", self.skipped.len(), self.total_names);

        if let Some(soonest) = &self.soonest_expiring {
            let _ = writeln!(
                out,
                "Soonest expiring: {} in {:.1} days",
                soonest.name, soonest.days_remaining
            );
        }

        out
    }
}
