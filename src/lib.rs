//! # `namekeeper`
//!
//! Unattended renewal of Handshake (HNS) names.
//!
//! ## Architecture
//!
//! Each cycle runs against a single wallet:
//! - **Inventory**: list owned names and normalize backend JSON into records
//! - **Policy**: turn days-until-expiry into RENEW, SKIP or ERROR per name
//! - **Executor**: submit renewals, isolating every name from the others
//! - **Report**: summarize the cycle and hand it to the operator channel
//!
//! ## Failure Model
//!
//! - Per-name problems are data in the report, never errors
//! - A wallet that cannot list names yields an error-only report
//! - Only an unlisted wallet whose report also fails to send is FATAL

#![forbid(unsafe_code)]
#![deny(clippy::all, rust_2018_idioms)]
#![warn(clippy::pedantic, clippy::nursery, missing_docs)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::future_not_send,
    clippy::too_many_lines,
    clippy::too_many_arguments,
    // Heights, balances and day counts are bounded
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_lossless,
    clippy::missing_const_for_fn,
    clippy::must_use_candidate,
    clippy::needless_pass_by_value,
    clippy::struct_field_names,
    clippy::match_same_arms
)]

pub mod client;
pub mod config;
pub mod cycle;
pub mod inventory;
pub mod notify;
pub mod renewal;
pub mod report;
pub mod types;

#[cfg(test)]
mod testing;

pub use client::{ClientError, HsdNodeClient, HsdWalletClient, NodeClient, WalletClient};
pub use config::{ConfigError, ConfigToml, KeeperConfig};
pub use cycle::{CycleOutcome, CycleRunner, StatusSummary};
pub use inventory::{InventoryUnavailable, NameInventory};
pub use notify::{DisabledNotifier, Notifier, NotifyError, TelegramNotifier};
pub use renewal::{
    DecisionOutcome, RenewalDecision, RenewalExecutor, RenewalResult, RenewalStatus,
};
pub use report::{CycleError, CycleReport, ExpiringName};
pub use types::{BalanceSnapshot, ChainSnapshot, NameRecord, NameState, WalletInfo};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
