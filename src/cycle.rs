//! One renewal cycle, end to end.
//!
//! ```text
//! INIT -> FETCH_INVENTORY -> EVALUATE -> EXECUTE -> REPORT -> NOTIFY -> DONE
//!              |                                                 ^
//!              +---------------- error-only report --------------+
//! ```
//!
//! The only way a cycle ends FATAL is an inventory failure whose error report
//! could not be delivered either. Everything else, including a failed
//! notification after a normal cycle, is DONE.

use std::fmt::Write as _;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::client::{with_deadline, ClientError, NodeClient, WalletClient};
use crate::config::KeeperConfig;
use crate::inventory::{InventoryUnavailable, NameInventory};
use crate::notify::{Notifier, NotifyError};
use crate::renewal::{evaluate, RenewalExecutor};
use crate::report::{CycleReport, ExpiringName};
use crate::types::{self, BalanceSnapshot, ChainSnapshot, Timestamp, WalletInfo};

/// How a cycle ended
#[derive(Debug)]
pub enum CycleOutcome {
    /// Cycle completed; `notified` says whether the report was delivered
    Done {
        /// Report for the cycle
        report: CycleReport,
        /// Whether the notifier accepted the report
        notified: bool,
    },
    /// Inventory failed and the operator could not be told
    Fatal {
        /// Error-only report that failed to send
        report: CycleReport,
        /// Why the inventory was unavailable
        inventory: InventoryUnavailable,
        /// Why the notification failed
        notify: NotifyError,
    },
}

impl CycleOutcome {
    /// Report produced by the cycle
    #[must_use]
    pub fn report(&self) -> &CycleReport {
        match self {
            Self::Done { report, .. } | Self::Fatal { report, .. } => report,
        }
    }

    /// Whether the cycle ended FATAL
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }

    /// Process exit code: 0 on DONE, 1 on FATAL
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(self.is_fatal())
    }
}

/// Wallet summary for the `status` command
#[derive(Clone, Debug, PartialEq)]
pub struct StatusSummary {
    /// Wallet id
    pub wallet_id: String,
    /// Chain height, if the node answered
    pub chain_height: Option<u64>,
    /// Balance, if the wallet answered
    pub balance: Option<BalanceSnapshot>,
    /// Shortened receive address
    pub receive_address: Option<String>,
    /// Owned name closest to expiry
    pub soonest_expiring: Option<ExpiringName>,
}

impl StatusSummary {
    /// Render as plain text
    #[must_use]
    pub fn render(&self) -> String {
        let unknown = || "unknown".to_string();
        let mut out = String::new();
        let _ = writeln!(out, "Wallet: {}", self.wallet_id);
        let _ = writeln!(
            out,
            "Current Handshake block: {}",
            self.chain_height.map_or_else(unknown, |h| h.to_string())
        );
        let _ = writeln!(
            out,
            "HNS balance: {}",
            self.balance
                .map_or_else(unknown, |b| format!("{:.2}", b.spendable_hns()))
        );
        let _ = writeln!(
            out,
            "Receive address: {}",
            self.receive_address.clone().unwrap_or_else(unknown)
        );
        match &self.soonest_expiring {
            Some(n) => {
                let _ = writeln!(
                    out,
                    "Soonest expiring: {} in {:.1} days",
                    n.name, n.days_remaining
                );
            }
            None => {
                let _ = writeln!(out, "Soonest expiring: none");
            }
        }
        out
    }
}

/// Runs renewal cycles against one wallet
pub struct CycleRunner {
    wallet: Arc<dyn WalletClient>,
    node: Arc<dyn NodeClient>,
    notifier: Arc<dyn Notifier>,
    config: KeeperConfig,
}

impl CycleRunner {
    /// Create a runner
    #[must_use]
    pub fn new(
        wallet: Arc<dyn WalletClient>,
        node: Arc<dyn NodeClient>,
        notifier: Arc<dyn Notifier>,
        config: KeeperConfig,
    ) -> Self {
        Self {
            wallet,
            node,
            notifier,
            config,
        }
    }

    /// Configuration this runner was built with
    #[must_use]
    pub fn config(&self) -> &KeeperConfig {
        &self.config
    }

    /// Confirm the configured wallet exists on the backend
    pub async fn check_wallet(&self) -> Result<WalletInfo, ClientError> {
        with_deadline(self.config.executor.call_timeout, self.wallet.wallet_info()).await
    }

    /// Run one cycle now
    pub async fn run(&self) -> CycleOutcome {
        self.run_at(types::now()).await
    }

    /// Run one cycle with `now` as the snapshot time
    pub async fn run_at(&self, now: Timestamp) -> CycleOutcome {
        let wallet_id = self.config.wallet_id.as_str();
        info!(wallet = %wallet_id, "Starting renewal cycle");

        // INIT: one snapshot for the whole cycle
        let chain_height = self.chain_height().await;
        let snap = ChainSnapshot::new(chain_height, now, self.config.seconds_per_block);
        let balance = self.balance().await;

        // FETCH_INVENTORY
        let inventory = NameInventory::new(
            self.config.expiry_basis,
            self.config.executor.call_timeout,
        );
        let records = match inventory.fetch(self.wallet.as_ref(), now).await {
            Ok(records) => records,
            Err(e) => {
                error!(wallet = %wallet_id, "Cannot list names: {}", e);
                let report = CycleReport::inventory_failure(
                    now,
                    wallet_id,
                    chain_height,
                    e.to_string(),
                    balance,
                );
                return match self.notifier.send(&report.render()).await {
                    Ok(()) => CycleOutcome::Done {
                        report,
                        notified: true,
                    },
                    Err(notify) => {
                        error!("Inventory failure could not be reported: {}", notify);
                        CycleOutcome::Fatal {
                            report,
                            inventory: e,
                            notify,
                        }
                    }
                };
            }
        };

        // EVALUATE
        let decisions = evaluate(&records, &snap, self.config.renewal_threshold_days);
        let soonest = ExpiringName::soonest(&records, &snap);

        // EXECUTE
        let executor = RenewalExecutor::new(Arc::clone(&self.wallet), self.config.executor);
        let results = executor.execute(&decisions).await;

        // REPORT
        let report = CycleReport::assemble(
            now,
            wallet_id,
            chain_height,
            decisions,
            results,
            balance,
            soonest,
        );
        info!(
            total = report.total_names,
            renewed = report.renewed.len(),
            skipped = report.skipped.len(),
            errors = report.errors.len(),
            "Cycle complete"
        );

        // NOTIFY
        let notified = match self.notifier.send(&report.render()).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Cycle report not delivered: {}", e);
                false
            }
        };

        CycleOutcome::Done { report, notified }
    }

    /// Gather the status summary now
    pub async fn status(&self) -> StatusSummary {
        self.status_at(types::now()).await
    }

    /// Gather the status summary with `now` as the snapshot time
    pub async fn status_at(&self, now: Timestamp) -> StatusSummary {
        let chain_height = self.chain_height().await;
        let snap = ChainSnapshot::new(chain_height, now, self.config.seconds_per_block);
        let balance = self.balance().await;

        let receive_address = match self.check_wallet().await {
            Ok(info) => info.short_address(),
            Err(e) => {
                warn!("Wallet info unavailable: {}", e);
                None
            }
        };

        let inventory = NameInventory::new(
            self.config.expiry_basis,
            self.config.executor.call_timeout,
        );
        let soonest_expiring = match inventory.fetch(self.wallet.as_ref(), now).await {
            Ok(records) => ExpiringName::soonest(&records, &snap),
            Err(e) => {
                warn!("{}", e);
                None
            }
        };

        StatusSummary {
            wallet_id: self.config.wallet_id.clone(),
            chain_height,
            balance,
            receive_address,
            soonest_expiring,
        }
    }

    async fn chain_height(&self) -> Option<u64> {
        match with_deadline(self.config.executor.call_timeout, self.node.chain_height()).await {
            Ok(height) => Some(height),
            Err(e) => {
                warn!("Chain height unavailable: {}", e);
                None
            }
        }
    }

    async fn balance(&self) -> Option<BalanceSnapshot> {
        match with_deadline(self.config.executor.call_timeout, self.wallet.balance()).await {
            Ok(balance) => Some(balance),
            Err(e) => {
                warn!("Wallet balance unavailable: {}", e);
                None
            }
        }
    }
}
