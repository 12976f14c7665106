//! Renewal submission.
//!
//! Every RENEW decision gets its own isolated call: a rejection, timeout or
//! garbage response becomes a [`RenewalResult`] for that name and processing
//! continues with the next one. Transient failures (network, timeout) are
//! retried at most `retry_count` times after `retry_delay`; rejections are
//! final.
//!
//! Renewals run sequentially unless `max_concurrent > 1`, in which case a
//! semaphore caps the number in flight. Results always come back in input
//! order, never completion order.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use super::{RenewalDecision, RenewalResult, RenewalStatus};
use crate::client::{with_deadline, ClientError, WalletClient};
use crate::config::ExecutorConfig;

/// Submits renewals for RENEW decisions
pub struct RenewalExecutor {
    wallet: Arc<dyn WalletClient>,
    config: ExecutorConfig,
}

impl RenewalExecutor {
    /// Create an executor
    #[must_use]
    pub fn new(wallet: Arc<dyn WalletClient>, config: ExecutorConfig) -> Self {
        Self { wallet, config }
    }

    /// Submit a renewal for every RENEW decision.
    ///
    /// Returns one result per RENEW decision, in input order. Never fails.
    pub async fn execute(&self, decisions: &[RenewalDecision]) -> Vec<RenewalResult> {
        let names: Vec<String> = decisions
            .iter()
            .filter(|d| d.is_renew())
            .map(|d| d.name.clone())
            .collect();

        if names.is_empty() {
            return Vec::new();
        }

        info!(
            count = names.len(),
            concurrency = self.config.max_concurrent,
            "Submitting renewals"
        );

        if self.config.max_concurrent <= 1 {
            let mut results = Vec::with_capacity(names.len());
            for name in &names {
                results.push(renew_one(self.wallet.as_ref(), name, self.config).await);
            }
            results
        } else {
            self.execute_bounded(names).await
        }
    }

    async fn execute_bounded(&self, names: Vec<String>) -> Vec<RenewalResult> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent));
        let mut handles = Vec::with_capacity(names.len());

        for name in &names {
            let wallet = Arc::clone(&self.wallet);
            let semaphore = Arc::clone(&semaphore);
            let config = self.config;
            let name = name.clone();
            handles.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return failed(&name, RenewalStatus::NetworkError, "executor shut down", 0)
                    }
                };
                renew_one(wallet.as_ref(), &name, config).await
            }));
        }

        // Awaiting in spawn order keeps one slot per name in input order
        let mut results = Vec::with_capacity(handles.len());
        for (name, handle) in names.iter().zip(handles) {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    error!(name = %name, "Renewal task failed: {}", e);
                    failed(
                        name,
                        RenewalStatus::NetworkError,
                        &format!("renewal task failed: {e}"),
                        0,
                    )
                }
            };
            results.push(result);
        }
        results
    }
}

/// Renew one name with timeout and bounded retry
async fn renew_one(wallet: &dyn WalletClient, name: &str, config: ExecutorConfig) -> RenewalResult {
    let max_attempts = 1 + config.retry_count;
    let mut attempt = 0;

    loop {
        attempt += 1;

        match with_deadline(config.call_timeout, wallet.renew(name)).await {
            Ok(receipt) => {
                info!(name = %name, tx = %receipt.transaction_id, attempt, "Renewal submitted");
                return RenewalResult {
                    name: name.to_string(),
                    status: RenewalStatus::Submitted,
                    detail: "renewal broadcast".to_string(),
                    transaction_id: Some(receipt.transaction_id),
                    attempts: attempt,
                };
            }
            Err(e) if e.is_transient() && attempt < max_attempts => {
                warn!(
                    name = %name,
                    attempt,
                    "Renewal failed ({}); retrying in {:?}",
                    e,
                    config.retry_delay
                );
                tokio::time::sleep(config.retry_delay).await;
            }
            Err(e) => {
                let status = classify(&e);
                warn!(name = %name, attempt, %status, "Renewal failed: {}", e);
                return failed(name, status, &e.to_string(), attempt);
            }
        }
    }
}

/// Rejections and auth failures are definitive; everything else is a transport problem
fn classify(e: &ClientError) -> RenewalStatus {
    match e {
        ClientError::Rejected(_) | ClientError::Auth(_) => RenewalStatus::Rejected,
        ClientError::Network(_) | ClientError::Timeout(_) | ClientError::Malformed(_) => {
            RenewalStatus::NetworkError
        }
    }
}

fn failed(name: &str, status: RenewalStatus, detail: &str, attempts: u32) -> RenewalResult {
    RenewalResult {
        name: name.to_string(),
        status,
        detail: detail.to_string(),
        transaction_id: None,
        attempts,
    }
}
