//! Backend capabilities consumed by the renewal engine.
//!
//! The engine only ever talks to a node or wallet through these traits.
//! [`hsd`] provides the HTTP implementation for an hsd node; tests use
//! in-memory fakes.

pub mod hsd;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{BalanceSnapshot, WalletInfo};

pub use hsd::{HsdNodeClient, HsdWalletClient};

/// Result type for backend calls
pub type ClientResult<T> = Result<T, ClientError>;

/// Receipt for a broadcast renewal transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewalReceipt {
    /// Transaction hash
    pub transaction_id: String,
}

/// Wallet backend operations
#[async_trait]
pub trait WalletClient: Send + Sync {
    /// List names owned by the wallet, in whatever shape the backend uses
    async fn list_names(&self) -> ClientResult<Vec<serde_json::Value>>;

    /// Create, sign and broadcast a renewal for `name`
    async fn renew(&self, name: &str) -> ClientResult<RenewalReceipt>;

    /// Current wallet balance
    async fn balance(&self) -> ClientResult<BalanceSnapshot>;

    /// Wallet metadata; fails if the wallet does not exist
    async fn wallet_info(&self) -> ClientResult<WalletInfo>;
}

/// Node backend operations
#[async_trait]
pub trait NodeClient: Send + Sync {
    /// Current chain height
    async fn chain_height(&self) -> ClientResult<u64>;
}

/// Backend call errors
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Connection failed or the backend is temporarily unavailable
    #[error("network error: {0}")]
    Network(String),
    /// Call exceeded its deadline
    #[error("timed out after {0} ms")]
    Timeout(u64),
    /// API key rejected
    #[error("authentication failed: {0}")]
    Auth(String),
    /// Backend refused the request
    #[error("rejected: {0}")]
    Rejected(String),
    /// Response could not be decoded
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ClientError {
    /// Whether retrying the same call may succeed
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_))
    }
}

/// Run a backend call under a hard deadline; expiry becomes [`ClientError::Timeout`]
pub async fn with_deadline<T, F>(deadline: Duration, call: F) -> ClientResult<T>
where
    F: Future<Output = ClientResult<T>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(ClientError::Timeout(deadline.as_millis() as u64)),
    }
}
