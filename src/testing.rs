//! In-memory backends for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::client::{ClientError, ClientResult, NodeClient, RenewalReceipt, WalletClient};
use crate::notify::{Notifier, NotifyError};
use crate::types::{BalanceSnapshot, WalletInfo};

/// Scriptable wallet. Unscripted renewals succeed with `tx-<name>`.
pub struct FakeWallet {
    names: Mutex<ClientResult<Vec<Value>>>,
    list_delay: Duration,
    renew_script: Mutex<HashMap<String, VecDeque<Result<String, ClientError>>>>,
    renew_calls: Mutex<Vec<String>>,
    renew_delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    balance: Mutex<ClientResult<BalanceSnapshot>>,
    info: Mutex<ClientResult<WalletInfo>>,
}

impl FakeWallet {
    pub fn new() -> Self {
        Self {
            names: Mutex::new(Ok(Vec::new())),
            list_delay: Duration::ZERO,
            renew_script: Mutex::new(HashMap::new()),
            renew_calls: Mutex::new(Vec::new()),
            renew_delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            balance: Mutex::new(Ok(BalanceSnapshot {
                confirmed: 123_500_000,
                unconfirmed: 123_500_000,
                locked_confirmed: 0,
                locked_unconfirmed: 0,
            })),
            info: Mutex::new(Ok(WalletInfo {
                id: "primary".to_string(),
                receive_address: Some("hs1qmockaddress123456789".to_string()),
            })),
        }
    }

    pub fn with_names(self, names: Vec<Value>) -> Self {
        *self.names.lock().unwrap() = Ok(names);
        self
    }

    pub fn with_list_error(self, err: ClientError) -> Self {
        *self.names.lock().unwrap() = Err(err);
        self
    }

    pub fn with_list_delay(mut self, delay: Duration) -> Self {
        self.list_delay = delay;
        self
    }

    pub fn with_renew_delay(mut self, delay: Duration) -> Self {
        self.renew_delay = delay;
        self
    }

    pub fn with_balance_error(self, err: ClientError) -> Self {
        *self.balance.lock().unwrap() = Err(err);
        self
    }

    pub fn with_info_error(self, err: ClientError) -> Self {
        *self.info.lock().unwrap() = Err(err);
        self
    }

    /// Queue responses for `name`; `Ok` carries the transaction id
    pub fn script_renew(&self, name: &str, responses: Vec<Result<String, ClientError>>) {
        self.renew_script
            .lock()
            .unwrap()
            .insert(name.to_string(), responses.into());
    }

    pub fn renew_calls(&self) -> Vec<String> {
        self.renew_calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Default for FakeWallet {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WalletClient for FakeWallet {
    async fn list_names(&self) -> ClientResult<Vec<Value>> {
        if !self.list_delay.is_zero() {
            tokio::time::sleep(self.list_delay).await;
        }
        self.names.lock().unwrap().clone()
    }

    async fn renew(&self, name: &str) -> ClientResult<RenewalReceipt> {
        self.renew_calls.lock().unwrap().push(name.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.renew_delay.is_zero() {
            tokio::time::sleep(self.renew_delay).await;
        }

        let scripted = self
            .renew_script
            .lock()
            .unwrap()
            .get_mut(name)
            .and_then(VecDeque::pop_front);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        scripted
            .unwrap_or_else(|| Ok(format!("tx-{name}")))
            .map(|transaction_id| RenewalReceipt { transaction_id })
    }

    async fn balance(&self) -> ClientResult<BalanceSnapshot> {
        self.balance.lock().unwrap().clone()
    }

    async fn wallet_info(&self) -> ClientResult<WalletInfo> {
        self.info.lock().unwrap().clone()
    }
}

/// Node with a fixed height (or error)
pub struct FakeNode(pub ClientResult<u64>);

#[async_trait]
impl NodeClient for FakeNode {
    async fn chain_height(&self) -> ClientResult<u64> {
        self.0.clone()
    }
}

/// Notifier that records every message
#[derive(Default)]
pub struct RecordingNotifier {
    fail: bool,
    sent: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(text.to_string());
        if self.fail {
            Err(NotifyError::Delivery("chat unreachable".to_string()))
        } else {
            Ok(())
        }
    }
}
