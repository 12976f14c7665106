//! Operator notifications.
//!
//! A cycle hands its rendered report to a [`Notifier`]. Delivery failures are
//! reported back but never undo or fail the renewals already submitted.

pub mod telegram;

use async_trait::async_trait;
use tracing::warn;

pub use telegram::TelegramNotifier;

/// Delivers a rendered message to the operator
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send one message
    async fn send(&self, text: &str) -> Result<(), NotifyError>;
}

/// Notification errors
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// No channel configured
    #[error("notification channel not configured")]
    NotConfigured,
    /// Transport failure
    #[error("delivery failed: {0}")]
    Delivery(String),
    /// Channel API refused the message
    #[error("channel rejected message: {0}")]
    Rejected(String),
}

/// Notifier used when no chat channel is configured.
///
/// Logs the message and reports it as undelivered.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        warn!("Telegram not configured; report not delivered:\n{}", text);
        Err(NotifyError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_notifier_reports_undelivered() {
        let result = tokio_test::block_on(DisabledNotifier.send("hello"));
        assert!(matches!(result, Err(NotifyError::NotConfigured)));
    }
}
