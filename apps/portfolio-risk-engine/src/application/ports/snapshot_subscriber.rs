//! Snapshot Subscriber Port (Driven Port)
//!
//! Interface for observers of published risk snapshots (dashboard transport,
//! operator logs).

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::portfolio::RiskSnapshot;

/// Snapshot delivery error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    /// Delivery exceeded its deadline.
    #[error("Snapshot delivery to {subscriber} timed out")]
    Timeout {
        /// Subscriber name.
        subscriber: String,
    },

    /// Delivery failed.
    #[error("Snapshot delivery failed: {message}")]
    DeliveryFailed {
        /// Error details.
        message: String,
    },
}

/// Port for receiving published snapshots.
///
/// Called once per published tick in sequence order. Delivery is
/// at-most-once: a failed delivery is not retried.
#[async_trait]
pub trait SnapshotSubscriber: Send + Sync {
    /// Subscriber name for logs and metrics.
    fn name(&self) -> &str;

    /// Receive a snapshot.
    async fn on_snapshot(&self, snapshot: Arc<RiskSnapshot>) -> Result<(), PublishError>;
}
