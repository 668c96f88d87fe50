//! Snapshot Broadcast Hub
//!
//! Fans published snapshots out over a `tokio::sync::broadcast` channel so a
//! transport (dashboard websocket, SSE stream) can attach any number of
//! receivers without holding up the scheduler.
//!
//! Receivers that fall more than `capacity` snapshots behind skip ahead to
//! the newest ones (`RecvError::Lagged`); only the latest snapshot matters to
//! a risk view.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::application::ports::{PublishError, SnapshotSubscriber};
use crate::domain::portfolio::RiskSnapshot;

/// Default channel capacity.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 16;

/// Broadcast channel for published snapshots.
#[derive(Debug)]
pub struct SnapshotBroadcastHub {
    tx: broadcast::Sender<Arc<RiskSnapshot>>,
    capacity: usize,
}

impl Default for SnapshotBroadcastHub {
    fn default() -> Self {
        Self::new(DEFAULT_BROADCAST_CAPACITY)
    }
}

impl SnapshotBroadcastHub {
    /// Create a hub buffering up to `capacity` snapshots per receiver.
    ///
    /// A zero capacity is raised to 1.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            tx: broadcast::channel(capacity).0,
            capacity,
        }
    }

    /// Send a snapshot to all receivers.
    ///
    /// Returns the number of receivers that got the snapshot, or `None` if
    /// there are no active receivers.
    #[must_use]
    pub fn send(&self, snapshot: Arc<RiskSnapshot>) -> Option<usize> {
        self.tx.send(snapshot).ok()
    }

    /// Get a new receiver; it sees snapshots sent after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<RiskSnapshot>> {
        self.tx.subscribe()
    }

    /// Number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

#[async_trait]
impl SnapshotSubscriber for SnapshotBroadcastHub {
    fn name(&self) -> &str {
        "broadcast"
    }

    async fn on_snapshot(&self, snapshot: Arc<RiskSnapshot>) -> Result<(), PublishError> {
        let sequence = snapshot.sequence;
        match self.send(snapshot) {
            Some(receivers) => {
                tracing::trace!(sequence, receivers, "Snapshot broadcast");
            }
            None => {
                // Nobody attached yet; the snapshot stays readable through
                // the publisher's current-snapshot cell.
                tracing::debug!(sequence, "Snapshot broadcast skipped, no receivers");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use tokio::sync::broadcast::error::RecvError;

    use super::*;
    use crate::domain::portfolio::{FeedMode, PortfolioAggregator, TickContext};
    use crate::domain::position::PerExchange;

    fn snapshot(sequence: u64) -> Arc<RiskSnapshot> {
        let context = TickContext {
            sequence,
            now: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            mode: FeedMode::Synthetic,
            sources: PerExchange::default(),
            refresh_reason: None,
        };
        Arc::new(PortfolioAggregator::default().aggregate(PerExchange::default(), context))
    }

    #[test]
    fn receiver_count_tracks_subscriptions() {
        let hub = SnapshotBroadcastHub::default();
        assert_eq!(hub.receiver_count(), 0);

        let rx1 = hub.subscribe();
        let _rx2 = hub.subscribe();
        assert_eq!(hub.receiver_count(), 2);

        drop(rx1);
        assert_eq!(hub.receiver_count(), 1);
    }

    #[test]
    fn send_with_no_receivers_returns_none() {
        let hub = SnapshotBroadcastHub::default();
        assert!(hub.send(snapshot(1)).is_none());
    }

    #[tokio::test]
    async fn every_receiver_gets_the_snapshot() {
        let hub = SnapshotBroadcastHub::default();
        let mut rx1 = hub.subscribe();
        let mut rx2 = hub.subscribe();

        hub.on_snapshot(snapshot(7)).await.unwrap();

        assert_eq!(rx1.recv().await.unwrap().sequence, 7);
        assert_eq!(rx2.recv().await.unwrap().sequence, 7);
    }

    #[tokio::test]
    async fn delivery_without_receivers_is_not_an_error() {
        let hub = SnapshotBroadcastHub::default();
        assert!(hub.on_snapshot(snapshot(1)).await.is_ok());
    }

    #[tokio::test]
    async fn slow_receiver_lags_to_newest() {
        let hub = SnapshotBroadcastHub::new(2);
        let mut rx = hub.subscribe();

        for sequence in 1..=4 {
            let _ = hub.send(snapshot(sequence));
        }

        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(2))));
        assert_eq!(rx.recv().await.unwrap().sequence, 3);
        assert_eq!(rx.recv().await.unwrap().sequence, 4);
    }

    #[test]
    fn zero_capacity_is_raised() {
        assert_eq!(SnapshotBroadcastHub::new(0).capacity(), 1);
    }
}
