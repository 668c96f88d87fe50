//! Snapshot Publisher
//!
//! Owns the current-snapshot cell and fans every new snapshot out to the
//! registered subscribers.
//!
//! The cell is a `tokio::sync::watch` channel: one writer, any number of
//! readers, latest value wins. A snapshot whose sequence is not newer than
//! the current one is rejected, so readers observe snapshots in strictly
//! increasing sequence order.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::watch;

use crate::application::ports::{EngineMetrics, NoopMetrics, PublishError, SnapshotSubscriber};
use crate::domain::portfolio::RiskSnapshot;

/// Default bound on a single subscriber delivery.
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(1);

/// Outcome of publishing one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Snapshot sequence.
    pub sequence: u64,
    /// Whether the snapshot replaced the current one.
    pub accepted: bool,
    /// Subscribers that received the snapshot.
    pub delivered: usize,
    /// Subscribers that failed, with the reason.
    pub failed: Vec<(String, PublishError)>,
}

/// Read handle on the current snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    rx: watch::Receiver<Option<Arc<RiskSnapshot>>>,
}

impl SnapshotReader {
    /// Latest published snapshot, if any.
    #[must_use]
    pub fn current(&self) -> Option<Arc<RiskSnapshot>> {
        self.rx.borrow().clone()
    }

    /// Wait for a snapshot newer than the last one seen by this reader.
    ///
    /// Returns `None` once the publisher is gone.
    pub async fn changed(&mut self) -> Option<Arc<RiskSnapshot>> {
        self.rx.changed().await.ok()?;
        self.rx.borrow_and_update().clone()
    }

    /// Wait until a snapshot with at least `sequence` is published.
    pub async fn wait_for_sequence(&mut self, sequence: u64) -> Option<Arc<RiskSnapshot>> {
        let guard = self
            .rx
            .wait_for(|slot| slot.as_ref().is_some_and(|s| s.sequence >= sequence))
            .await
            .ok()?;
        guard.clone()
    }
}

/// Publishes snapshots to the current-snapshot cell and subscribers.
pub struct SnapshotPublisher {
    current: watch::Sender<Option<Arc<RiskSnapshot>>>,
    subscribers: RwLock<Vec<Arc<dyn SnapshotSubscriber>>>,
    delivery_timeout: Duration,
    metrics: Arc<dyn EngineMetrics>,
}

impl std::fmt::Debug for SnapshotPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotPublisher")
            .field("subscribers", &self.subscriber_count())
            .field("delivery_timeout", &self.delivery_timeout)
            .finish_non_exhaustive()
    }
}

impl Default for SnapshotPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_DELIVERY_TIMEOUT)
    }
}

impl SnapshotPublisher {
    /// Create a publisher with an empty current-snapshot cell.
    #[must_use]
    pub fn new(delivery_timeout: Duration) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            current,
            subscribers: RwLock::new(Vec::new()),
            delivery_timeout,
            metrics: Arc::new(NoopMetrics),
        }
    }

    /// Report delivery failures to `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn EngineMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Register a subscriber; delivery follows registration order.
    pub fn subscribe(&self, subscriber: Arc<dyn SnapshotSubscriber>) {
        tracing::info!(subscriber = subscriber.name(), "Snapshot subscriber registered");
        self.subscribers.write().push(subscriber);
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Read handle on the current snapshot.
    #[must_use]
    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader {
            rx: self.current.subscribe(),
        }
    }

    /// Latest published snapshot, if any.
    #[must_use]
    pub fn current(&self) -> Option<Arc<RiskSnapshot>> {
        self.current.borrow().clone()
    }

    /// Replace the current snapshot and deliver it to every subscriber.
    ///
    /// Subscriber failures and timeouts are logged and counted; they never
    /// stop delivery to the remaining subscribers.
    pub async fn publish(&self, snapshot: Arc<RiskSnapshot>) -> PublishReport {
        let sequence = snapshot.sequence;
        let accepted = self.current.send_if_modified(|slot| match slot {
            Some(existing) if existing.sequence >= sequence => false,
            _ => {
                *slot = Some(Arc::clone(&snapshot));
                true
            }
        });

        if !accepted {
            tracing::warn!(sequence, "Stale snapshot rejected");
            return PublishReport {
                sequence,
                ..PublishReport::default()
            };
        }

        let subscribers: Vec<_> = self.subscribers.read().clone();
        let mut report = PublishReport {
            sequence,
            accepted,
            ..PublishReport::default()
        };

        for subscriber in subscribers {
            let name = subscriber.name().to_string();
            let outcome = tokio::time::timeout(
                self.delivery_timeout,
                subscriber.on_snapshot(Arc::clone(&snapshot)),
            )
            .await
            .unwrap_or_else(|_| {
                Err(PublishError::Timeout {
                    subscriber: name.clone(),
                })
            });

            match outcome {
                Ok(()) => report.delivered += 1,
                Err(error) => {
                    tracing::warn!(
                        subscriber = %name,
                        sequence,
                        error = %error,
                        "Snapshot delivery failed"
                    );
                    self.metrics.record_subscriber_failure(&name);
                    report.failed.push((name, error));
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use parking_lot::Mutex;

    use super::*;
    use crate::application::ports::MockEngineMetrics;
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

    struct Recorder {
        name: &'static str,
        seen: Arc<Mutex<Vec<(&'static str, u64)>>>,
        fail: bool,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl SnapshotSubscriber for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        async fn on_snapshot(&self, snapshot: Arc<RiskSnapshot>) -> Result<(), PublishError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.seen.lock().push((self.name, snapshot.sequence));
            if self.fail {
                return Err(PublishError::DeliveryFailed {
                    message: "boom".to_string(),
                });
            }
            Ok(())
        }
    }

    fn recorder(
        name: &'static str,
        seen: &Arc<Mutex<Vec<(&'static str, u64)>>>,
        fail: bool,
    ) -> Arc<Recorder> {
        Arc::new(Recorder {
            name,
            seen: Arc::clone(seen),
            fail,
            delay: None,
        })
    }

    #[tokio::test]
    async fn delivers_in_registration_order_despite_failures() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let publisher = SnapshotPublisher::default();
        publisher.subscribe(recorder("first", &seen, true));
        publisher.subscribe(recorder("second", &seen, false));

        let report = publisher.publish(snapshot(1)).await;

        assert!(report.accepted);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "first");
        assert_eq!(*seen.lock(), vec![("first", 1), ("second", 1)]);
    }

    #[tokio::test]
    async fn delivery_failures_are_reported_to_metrics() {
        let mut metrics = MockEngineMetrics::new();
        metrics
            .expect_record_subscriber_failure()
            .withf(|subscriber| subscriber == "first")
            .times(1)
            .return_const(());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let publisher = SnapshotPublisher::default().with_metrics(Arc::new(metrics));
        publisher.subscribe(recorder("first", &seen, true));
        publisher.subscribe(recorder("second", &seen, false));

        let report = publisher.publish(snapshot(1)).await;

        assert_eq!(report.delivered, 1);
    }

    #[tokio::test]
    async fn rejects_stale_sequence() {
        let publisher = SnapshotPublisher::default();
        let reader = publisher.reader();

        assert!(publisher.publish(snapshot(2)).await.accepted);
        assert!(!publisher.publish(snapshot(1)).await.accepted);
        assert!(!publisher.publish(snapshot(2)).await.accepted);

        assert_eq!(reader.current().unwrap().sequence, 2);
        assert_eq!(publisher.current().unwrap().sequence, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_subscriber_times_out() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let publisher = SnapshotPublisher::new(Duration::from_millis(50));
        publisher.subscribe(Arc::new(Recorder {
            name: "slow",
            seen: Arc::clone(&seen),
            fail: false,
            delay: Some(Duration::from_secs(5)),
        }));
        publisher.subscribe(recorder("fast", &seen, false));

        let report = publisher.publish(snapshot(1)).await;

        assert_eq!(report.delivered, 1);
        assert!(matches!(report.failed[0].1, PublishError::Timeout { .. }));
        assert_eq!(*seen.lock(), vec![("fast", 1)]);
    }

    #[tokio::test]
    async fn reader_waits_for_sequence() {
        let publisher = Arc::new(SnapshotPublisher::default());
        let mut reader = publisher.reader();
        assert!(reader.current().is_none());

        let background = Arc::clone(&publisher);
        tokio::spawn(async move {
            for sequence in 1..=3 {
                background.publish(snapshot(sequence)).await;
            }
        });

        let latest = reader.wait_for_sequence(3).await.unwrap();
        assert_eq!(latest.sequence, 3);
    }
}
