//! Engine Metrics Port
//!
//! Counters and gauges the scheduler and publisher report through.
//! Implementations must be cheap and must not block.

use std::time::Duration;

use parking_lot::Mutex;

use crate::domain::greeks::PositionWarning;
use crate::domain::portfolio::{FeedMode, RiskMetrics};
use crate::domain::position::Exchange;

/// Sink for engine operational metrics.
#[cfg_attr(test, mockall::automock)]
pub trait EngineMetrics: Send + Sync {
    /// A tick finished in `mode` after `duration`.
    fn record_tick(&self, mode: FeedMode, duration: Duration);

    /// A live source failed and was replaced by synthetic positions.
    fn record_source_failure(&self, exchange: Exchange, reason: &'static str);

    /// Per-position warnings produced by a tick.
    fn record_position_warnings(&self, warnings: &[PositionWarning]);

    /// A subscriber failed or timed out.
    fn record_subscriber_failure(&self, subscriber: &str);

    /// Portfolio-level gauges from the latest snapshot.
    fn set_risk_gauges(&self, metrics: &RiskMetrics);
}

/// Discards every measurement.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl EngineMetrics for NoopMetrics {
    fn record_tick(&self, _mode: FeedMode, _duration: Duration) {}

    fn record_source_failure(&self, _exchange: Exchange, _reason: &'static str) {}

    fn record_position_warnings(&self, _warnings: &[PositionWarning]) {}

    fn record_subscriber_failure(&self, _subscriber: &str) {}

    fn set_risk_gauges(&self, _metrics: &RiskMetrics) {}
}

/// Counts measurements in memory for assertions.
#[derive(Debug, Default)]
pub struct CountingMetrics {
    ticks: Mutex<Vec<FeedMode>>,
    source_failures: Mutex<Vec<(Exchange, &'static str)>>,
    subscriber_failures: Mutex<Vec<String>>,
}

impl CountingMetrics {
    /// Modes of every recorded tick.
    #[must_use]
    pub fn ticks(&self) -> Vec<FeedMode> {
        self.ticks.lock().clone()
    }

    /// Recorded source failures.
    #[must_use]
    pub fn source_failures(&self) -> Vec<(Exchange, &'static str)> {
        self.source_failures.lock().clone()
    }

    /// Recorded subscriber failures.
    #[must_use]
    pub fn subscriber_failures(&self) -> Vec<String> {
        self.subscriber_failures.lock().clone()
    }
}

impl EngineMetrics for CountingMetrics {
    fn record_tick(&self, mode: FeedMode, _duration: Duration) {
        self.ticks.lock().push(mode);
    }

    fn record_source_failure(&self, exchange: Exchange, reason: &'static str) {
        self.source_failures.lock().push((exchange, reason));
    }

    fn record_position_warnings(&self, _warnings: &[PositionWarning]) {}

    fn record_subscriber_failure(&self, subscriber: &str) {
        self.subscriber_failures.lock().push(subscriber.to_string());
    }

    fn set_risk_gauges(&self, _metrics: &RiskMetrics) {}
}
