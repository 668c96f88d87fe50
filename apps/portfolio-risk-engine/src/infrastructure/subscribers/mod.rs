//! Logging Subscriber
//!
//! Emits one structured log line per published snapshot for operators.

use std::sync::Arc;

use async_trait::async_trait;

use crate::application::ports::{PublishError, SnapshotSubscriber};
use crate::domain::portfolio::{RiskSnapshot, RiskStatus};

/// Subscriber that logs a summary of every snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSubscriber;

impl LoggingSubscriber {
    /// Create a logging subscriber.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SnapshotSubscriber for LoggingSubscriber {
    fn name(&self) -> &str {
        "log"
    }

    async fn on_snapshot(&self, snapshot: Arc<RiskSnapshot>) -> Result<(), PublishError> {
        let metrics = &snapshot.risk_metrics;
        let overall = snapshot.status.overall;

        if overall == RiskStatus::Breach {
            tracing::warn!(
                sequence = snapshot.sequence,
                mode = %snapshot.mode,
                delta_exposure = %metrics.delta_exposure,
                btc_delta = %snapshot.btc.greeks.delta,
                eth_delta = %snapshot.eth.greeks.delta,
                "Risk threshold breached"
            );
        }

        tracing::info!(
            sequence = snapshot.sequence,
            mode = %snapshot.mode,
            status = %overall,
            positions = snapshot.position_count(),
            delta_exposure = %metrics.delta_exposure,
            hedge_ratio = %metrics.hedge_ratio,
            daily_pnl = %metrics.daily_pnl,
            degraded = ?snapshot.degraded_sources,
            warnings = snapshot.warnings.len(),
            "Risk snapshot published"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::domain::portfolio::{FeedMode, PortfolioAggregator, TickContext};
    use crate::domain::position::PerExchange;

    #[tokio::test]
    async fn logging_never_fails_delivery() {
        let context = TickContext {
            sequence: 1,
            now: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            mode: FeedMode::Synthetic,
            sources: PerExchange::default(),
            refresh_reason: None,
        };
        let snapshot = PortfolioAggregator::default().aggregate(PerExchange::default(), context);

        let subscriber = LoggingSubscriber::new();
        assert_eq!(subscriber.name(), "log");
        assert!(subscriber.on_snapshot(Arc::new(snapshot)).await.is_ok());
    }
}
