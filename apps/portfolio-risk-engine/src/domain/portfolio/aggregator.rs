//! Portfolio Aggregator
//!
//! Turns one tick's resolved positions into a [`RiskSnapshot`]. Metric
//! computation is delegated to the pure [`compute_portfolio_risk`]; the only
//! state carried across ticks is the bounded [`ActivityLog`].

use chrono::{DateTime, Utc};

use super::activity::{ActivityEntry, ActivityLog, ActivityStatus};
use super::classification::{RiskThresholds, StatusReport, classify};
use super::risk::{PortfolioRisk, compute_portfolio_risk};
use super::snapshot::{FeedMode, PositionView, RiskSnapshot, SourceStatus};
use crate::domain::greeks::{PositionWarning, ResolvedPosition, WarningKind};
use crate::domain::position::PerExchange;

/// Per-tick facts the aggregator cannot derive from positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickContext {
    /// Tick sequence number.
    pub sequence: u64,
    /// Tick timestamp.
    pub now: DateTime<Utc>,
    /// Overall feed mode.
    pub mode: FeedMode,
    /// Feed state per exchange.
    pub sources: PerExchange<SourceStatus>,
    /// Reason for an out-of-cycle refresh, if this tick was one.
    pub refresh_reason: Option<String>,
}

/// Folds resolved positions into snapshots and keeps the activity log.
#[derive(Debug, Clone, Default)]
pub struct PortfolioAggregator {
    thresholds: RiskThresholds,
    activity: ActivityLog,
}

impl PortfolioAggregator {
    /// Create an aggregator.
    #[must_use]
    pub fn new(thresholds: RiskThresholds, activity_capacity: usize) -> Self {
        Self {
            thresholds,
            activity: ActivityLog::new(activity_capacity),
        }
    }

    /// Threshold bands in use.
    #[must_use]
    pub const fn thresholds(&self) -> &RiskThresholds {
        &self.thresholds
    }

    /// Activity log.
    #[must_use]
    pub const fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    /// Build the snapshot for one tick.
    pub fn aggregate(
        &mut self,
        positions: PerExchange<Vec<ResolvedPosition>>,
        context: TickContext,
    ) -> RiskSnapshot {
        let risk = compute_portfolio_risk(&positions);
        let status = self.status_report(&risk);
        let warnings = collect_warnings(&positions);
        let views = positions.map(|_, resolved| resolved.iter().map(PositionView::from).collect::<Vec<_>>());
        let position_count = views.binance.len() + views.bybit.len();

        let degraded_sources: Vec<_> = context
            .sources
            .iter()
            .filter(|(_, status)| status.is_degraded())
            .map(|(exchange, _)| exchange)
            .collect();

        self.record_activity(&context, position_count, warnings.len());

        RiskSnapshot {
            sequence: context.sequence,
            generated_at: context.now,
            btc: risk.btc,
            eth: risk.eth,
            risk_metrics: risk.metrics,
            status,
            positions: views,
            recent_activity: self.activity.to_vec(),
            mode: context.mode,
            sources: context.sources,
            degraded_sources,
            warnings,
        }
    }

    fn status_report(&self, risk: &PortfolioRisk) -> StatusReport {
        let delta_exposure = classify(risk.metrics.delta_exposure, self.thresholds.delta_exposure);
        let btc = self.thresholds.classify_greeks(&risk.btc.greeks);
        let eth = self.thresholds.classify_greeks(&risk.eth.greeks);
        StatusReport {
            delta_exposure,
            btc,
            eth,
            overall: delta_exposure.max(btc.worst()).max(eth.worst()),
        }
    }

    fn record_activity(&mut self, context: &TickContext, position_count: usize, warning_count: usize) {
        let now = context.now;

        if let Some(reason) = &context.refresh_reason {
            self.activity.push(ActivityEntry::new(
                now,
                format!("Manual refresh: {reason}"),
                ActivityStatus::Success,
            ));
        }

        for (exchange, status) in context.sources.iter() {
            if let SourceStatus::Degraded { reason } = status {
                self.activity.push(ActivityEntry::new(
                    now,
                    format!("{exchange} unavailable ({reason}), using synthetic positions"),
                    ActivityStatus::Warning,
                ));
            }
        }

        if warning_count > 0 {
            self.activity.push(ActivityEntry::new(
                now,
                format!("{warning_count} position warnings"),
                ActivityStatus::Warning,
            ));
        }

        self.activity.push(ActivityEntry::new(
            now,
            format!("Portfolio updated: {position_count} positions"),
            ActivityStatus::Info,
        ));
    }
}

fn collect_warnings(positions: &PerExchange<Vec<ResolvedPosition>>) -> Vec<PositionWarning> {
    let mut warnings = Vec::new();
    for (_, resolved) in positions.iter() {
        for entry in resolved {
            warnings.extend(entry.warnings.iter().cloned());
            if entry.position.asset().is_none() {
                tracing::warn!(
                    exchange = %entry.position.exchange,
                    symbol = %entry.position.symbol,
                    "Unclassified symbol excluded from asset totals"
                );
                warnings.push(PositionWarning::new(
                    &entry.position,
                    WarningKind::Unclassified,
                    "symbol maps to no tracked asset",
                ));
            }
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::greeks::GreeksEngine;
    use crate::domain::portfolio::RiskStatus;
    use crate::domain::position::{Exchange, OptionTerms, OptionType, Position};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
    }

    fn context(sequence: u64) -> TickContext {
        TickContext {
            sequence,
            now: now() + Duration::seconds(i64::try_from(sequence).unwrap() * 10),
            mode: FeedMode::Live,
            sources: PerExchange::from_fn(|_| SourceStatus::Live),
            refresh_reason: None,
        }
    }

    fn book() -> PerExchange<Vec<ResolvedPosition>> {
        let engine = GreeksEngine::default();
        let call = Position::option(
            Exchange::Binance,
            "BTC-260130-70000-C",
            dec!(1),
            OptionTerms::new(dec!(70000), now() + Duration::days(29), OptionType::Call, dec!(65000)),
        );
        PerExchange {
            binance: vec![
                engine.resolve_position(call, now()),
                engine.resolve_position(
                    Position::future(Exchange::Binance, "BTCUSDT", dec!(-0.1)).with_mark_price(dec!(65000)),
                    now(),
                ),
            ],
            bybit: vec![
                engine.resolve_position(Position::future(Exchange::Bybit, "ETHUSDT", dec!(0.05)), now()),
                engine.resolve_position(Position::spot(Exchange::Bybit, "DOGEUSDT", dec!(100)), now()),
            ],
        }
    }

    #[test]
    fn aggregation_is_idempotent_modulo_tick_fields() {
        let mut aggregator = PortfolioAggregator::default();
        let first = aggregator.aggregate(book(), context(1));
        let second = aggregator.aggregate(book(), context(2));

        assert!(first.same_risk_as(&second));
        assert_ne!(first.sequence, second.sequence);
        assert_ne!(first.generated_at, second.generated_at);
        assert_ne!(first.recent_activity, second.recent_activity);
    }

    #[test]
    fn unclassified_positions_are_listed_and_warned() {
        let snapshot = PortfolioAggregator::default().aggregate(book(), context(1));
        assert_eq!(snapshot.positions.bybit.len(), 2);
        assert_eq!(snapshot.positions.bybit[1].asset, None);
        assert_eq!(snapshot.positions.bybit[1].underlying, "DOGE");
        assert!(
            snapshot
                .warnings
                .iter()
                .any(|w| w.kind == WarningKind::Unclassified && w.symbol == "DOGEUSDT")
        );
        assert_eq!(snapshot.eth.greeks.delta, dec!(0.05));
    }

    #[test]
    fn activity_records_degraded_sources_and_refresh() {
        let mut aggregator = PortfolioAggregator::new(RiskThresholds::default(), 5);
        let mut ctx = context(1);
        ctx.mode = FeedMode::Degraded;
        ctx.sources.bybit = SourceStatus::Degraded {
            reason: "timeout".to_string(),
        };
        ctx.refresh_reason = Some("order placed".to_string());

        let snapshot = aggregator.aggregate(book(), ctx);

        assert_eq!(snapshot.degraded_sources, vec![Exchange::Bybit]);
        assert!(snapshot.is_degraded());
        let descriptions: Vec<_> = snapshot
            .recent_activity
            .iter()
            .map(|e| e.description.as_str())
            .collect();
        assert_eq!(
            descriptions,
            [
                "Manual refresh: order placed",
                "bybit unavailable (timeout), using synthetic positions",
                "1 position warnings",
                "Portfolio updated: 4 positions",
            ]
        );
    }

    #[test]
    fn activity_log_is_bounded_across_ticks() {
        let mut aggregator = PortfolioAggregator::new(RiskThresholds::default(), 3);
        for sequence in 1..=10 {
            let snapshot = aggregator.aggregate(PerExchange::default(), context(sequence));
            assert!(snapshot.recent_activity.len() <= 3);
        }
        assert_eq!(aggregator.activity().len(), 3);
    }

    #[test]
    fn status_uses_configured_bands() {
        let snapshot = PortfolioAggregator::default().aggregate(book(), context(1));
        // ETH delta 0.05 is inside the default safe band
        assert_eq!(snapshot.status.eth.delta, RiskStatus::Safe);
        assert!(snapshot.status.overall >= snapshot.status.delta_exposure);
    }

    #[test]
    fn empty_snapshot_keeps_full_shape() {
        let snapshot = PortfolioAggregator::default().aggregate(PerExchange::default(), context(1));
        let json = snapshot.to_json().unwrap();
        for key in [
            "btc",
            "eth",
            "risk_metrics",
            "positions",
            "recent_activity",
            "last_update",
            "mode",
            "sources",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert!(json["positions"]["binance"].as_array().unwrap().is_empty());
        assert!(json["btc"].get("delta").is_some());
        assert!(json["risk_metrics"]["hedge_position"].get("eth").is_some());
        assert_eq!(json["risk_metrics"]["hedge_ratio"], serde_json::json!(100.0));
        assert_eq!(json["btc"]["delta"], serde_json::json!(0.0));
        assert_eq!(snapshot.risk_metrics.portfolio_value, Decimal::ZERO);
    }
}
