//! Prometheus Metrics Module
//!
//! Exposes risk engine metrics in Prometheus format.
//!
//! # Metrics Categories
//!
//! - **Ticks**: Completed ticks by feed mode and tick duration
//! - **Sources**: Live source failures by exchange and reason
//! - **Positions**: Position warnings by kind
//! - **Delivery**: Subscriber delivery failures
//! - **Risk**: Delta exposure and hedge ratio of the latest snapshot
//!
//! Recording functions are no-ops until [`init_metrics`] installs the
//! recorder. [`PrometheusMetrics`] exposes them through the
//! [`EngineMetrics`] port.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::application::ports::EngineMetrics;
use crate::domain::greeks::{PositionWarning, WarningKind};
use crate::domain::portfolio::{FeedMode, RiskMetrics};
use crate::domain::position::Exchange;

static INSTALLED: OnceLock<SocketAddr> = OnceLock::new();

/// Tick duration buckets in seconds, 1ms to 10s.
const TICK_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to configure metrics exporter.
    #[error("metrics configuration error: {0}")]
    Configuration(String),
    /// Failed to install metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

/// Start the Prometheus exporter on `port`, serving `/metrics`.
///
/// Port 0 disables the exporter and returns `Ok(None)`. Calling this again
/// after a successful install returns the address already in use.
///
/// # Errors
///
/// Returns an error if the exporter cannot start (e.g., port already in use).
pub fn init_metrics(port: u16) -> Result<Option<SocketAddr>, MetricsError> {
    if port == 0 {
        tracing::info!("Prometheus metrics exporter disabled");
        return Ok(None);
    }
    if let Some(addr) = INSTALLED.get() {
        return Ok(Some(*addr));
    }

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets(TICK_BUCKETS)
        .map_err(|e| MetricsError::Configuration(e.to_string()))?
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    register_metrics();
    let _ = INSTALLED.set(addr);

    tracing::info!(addr = %addr, "Prometheus metrics exporter started");
    Ok(Some(addr))
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "risk_engine_ticks_total",
        "Total published ticks by feed mode"
    );
    describe_histogram!(
        "risk_engine_tick_duration_seconds",
        "Time from tick start to snapshot published"
    );

    describe_counter!(
        "risk_engine_source_failures_total",
        "Live position source failures by exchange and reason"
    );
    describe_counter!(
        "risk_engine_position_warnings_total",
        "Position warnings by kind"
    );
    describe_counter!(
        "risk_engine_subscriber_failures_total",
        "Snapshot deliveries that failed or timed out"
    );

    describe_gauge!(
        "risk_engine_delta_exposure",
        "Portfolio delta exposure of the latest snapshot"
    );
    describe_gauge!(
        "risk_engine_hedge_ratio_percent",
        "Hedge ratio of the latest snapshot"
    );
    describe_gauge!(
        "risk_engine_daily_pnl",
        "Daily P&L of the latest snapshot"
    );
}

// =============================================================================
// Metric Labels
// =============================================================================

const fn mode_label(mode: FeedMode) -> &'static str {
    match mode {
        FeedMode::Live => "live",
        FeedMode::Degraded => "degraded",
        FeedMode::Synthetic => "synthetic",
    }
}

const fn warning_label(kind: WarningKind) -> &'static str {
    match kind {
        WarningKind::Malformed => "malformed",
        WarningKind::SideMismatch => "side_mismatch",
        WarningKind::Unclassified => "unclassified",
    }
}

fn as_gauge(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record a published tick and its duration.
pub fn record_tick(mode: FeedMode, duration: Duration) {
    counter!("risk_engine_ticks_total", "mode" => mode_label(mode)).increment(1);
    histogram!("risk_engine_tick_duration_seconds", "mode" => mode_label(mode))
        .record(duration.as_secs_f64());
}

/// Record a live source failure.
pub fn record_source_failure(exchange: Exchange, reason: &'static str) {
    counter!(
        "risk_engine_source_failures_total",
        "exchange" => exchange.as_str(),
        "reason" => reason
    )
    .increment(1);
}

/// Record the warnings attached to a snapshot.
pub fn record_position_warnings(warnings: &[PositionWarning]) {
    for warning in warnings {
        counter!(
            "risk_engine_position_warnings_total",
            "kind" => warning_label(warning.kind),
            "exchange" => warning.exchange.as_str()
        )
        .increment(1);
    }
}

/// Record a failed or timed-out snapshot delivery.
pub fn record_subscriber_failure(subscriber: &str) {
    counter!(
        "risk_engine_subscriber_failures_total",
        "subscriber" => subscriber.to_string()
    )
    .increment(1);
}

/// Update the risk gauges from the latest snapshot.
pub fn set_risk_gauges(metrics: &RiskMetrics) {
    gauge!("risk_engine_delta_exposure").set(as_gauge(metrics.delta_exposure));
    gauge!("risk_engine_hedge_ratio_percent").set(as_gauge(metrics.hedge_ratio));
    gauge!("risk_engine_daily_pnl").set(as_gauge(metrics.daily_pnl));
}

// =============================================================================
// Port Adapter
// =============================================================================

/// [`EngineMetrics`] backed by the global `metrics` recorder.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusMetrics;

impl EngineMetrics for PrometheusMetrics {
    fn record_tick(&self, mode: FeedMode, duration: Duration) {
        record_tick(mode, duration);
    }

    fn record_source_failure(&self, exchange: Exchange, reason: &'static str) {
        record_source_failure(exchange, reason);
    }

    fn record_position_warnings(&self, warnings: &[PositionWarning]) {
        record_position_warnings(warnings);
    }

    fn record_subscriber_failure(&self, subscriber: &str) {
        record_subscriber_failure(subscriber);
    }

    fn set_risk_gauges(&self, metrics: &RiskMetrics) {
        set_risk_gauges(metrics);
    }
}

// =============================================================================
// Tests
// =============================================================================
