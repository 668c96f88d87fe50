//! Risk snapshot published every tick.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::activity::ActivityEntry;
use super::classification::StatusReport;
use super::risk::{AssetRisk, RiskMetrics};
use crate::domain::greeks::{PositionWarning, ResolvedPosition};
use crate::domain::position::{
    Asset, Exchange, InstrumentType, PerExchange, Side, underlying_ticker,
};

// =============================================================================
// Feed State
// =============================================================================

/// Where the positions of a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedMode {
    /// Every exchange answered live.
    Live,
    /// At least one exchange fell back to synthetic positions.
    Degraded,
    /// No live exchange contributed.
    #[default]
    Synthetic,
}

impl fmt::Display for FeedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live => write!(f, "live"),
            Self::Degraded => write!(f, "degraded"),
            Self::Synthetic => write!(f, "synthetic"),
        }
    }
}

/// State of one exchange's feed during a tick.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SourceStatus {
    /// Live positions were used.
    Live,
    /// The live source failed; synthetic positions were substituted.
    Degraded {
        /// Why the live source failed.
        reason: String,
    },
    /// No live source is in use for this exchange.
    #[default]
    Synthetic,
}

impl SourceStatus {
    /// Whether live positions were used.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }

    /// Whether a live source failed this tick.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

// =============================================================================
// Position View
// =============================================================================

/// A position as shown in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionView {
    /// Exchange symbol.
    pub symbol: String,
    /// Instrument category.
    #[serde(rename = "type")]
    pub instrument_type: InstrumentType,
    /// Signed quantity.
    #[serde(with = "rust_decimal::serde::float")]
    pub qty: Decimal,
    /// Reported side.
    pub side: Side,
    /// Underlying ticker.
    pub underlying: String,
    /// Tracked asset, if any.
    pub asset: Option<Asset>,
    /// Position delta.
    #[serde(with = "rust_decimal::serde::float")]
    pub delta: Decimal,
    /// Position gamma.
    #[serde(with = "rust_decimal::serde::float")]
    pub gamma: Decimal,
    /// Position theta.
    #[serde(with = "rust_decimal::serde::float")]
    pub theta: Decimal,
    /// Position vega.
    #[serde(with = "rust_decimal::serde::float")]
    pub vega: Decimal,
    /// Source-reported unrealized P&L.
    #[serde(with = "rust_decimal::serde::float")]
    pub pnl: Decimal,
}

impl From<&ResolvedPosition> for PositionView {
    fn from(resolved: &ResolvedPosition) -> Self {
        let position = &resolved.position;
        Self {
            symbol: position.symbol.clone(),
            instrument_type: position.instrument_type(),
            qty: position.quantity,
            side: position.side,
            underlying: underlying_ticker(&position.symbol),
            asset: position.asset(),
            delta: resolved.greeks.delta,
            gamma: resolved.greeks.gamma,
            theta: resolved.greeks.theta,
            vega: resolved.greeks.vega,
            pnl: position.unrealized_pnl.unwrap_or_default(),
        }
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Immutable portfolio risk view produced by one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskSnapshot {
    /// Tick sequence number, strictly increasing.
    pub sequence: u64,
    /// When the snapshot was produced.
    #[serde(rename = "last_update")]
    pub generated_at: DateTime<Utc>,
    /// BTC risk.
    pub btc: AssetRisk,
    /// ETH risk.
    pub eth: AssetRisk,
    /// Portfolio metrics.
    pub risk_metrics: RiskMetrics,
    /// Threshold classification.
    pub status: StatusReport,
    /// Positions per exchange.
    pub positions: PerExchange<Vec<PositionView>>,
    /// Recent activity, oldest first.
    pub recent_activity: Vec<ActivityEntry>,
    /// Overall feed mode.
    pub mode: FeedMode,
    /// Feed state per exchange.
    pub sources: PerExchange<SourceStatus>,
    /// Exchanges whose live source failed this tick.
    pub degraded_sources: Vec<Exchange>,
    /// Per-position warnings.
    pub warnings: Vec<PositionWarning>,
}

impl RiskSnapshot {
    /// Whether any live source failed this tick.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.degraded_sources.is_empty()
    }

    /// Total positions across exchanges.
    #[must_use]
    pub fn position_count(&self) -> usize {
        self.positions.binance.len() + self.positions.bybit.len()
    }

    /// Risk of one asset.
    #[must_use]
    pub const fn asset(&self, asset: Asset) -> &AssetRisk {
        match asset {
            Asset::Btc => &self.btc,
            Asset::Eth => &self.eth,
        }
    }

    /// Equality ignoring sequence, timestamp and activity log.
    #[must_use]
    pub fn same_risk_as(&self, other: &Self) -> bool {
        self.btc == other.btc
            && self.eth == other.eth
            && self.risk_metrics == other.risk_metrics
            && self.status == other.status
            && self.positions == other.positions
            && self.mode == other.mode
            && self.sources == other.sources
            && self.degraded_sources == other.degraded_sources
            && self.warnings == other.warnings
    }

    /// Serialize to the dashboard JSON shape.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}
