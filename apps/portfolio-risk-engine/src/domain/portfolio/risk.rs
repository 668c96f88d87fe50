//! Portfolio risk metrics.
//!
//! [`compute_portfolio_risk`] is a pure fold over resolved positions:
//!
//! - Per-asset Greeks sum every instrument of that asset on every exchange
//! - `option_delta` sums option deltas only, `hedge_position` futures only
//! - Hedge ratio is `min(100, 100 × |hedge| / |option_delta|)`, or 100 when
//!   there is no option delta to hedge
//! - Notional, P&L and margin are sums of source-reported values
//!
//! Every sum saturates at the decimal range, so oversized inputs clamp the
//! totals instead of failing the fold.
//!
//! Positions whose symbol maps to no tracked asset are listed in
//! [`PortfolioRisk::unclassified`] and excluded from every total.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::domain::greeks::{Greeks, ResolvedPosition};
use crate::domain::position::{Asset, InstrumentType, PerExchange, PositionKey};

const HUNDRED: Decimal = dec!(100);

// =============================================================================
// Value Objects
// =============================================================================

/// Risk of one underlying asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AssetRisk {
    /// Summed Greeks across all instruments.
    #[serde(flatten)]
    pub greeks: Greeks,
    /// Summed option delta.
    #[serde(with = "rust_decimal::serde::float")]
    pub option_delta: Decimal,
    /// Summed futures delta.
    #[serde(with = "rust_decimal::serde::float")]
    pub hedge_position: Decimal,
    /// Hedge ratio in percent (0-100).
    #[serde(with = "rust_decimal::serde::float")]
    pub hedge_ratio: Decimal,
}

/// Futures hedge per asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HedgePositions {
    /// BTC futures delta.
    #[serde(with = "rust_decimal::serde::float")]
    pub btc: Decimal,
    /// ETH futures delta.
    #[serde(with = "rust_decimal::serde::float")]
    pub eth: Decimal,
}

/// Portfolio-level risk metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// Net delta across tracked assets.
    #[serde(with = "rust_decimal::serde::float")]
    pub delta_exposure: Decimal,
    /// Futures hedge per asset.
    pub hedge_position: HedgePositions,
    /// Summed option delta across tracked assets.
    #[serde(with = "rust_decimal::serde::float")]
    pub option_delta: Decimal,
    /// Net directional notional, `|Σ quantity × price|`.
    #[serde(with = "rust_decimal::serde::float")]
    pub net_risk: Decimal,
    /// Summed margin in use.
    #[serde(with = "rust_decimal::serde::float")]
    pub margin_used: Decimal,
    /// Margin as percent of portfolio value (0-100).
    #[serde(with = "rust_decimal::serde::float")]
    pub margin_used_pct: Decimal,
    /// Summed unrealized P&L.
    #[serde(with = "rust_decimal::serde::float")]
    pub daily_pnl: Decimal,
    /// P&L as percent of portfolio value.
    #[serde(with = "rust_decimal::serde::float")]
    pub daily_pnl_pct: Decimal,
    /// Gross notional, `Σ |quantity| × price`.
    #[serde(with = "rust_decimal::serde::float")]
    pub portfolio_value: Decimal,
    /// Portfolio hedge ratio in percent (0-100).
    #[serde(with = "rust_decimal::serde::float")]
    pub hedge_ratio: Decimal,
}

/// Result of folding a position set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PortfolioRisk {
    /// BTC risk.
    pub btc: AssetRisk,
    /// ETH risk.
    pub eth: AssetRisk,
    /// Portfolio metrics.
    pub metrics: RiskMetrics,
    /// Positions excluded from totals.
    pub unclassified: Vec<PositionKey>,
}

impl PortfolioRisk {
    /// Risk of one asset.
    #[must_use]
    pub const fn asset(&self, asset: Asset) -> &AssetRisk {
        match asset {
            Asset::Btc => &self.btc,
            Asset::Eth => &self.eth,
        }
    }
}

// =============================================================================
// Computation
// =============================================================================

/// Hedge ratio in percent.
///
/// `min(100, 100 × |hedge| / |option_delta|)`; 100 when `option_delta` is
/// zero or the ratio overflows.
#[must_use]
pub fn hedge_ratio(hedge: Decimal, option_delta: Decimal) -> Decimal {
    if option_delta.is_zero() {
        return HUNDRED;
    }
    hedge
        .abs()
        .checked_mul(HUNDRED)
        .and_then(|scaled| scaled.checked_div(option_delta.abs()))
        .map_or(HUNDRED, |ratio| ratio.min(HUNDRED))
}

/// `part / whole × 100`, zero when `whole` is zero.
fn percent_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    part.checked_div(whole)
        .and_then(|ratio| ratio.checked_mul(HUNDRED))
        .unwrap_or(Decimal::ZERO)
}

#[derive(Default)]
struct AssetTotals {
    greeks: Greeks,
    option_delta: Decimal,
    hedge: Decimal,
}

impl AssetTotals {
    fn add(&mut self, instrument: InstrumentType, greeks: Greeks) {
        self.greeks += greeks;
        match instrument {
            InstrumentType::Option => {
                self.option_delta = self.option_delta.saturating_add(greeks.delta);
            }
            InstrumentType::Future => self.hedge = self.hedge.saturating_add(greeks.delta),
            InstrumentType::Spot => {}
        }
    }

    fn finish(self) -> AssetRisk {
        AssetRisk {
            greeks: self.greeks,
            option_delta: self.option_delta,
            hedge_position: self.hedge,
            hedge_ratio: hedge_ratio(self.hedge, self.option_delta),
        }
    }
}

/// Fold resolved positions into portfolio risk.
#[must_use]
pub fn compute_portfolio_risk(positions: &PerExchange<Vec<ResolvedPosition>>) -> PortfolioRisk {
    let mut btc = AssetTotals::default();
    let mut eth = AssetTotals::default();
    let mut unclassified = Vec::new();

    let mut gross = Decimal::ZERO;
    let mut net = Decimal::ZERO;
    let mut margin = Decimal::ZERO;
    let mut pnl = Decimal::ZERO;

    for (_, resolved) in positions.iter() {
        for entry in resolved {
            let position = &entry.position;
            let totals = match position.asset() {
                Some(Asset::Btc) => &mut btc,
                Some(Asset::Eth) => &mut eth,
                None => {
                    unclassified.push(position.key());
                    continue;
                }
            };
            totals.add(position.instrument_type(), entry.greeks);

            let signed = position.signed_notional();
            gross = gross.saturating_add(signed.abs());
            net = net.saturating_add(signed);
            margin = margin.saturating_add(position.margin.unwrap_or_default());
            pnl = pnl.saturating_add(position.unrealized_pnl.unwrap_or_default());
        }
    }

    let btc = btc.finish();
    let eth = eth.finish();

    let hedge = btc.hedge_position.saturating_add(eth.hedge_position);
    let option_delta = btc.option_delta.saturating_add(eth.option_delta);

    let metrics = RiskMetrics {
        delta_exposure: btc.greeks.delta.saturating_add(eth.greeks.delta),
        hedge_position: HedgePositions {
            btc: btc.hedge_position,
            eth: eth.hedge_position,
        },
        option_delta,
        net_risk: net.abs(),
        margin_used: margin,
        margin_used_pct: percent_of(margin, gross).min(HUNDRED),
        daily_pnl: pnl,
        daily_pnl_pct: percent_of(pnl, gross),
        portfolio_value: gross,
        hedge_ratio: hedge_ratio(hedge, option_delta),
    };

    PortfolioRisk {
        btc,
        eth,
        metrics,
        unclassified,
    }
}
