//! Position Greeks
//!
//! Resolution of raw positions into position-level Greeks:
//!
//! - [`Greeks`]: delta, gamma, theta and vega in decimal precision
//! - [`GreeksEngine`]: default policy, time to expiry and pricing per position
//! - [`PositionWarning`]: problems found while resolving, tagged with the
//!   position identity

mod engine;
mod warning;

use std::iter::Sum;
use std::ops::{Add, AddAssign};

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};

use crate::domain::position::Position;
use crate::domain::pricing::OptionValuation;

pub use engine::{
    AppliedDefault, DefaultPolicy, DefaultedField, GreeksEngine, Resolution, ResolvedOptionTerms,
    SECONDS_PER_YEAR,
};
pub use warning::{MalformedPosition, PositionWarning, WarningKind};

/// Decimal places kept when converting per-unit Greeks from `f64`.
pub const GREEKS_DECIMAL_PLACES: u32 = 10;

// =============================================================================
// Greeks
// =============================================================================

/// Options Greeks for risk measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Greeks {
    /// Delta - directional exposure (quantity × per-unit delta).
    #[serde(with = "rust_decimal::serde::float")]
    pub delta: Decimal,
    /// Gamma - rate of change of delta.
    #[serde(with = "rust_decimal::serde::float")]
    pub gamma: Decimal,
    /// Theta - time decay per day.
    #[serde(with = "rust_decimal::serde::float")]
    pub theta: Decimal,
    /// Vega - sensitivity to one volatility point.
    #[serde(with = "rust_decimal::serde::float")]
    pub vega: Decimal,
}

impl Greeks {
    /// Zero Greeks.
    pub const ZERO: Self = Self {
        delta: Decimal::ZERO,
        gamma: Decimal::ZERO,
        theta: Decimal::ZERO,
        vega: Decimal::ZERO,
    };

    /// Create new Greeks.
    #[must_use]
    pub const fn new(delta: Decimal, gamma: Decimal, theta: Decimal, vega: Decimal) -> Self {
        Self {
            delta,
            gamma,
            theta,
            vega,
        }
    }

    /// Create Greeks with just delta.
    #[must_use]
    pub const fn with_delta(delta: Decimal) -> Self {
        Self {
            delta,
            gamma: Decimal::ZERO,
            theta: Decimal::ZERO,
            vega: Decimal::ZERO,
        }
    }

    /// Per-unit Greeks from a pricing result, rounded to
    /// [`GREEKS_DECIMAL_PLACES`].
    ///
    /// Returns `None` if any value cannot be represented as a decimal.
    #[must_use]
    pub fn from_valuation(valuation: &OptionValuation) -> Option<Self> {
        let convert =
            |value: f64| Decimal::from_f64(value).map(|d| d.round_dp(GREEKS_DECIMAL_PLACES));
        Some(Self {
            delta: convert(valuation.delta)?,
            gamma: convert(valuation.gamma)?,
            theta: convert(valuation.theta)?,
            vega: convert(valuation.vega)?,
        })
    }

    /// Scale Greeks by a factor (e.g. signed position quantity).
    ///
    /// Returns `None` on decimal overflow.
    #[must_use]
    pub fn checked_scale(&self, factor: Decimal) -> Option<Self> {
        Some(Self {
            delta: self.delta.checked_mul(factor)?,
            gamma: self.gamma.checked_mul(factor)?,
            theta: self.theta.checked_mul(factor)?,
            vega: self.vega.checked_mul(factor)?,
        })
    }

    /// Whether every Greek is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.delta.is_zero() && self.gamma.is_zero() && self.theta.is_zero() && self.vega.is_zero()
    }
}

/// Component-wise sum, saturating at the decimal range.
impl Add for Greeks {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            delta: self.delta.saturating_add(rhs.delta),
            gamma: self.gamma.saturating_add(rhs.gamma),
            theta: self.theta.saturating_add(rhs.theta),
            vega: self.vega.saturating_add(rhs.vega),
        }
    }
}

impl AddAssign for Greeks {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for Greeks {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

// =============================================================================
// Resolved Position
// =============================================================================

/// A position together with its resolved Greeks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPosition {
    /// Position as reported by the source.
    pub position: Position,
    /// Position-level Greeks (zero when malformed).
    pub greeks: Greeks,
    /// Problems found while resolving.
    pub warnings: Vec<PositionWarning>,
    /// Default values substituted for missing inputs.
    pub applied_defaults: Vec<AppliedDefault>,
}

impl ResolvedPosition {
    /// Whether resolution fell back to zero Greeks.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| w.kind == WarningKind::Malformed)
    }
}
