//! Risk status classification.

use std::fmt;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::domain::greeks::Greeks;

/// Risk status of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskStatus {
    /// Within the safe band.
    #[default]
    Safe,
    /// Above the safe band, within the warning band.
    Warning,
    /// Beyond the warning band.
    Breach,
}

impl fmt::Display for RiskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Safe => write!(f, "SAFE"),
            Self::Warning => write!(f, "WARNING"),
            Self::Breach => write!(f, "BREACH"),
        }
    }
}

/// Symmetric threshold band on an absolute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdBand {
    /// Inclusive upper bound of the safe band.
    pub safe: Decimal,
    /// Inclusive upper bound of the warning band.
    pub warning: Decimal,
}

impl ThresholdBand {
    /// Create a band.
    #[must_use]
    pub const fn new(safe: Decimal, warning: Decimal) -> Self {
        Self { safe, warning }
    }

    /// Whether the band is ordered (`0 ≤ safe ≤ warning`).
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        self.safe >= Decimal::ZERO && self.safe <= self.warning
    }
}

/// Classify a value against a band.
///
/// `|v| ≤ safe` is [`RiskStatus::Safe`], `|v| ≤ warning` is
/// [`RiskStatus::Warning`], anything larger is [`RiskStatus::Breach`].
#[must_use]
pub fn classify(value: Decimal, band: ThresholdBand) -> RiskStatus {
    let magnitude = value.abs();
    if magnitude <= band.safe {
        RiskStatus::Safe
    } else if magnitude <= band.warning {
        RiskStatus::Warning
    } else {
        RiskStatus::Breach
    }
}

/// Threshold bands for every classified metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskThresholds {
    /// Portfolio delta exposure.
    pub delta_exposure: ThresholdBand,
    /// Per-asset delta.
    pub delta: ThresholdBand,
    /// Per-asset gamma.
    pub gamma: ThresholdBand,
    /// Per-asset theta.
    pub theta: ThresholdBand,
    /// Per-asset vega.
    pub vega: ThresholdBand,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            delta_exposure: ThresholdBand::new(dec!(0.10), dec!(0.15)),
            delta: ThresholdBand::new(dec!(0.10), dec!(0.15)),
            gamma: ThresholdBand::new(dec!(0.10), dec!(0.20)),
            theta: ThresholdBand::new(dec!(50), dec!(100)),
            vega: ThresholdBand::new(dec!(100), dec!(200)),
        }
    }
}

impl RiskThresholds {
    /// Name of the first band that is not ordered, if any.
    #[must_use]
    pub fn first_unordered(&self) -> Option<&'static str> {
        [
            ("delta_exposure", self.delta_exposure),
            ("delta", self.delta),
            ("gamma", self.gamma),
            ("theta", self.theta),
            ("vega", self.vega),
        ]
        .into_iter()
        .find(|(_, band)| !band.is_ordered())
        .map(|(name, _)| name)
    }

    /// Classify the Greeks of one asset.
    #[must_use]
    pub fn classify_greeks(&self, greeks: &Greeks) -> GreeksStatus {
        GreeksStatus {
            delta: classify(greeks.delta, self.delta),
            gamma: classify(greeks.gamma, self.gamma),
            theta: classify(greeks.theta, self.theta),
            vega: classify(greeks.vega, self.vega),
        }
    }
}

/// Classification of one asset's Greeks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GreeksStatus {
    /// Delta status.
    pub delta: RiskStatus,
    /// Gamma status.
    pub gamma: RiskStatus,
    /// Theta status.
    pub theta: RiskStatus,
    /// Vega status.
    pub vega: RiskStatus,
}

impl GreeksStatus {
    /// Worst status across the four Greeks.
    #[must_use]
    pub fn worst(&self) -> RiskStatus {
        self.delta.max(self.gamma).max(self.theta).max(self.vega)
    }
}

/// Status classification carried by a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusReport {
    /// Portfolio delta exposure status.
    pub delta_exposure: RiskStatus,
    /// BTC Greeks status.
    pub btc: GreeksStatus,
    /// ETH Greeks status.
    pub eth: GreeksStatus,
    /// Worst status overall.
    pub overall: RiskStatus,
}
