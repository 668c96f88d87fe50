//! Black-Scholes Pricer
//!
//! European option price and Greeks on a non-dividend-paying underlying:
//! - Delta: `N(d1)` for calls, `N(d1) - 1` for puts
//! - Gamma: `φ(d1) / (S·σ·√T)`
//! - Vega: `S·φ(d1)·√T / 100` (per one volatility point)
//! - Theta: annual time decay divided by 365 (per calendar day)
//!
//! Expired contracts (`T ≤ 0`, including past expiry) are valued at their
//! intrinsic value and zero volatility at the discounted intrinsic value.
//! Both have all Greeks exactly zero.

// Black-Scholes uses standard mathematical notation (s, k, t, r, sigma)
// Financial formulas use standard notation where mul_add() obscures meaning
#![allow(clippy::many_single_char_names)]
#![allow(clippy::suboptimal_flops)]

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::position::OptionType;

/// Calendar days used to express theta per day.
const DAYS_PER_YEAR: f64 = 365.0;

/// Vega is quoted per volatility point.
const VEGA_SCALE: f64 = 100.0;

// ============================================================================
// Error Types
// ============================================================================

/// Errors from option valuation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PricingError {
    /// An input lies outside the model's domain.
    #[error("{parameter} out of domain: {value}")]
    Domain {
        /// Offending parameter.
        parameter: &'static str,
        /// Offending value.
        value: f64,
    },

    /// The model produced a non-finite output.
    #[error("non-finite {output} for the given inputs")]
    NonFinite {
        /// Offending output.
        output: &'static str,
    },
}

// ============================================================================
// Valuation
// ============================================================================

/// Per-unit option price and Greeks.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OptionValuation {
    /// Option premium.
    pub price: f64,
    /// Sensitivity to the underlying price.
    pub delta: f64,
    /// Sensitivity of delta to the underlying price.
    pub gamma: f64,
    /// Value decay per calendar day.
    pub theta: f64,
    /// Sensitivity to a one-point move in implied volatility.
    pub vega: f64,
}

impl OptionValuation {
    /// Valuation with zero Greeks at the given price.
    const fn intrinsic(price: f64) -> Self {
        Self {
            price,
            delta: 0.0,
            gamma: 0.0,
            theta: 0.0,
            vega: 0.0,
        }
    }

    /// Whether all Greeks are exactly zero.
    #[must_use]
    pub fn has_zero_greeks(&self) -> bool {
        self.delta == 0.0 && self.gamma == 0.0 && self.theta == 0.0 && self.vega == 0.0
    }
}

// ============================================================================
// Normal Distribution
// ============================================================================

/// Standard normal CDF (cumulative distribution function).
#[must_use]
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * (1.0 + libm::erf(x / std::f64::consts::SQRT_2))
}

/// Standard normal PDF (probability density function).
#[must_use]
pub fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

// ============================================================================
// Pricer
// ============================================================================

/// Price an option and compute its per-unit Greeks.
///
/// # Arguments
///
/// * `s` - Underlying price (must be > 0)
/// * `k` - Strike price (must be > 0)
/// * `t` - Time to expiry in years (≤ 0 prices as expired)
/// * `r` - Risk-free rate (annualized)
/// * `sigma` - Implied volatility (annualized, must be ≥ 0)
/// * `kind` - Call or put
///
/// # Errors
///
/// Returns [`PricingError::Domain`] for inputs outside the preconditions and
/// [`PricingError::NonFinite`] if the result cannot be represented.
pub fn price_and_greeks(
    s: f64,
    k: f64,
    t: f64,
    r: f64,
    sigma: f64,
    kind: OptionType,
) -> Result<OptionValuation, PricingError> {
    validate_inputs(s, k, t, r, sigma)?;

    if t <= 0.0 {
        return Ok(OptionValuation::intrinsic(intrinsic_value(s, k, kind)));
    }

    let discount = (-r * t).exp();
    let sigma_sqrt_t = sigma * t.sqrt();

    if sigma_sqrt_t == 0.0 {
        let intrinsic = match kind {
            OptionType::Call => (s - k * discount).max(0.0),
            OptionType::Put => (k * discount - s).max(0.0),
        };
        return Ok(OptionValuation::intrinsic(intrinsic));
    }

    let d1 = ((s / k).ln() + (r + 0.5 * sigma * sigma) * t) / sigma_sqrt_t;
    let d2 = d1 - sigma_sqrt_t;
    let pdf_d1 = norm_pdf(d1);

    let decay = -(s * pdf_d1 * sigma) / (2.0 * t.sqrt());
    let (price, delta, carry) = match kind {
        OptionType::Call => (
            s * norm_cdf(d1) - k * discount * norm_cdf(d2),
            norm_cdf(d1),
            -r * k * discount * norm_cdf(d2),
        ),
        OptionType::Put => (
            k * discount * norm_cdf(-d2) - s * norm_cdf(-d1),
            norm_cdf(d1) - 1.0,
            r * k * discount * norm_cdf(-d2),
        ),
    };

    let valuation = OptionValuation {
        price,
        delta,
        gamma: pdf_d1 / (s * sigma_sqrt_t),
        theta: (decay + carry) / DAYS_PER_YEAR,
        vega: s * pdf_d1 * t.sqrt() / VEGA_SCALE,
    };

    ensure_finite(&valuation)?;
    Ok(valuation)
}

fn intrinsic_value(s: f64, k: f64, kind: OptionType) -> f64 {
    match kind {
        OptionType::Call => (s - k).max(0.0),
        OptionType::Put => (k - s).max(0.0),
    }
}

/// Validate input parameters.
fn validate_inputs(s: f64, k: f64, t: f64, r: f64, sigma: f64) -> Result<(), PricingError> {
    if !(s.is_finite() && s > 0.0) {
        return Err(PricingError::Domain {
            parameter: "spot",
            value: s,
        });
    }
    if !(k.is_finite() && k > 0.0) {
        return Err(PricingError::Domain {
            parameter: "strike",
            value: k,
        });
    }
    if !t.is_finite() {
        return Err(PricingError::Domain {
            parameter: "time_to_expiry",
            value: t,
        });
    }
    if !r.is_finite() {
        return Err(PricingError::Domain {
            parameter: "risk_free_rate",
            value: r,
        });
    }
    if !(sigma.is_finite() && sigma >= 0.0) {
        return Err(PricingError::Domain {
            parameter: "volatility",
            value: sigma,
        });
    }
    Ok(())
}

fn ensure_finite(valuation: &OptionValuation) -> Result<(), PricingError> {
    let outputs = [
        ("price", valuation.price),
        ("delta", valuation.delta),
        ("gamma", valuation.gamma),
        ("theta", valuation.theta),
        ("vega", valuation.vega),
    ];
    match outputs.iter().find(|(_, value)| !value.is_finite()) {
        Some((output, _)) => Err(PricingError::NonFinite { output }),
        None => Ok(()),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() < tolerance
    }

    #[test]
    fn test_norm_cdf() {
        assert!(approx_eq(norm_cdf(0.0), 0.5, 1e-6));
        assert!(approx_eq(norm_cdf(1.96), 0.975, 0.001));
        assert!(approx_eq(norm_cdf(-1.96), 0.025, 0.001));
    }

    #[test]
    fn test_atm_call_reference_values() {
        // S=100, K=100, T=1, r=0.05, sigma=0.20
        let v = price_and_greeks(100.0, 100.0, 1.0, 0.05, 0.20, OptionType::Call).unwrap();
        assert!(approx_eq(v.price, 10.4506, 1e-3));
        assert!(approx_eq(v.delta, 0.6368, 1e-3));
        assert!(approx_eq(v.gamma, 0.018_76, 1e-4));
        // Vega 37.52 per unit vol -> 0.3752 per vol point
        assert!(approx_eq(v.vega, 0.3752, 1e-3));
        // Theta -6.414 per year -> -0.01757 per day
        assert!(approx_eq(v.theta, -6.414 / 365.0, 1e-4));
    }

    #[test]
    fn test_atm_put_reference_values() {
        let v = price_and_greeks(100.0, 100.0, 1.0, 0.05, 0.20, OptionType::Put).unwrap();
        assert!(approx_eq(v.price, 5.5735, 1e-3));
        assert!(approx_eq(v.delta, -0.3632, 1e-3));
        // Theta -1.658 per year
        assert!(approx_eq(v.theta, -1.658 / 365.0, 1e-4));
    }

    #[test]
    fn test_expired_option_has_zero_greeks() {
        for kind in [OptionType::Call, OptionType::Put] {
            for sigma in [0.0, 0.5, 3.0] {
                let v = price_and_greeks(65_000.0, 60_000.0, 0.0, 0.05, sigma, kind).unwrap();
                assert!(v.has_zero_greeks());
            }
        }
        let call = price_and_greeks(65_000.0, 60_000.0, 0.0, 0.05, 0.8, OptionType::Call).unwrap();
        assert_eq!(call.price, 5_000.0);
    }

    #[test]
    fn test_past_expiry_prices_as_expired() {
        for t in [-1e-9, -0.25, -3.0] {
            let put = price_and_greeks(3_000.0, 3_200.0, t, 0.05, 0.6, OptionType::Put).unwrap();
            assert!(put.has_zero_greeks());
            assert_eq!(put.price, 200.0);
        }
        let err = price_and_greeks(100.0, 100.0, f64::NEG_INFINITY, 0.05, 0.2, OptionType::Call).unwrap_err();
        assert!(matches!(err, PricingError::Domain { parameter: "time_to_expiry", .. }));
    }

    #[test]
    fn test_zero_volatility_has_zero_greeks() {
        let v = price_and_greeks(3_000.0, 3_200.0, 0.5, 0.05, 0.0, OptionType::Put).unwrap();
        assert!(v.has_zero_greeks());
        assert!(v.price > 0.0);
    }

    #[test]
    fn test_at_the_money_and_extremes_do_not_fail() {
        for (s, k) in [(100.0, 100.0), (1.0, 1_000_000.0), (1_000_000.0, 1.0)] {
            for kind in [OptionType::Call, OptionType::Put] {
                let v = price_and_greeks(s, k, 0.01, 0.05, 0.8, kind).unwrap();
                assert!(v.delta.is_finite() && v.gamma.is_finite());
            }
        }
    }

    #[test]
    fn test_domain_errors() {
        let err = price_and_greeks(0.0, 100.0, 1.0, 0.05, 0.2, OptionType::Call).unwrap_err();
        assert!(matches!(err, PricingError::Domain { parameter: "spot", .. }));

        let err = price_and_greeks(100.0, -5.0, 1.0, 0.05, 0.2, OptionType::Call).unwrap_err();
        assert!(matches!(err, PricingError::Domain { parameter: "strike", .. }));

        let err = price_and_greeks(100.0, 100.0, f64::NAN, 0.05, 0.2, OptionType::Call).unwrap_err();
        assert!(matches!(err, PricingError::Domain { parameter: "time_to_expiry", .. }));

        let err = price_and_greeks(100.0, 100.0, 1.0, 0.05, -0.2, OptionType::Put).unwrap_err();
        assert!(matches!(err, PricingError::Domain { parameter: "volatility", .. }));

        let err = price_and_greeks(100.0, 100.0, 1.0, f64::NAN, 0.2, OptionType::Put).unwrap_err();
        assert!(matches!(err, PricingError::Domain { parameter: "risk_free_rate", .. }));
    }

    proptest! {
        #[test]
        fn greeks_stay_within_bounds(
            s in 1.0f64..200_000.0,
            k in 1.0f64..200_000.0,
            t in 0.001f64..3.0,
            r in -0.02f64..0.15,
            sigma in 0.01f64..3.0,
        ) {
            let call = price_and_greeks(s, k, t, r, sigma, OptionType::Call).unwrap();
            let put = price_and_greeks(s, k, t, r, sigma, OptionType::Put).unwrap();

            prop_assert!((0.0..=1.0).contains(&call.delta));
            prop_assert!((-1.0..=0.0).contains(&put.delta));
            prop_assert!(call.gamma >= 0.0);
            prop_assert!(put.gamma >= 0.0);
            prop_assert!(call.vega >= 0.0);
            prop_assert!(put.vega >= 0.0);
        }

        #[test]
        fn delta_put_call_parity(
            s in 1.0f64..200_000.0,
            k in 1.0f64..200_000.0,
            t in 0.001f64..3.0,
            r in -0.02f64..0.15,
            sigma in 0.01f64..3.0,
        ) {
            let call = price_and_greeks(s, k, t, r, sigma, OptionType::Call).unwrap();
            let put = price_and_greeks(s, k, t, r, sigma, OptionType::Put).unwrap();

            prop_assert!((call.delta - put.delta - 1.0).abs() < 1e-12);
            prop_assert_eq!(call.gamma, put.gamma);
            prop_assert_eq!(call.vega, put.vega);
        }

        #[test]
        fn expired_is_zero_for_any_volatility(
            s in 1.0f64..200_000.0,
            k in 1.0f64..200_000.0,
            sigma in 0.0f64..5.0,
            t in -10.0f64..=0.0,
        ) {
            for kind in [OptionType::Call, OptionType::Put] {
                let v = price_and_greeks(s, k, t, 0.05, sigma, kind).unwrap();
                prop_assert!(v.has_zero_greeks());
            }
        }
    }
}
