//! Greeks Engine
//!
//! Resolves a raw [`Position`] into position-level [`Greeks`]:
//!
//! 1. Option terms are completed from the [`DefaultPolicy`] (pure step,
//!    [`OptionTerms::resolve`]); every substitution is recorded.
//! 2. Time to expiry is measured in years of 365.25 days.
//! 3. Per-unit Greeks from the pricing model are rounded to
//!    [`GREEKS_DECIMAL_PLACES`](super::GREEKS_DECIMAL_PLACES) and scaled by
//!    the signed quantity.
//!
//! Futures and spot carry a per-unit delta of one. Positions that cannot be
//! priced resolve to zero Greeks plus a [`PositionWarning`]; they are never
//! dropped.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::{Greeks, MalformedPosition, PositionWarning, ResolvedPosition, WarningKind};
use crate::domain::position::{Instrument, OptionTerms, OptionType, Position};
use crate::domain::pricing::price_and_greeks;

/// Seconds in a year of 365.25 days.
pub const SECONDS_PER_YEAR: f64 = 365.25 * 86_400.0;

// =============================================================================
// Default Policy
// =============================================================================

/// Values substituted for option inputs the source did not provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultPolicy {
    /// Implied volatility used when none is reported.
    pub default_volatility: Decimal,
    /// Risk-free rate used when none is reported.
    pub default_risk_free_rate: Decimal,
}

impl Default for DefaultPolicy {
    fn default() -> Self {
        Self {
            default_volatility: dec!(0.80),
            default_risk_free_rate: dec!(0.05),
        }
    }
}

/// Option input that can be defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultedField {
    /// Implied volatility.
    ImpliedVolatility,
    /// Risk-free rate.
    RiskFreeRate,
}

/// Record of one default substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedDefault {
    /// Field that was missing.
    pub field: DefaultedField,
    /// Value substituted.
    pub value: Decimal,
}

/// Option terms with every pricing input present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOptionTerms {
    /// Strike price (> 0).
    pub strike: Decimal,
    /// Expiry timestamp.
    pub expiry: DateTime<Utc>,
    /// Call or put.
    pub option_type: OptionType,
    /// Underlying price (> 0).
    pub underlying_price: Decimal,
    /// Implied volatility (≥ 0).
    pub implied_volatility: Decimal,
    /// Risk-free rate.
    pub risk_free_rate: Decimal,
    /// Substitutions made by the policy.
    pub applied_defaults: Vec<AppliedDefault>,
}

impl ResolvedOptionTerms {
    /// Years from `now` to expiry, floored at zero.
    #[must_use]
    pub fn time_to_expiry_years(&self, now: DateTime<Utc>) -> f64 {
        let millis = (self.expiry - now).num_milliseconds();
        (millis as f64 / 1_000.0 / SECONDS_PER_YEAR).max(0.0)
    }
}

impl OptionTerms {
    /// Complete these terms using `policy`.
    ///
    /// Strike, expiry, option type and underlying price are required; implied
    /// volatility and risk-free rate fall back to the policy.
    pub fn resolve(&self, policy: &DefaultPolicy) -> Result<ResolvedOptionTerms, MalformedPosition> {
        let strike = self.strike.ok_or(MalformedPosition::MissingField("strike"))?;
        let expiry = self.expiry.ok_or(MalformedPosition::MissingField("expiry"))?;
        let option_type = self
            .option_type
            .ok_or(MalformedPosition::MissingField("option_type"))?;
        let underlying_price = self
            .underlying_price
            .ok_or(MalformedPosition::MissingField("underlying_price"))?;

        ensure_positive("strike", strike)?;
        ensure_positive("underlying_price", underlying_price)?;

        let mut applied_defaults = Vec::new();

        let implied_volatility = self.implied_volatility.unwrap_or_else(|| {
            applied_defaults.push(AppliedDefault {
                field: DefaultedField::ImpliedVolatility,
                value: policy.default_volatility,
            });
            policy.default_volatility
        });
        if implied_volatility.is_sign_negative() && !implied_volatility.is_zero() {
            return Err(MalformedPosition::InvalidField {
                field: "implied_volatility",
                reason: format!("must be non-negative, got {implied_volatility}"),
            });
        }

        let risk_free_rate = self.risk_free_rate.unwrap_or_else(|| {
            applied_defaults.push(AppliedDefault {
                field: DefaultedField::RiskFreeRate,
                value: policy.default_risk_free_rate,
            });
            policy.default_risk_free_rate
        });

        Ok(ResolvedOptionTerms {
            strike,
            expiry,
            option_type,
            underlying_price,
            implied_volatility,
            risk_free_rate,
            applied_defaults,
        })
    }
}

fn ensure_positive(field: &'static str, value: Decimal) -> Result<(), MalformedPosition> {
    if value > Decimal::ZERO {
        Ok(())
    } else {
        Err(MalformedPosition::InvalidField {
            field,
            reason: format!("must be positive, got {value}"),
        })
    }
}

fn to_f64(field: &'static str, value: Decimal) -> Result<f64, MalformedPosition> {
    value.to_f64().ok_or_else(|| MalformedPosition::InvalidField {
        field,
        reason: format!("not representable as f64: {value}"),
    })
}

// =============================================================================
// Engine
// =============================================================================

/// Outcome of resolving one position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Position-level Greeks (zero when malformed).
    pub greeks: Greeks,
    /// Problems found while resolving.
    pub warnings: Vec<PositionWarning>,
    /// Default substitutions applied.
    pub applied_defaults: Vec<AppliedDefault>,
}

/// Computes position-level Greeks.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreeksEngine {
    policy: DefaultPolicy,
}

impl GreeksEngine {
    /// Create an engine with the given default policy.
    #[must_use]
    pub const fn new(policy: DefaultPolicy) -> Self {
        Self { policy }
    }

    /// The engine's default policy.
    #[must_use]
    pub const fn policy(&self) -> &DefaultPolicy {
        &self.policy
    }

    /// Resolve the Greeks of a position as of `now`.
    #[must_use]
    pub fn resolve(&self, position: &Position, now: DateTime<Utc>) -> Resolution {
        let mut warnings = Vec::new();
        if !position.side_matches_quantity() {
            warnings.push(PositionWarning::new(
                position,
                WarningKind::SideMismatch,
                format!(
                    "side {:?} disagrees with quantity {}",
                    position.side, position.quantity
                ),
            ));
        }

        let mut applied_defaults = Vec::new();
        let greeks = match self.position_greeks(position, now, &mut applied_defaults) {
            Ok(greeks) => greeks,
            Err(error) => {
                tracing::warn!(
                    exchange = %position.exchange,
                    symbol = %position.symbol,
                    error = %error,
                    "Malformed position, using zero Greeks"
                );
                warnings.push(PositionWarning::malformed(position, &error));
                Greeks::ZERO
            }
        };

        Resolution {
            greeks,
            warnings,
            applied_defaults,
        }
    }

    /// Resolve a position into a [`ResolvedPosition`].
    #[must_use]
    pub fn resolve_position(&self, position: Position, now: DateTime<Utc>) -> ResolvedPosition {
        let Resolution {
            greeks,
            warnings,
            applied_defaults,
        } = self.resolve(&position, now);
        ResolvedPosition {
            position,
            greeks,
            warnings,
            applied_defaults,
        }
    }

    fn position_greeks(
        &self,
        position: &Position,
        now: DateTime<Utc>,
        applied_defaults: &mut Vec<AppliedDefault>,
    ) -> Result<Greeks, MalformedPosition> {
        if position.quantity.is_zero() {
            return Err(MalformedPosition::ZeroQuantity);
        }

        let per_unit = match &position.instrument {
            Instrument::Future | Instrument::Spot => Greeks::with_delta(Decimal::ONE),
            Instrument::Option(terms) => {
                let resolved = terms.resolve(&self.policy)?;
                applied_defaults.extend_from_slice(&resolved.applied_defaults);
                Self::option_unit_greeks(&resolved, now)?
            }
        };

        per_unit
            .checked_scale(position.quantity)
            .ok_or_else(|| MalformedPosition::InvalidField {
                field: "quantity",
                reason: format!("Greeks overflow at quantity {}", position.quantity),
            })
    }

    fn option_unit_greeks(
        terms: &ResolvedOptionTerms,
        now: DateTime<Utc>,
    ) -> Result<Greeks, MalformedPosition> {
        let valuation = price_and_greeks(
            to_f64("underlying_price", terms.underlying_price)?,
            to_f64("strike", terms.strike)?,
            terms.time_to_expiry_years(now),
            to_f64("risk_free_rate", terms.risk_free_rate)?,
            to_f64("implied_volatility", terms.implied_volatility)?,
            terms.option_type,
        )?;

        Greeks::from_valuation(&valuation).ok_or_else(|| MalformedPosition::InvalidField {
            field: "greeks",
            reason: "not representable as decimal".to_string(),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    use super::*;
    use crate::domain::position::{Exchange, Side};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    fn btc_call(quantity: Decimal) -> Position {
        let terms = OptionTerms::new(
            dec!(70000),
            now() + Duration::days(30),
            OptionType::Call,
            dec!(65000),
        );
        Position::option(Exchange::Binance, "BTC-260131-70000-C", quantity, terms)
    }

    #[test]
    fn future_delta_equals_quantity() {
        let engine = GreeksEngine::default();
        let long = engine.resolve(&Position::future(Exchange::Binance, "BTCUSDT", dec!(2.5)), now());
        assert_eq!(long.greeks, Greeks::with_delta(dec!(2.5)));
        assert!(long.warnings.is_empty());

        let short = engine.resolve(&Position::spot(Exchange::Bybit, "ETHUSDT", dec!(-4)), now());
        assert_eq!(short.greeks.delta, dec!(-4));
        assert_eq!(short.greeks.gamma, Decimal::ZERO);
    }

    #[test]
    fn missing_volatility_uses_policy_default() {
        let engine = GreeksEngine::default();
        let resolution = engine.resolve(&btc_call(dec!(1)), now());

        assert_eq!(
            resolution.applied_defaults,
            vec![
                AppliedDefault {
                    field: DefaultedField::ImpliedVolatility,
                    value: dec!(0.80),
                },
                AppliedDefault {
                    field: DefaultedField::RiskFreeRate,
                    value: dec!(0.05),
                },
            ]
        );

        let t = 30.0 * 86_400.0 / SECONDS_PER_YEAR;
        let direct = price_and_greeks(65_000.0, 70_000.0, t, 0.05, 0.80, OptionType::Call).unwrap();
        assert_eq!(resolution.greeks, Greeks::from_valuation(&direct).unwrap());
    }

    #[test]
    fn explicit_inputs_are_not_defaulted() {
        let terms = OptionTerms::new(dec!(3000), now(), OptionType::Put, dec!(3200))
            .with_implied_volatility(dec!(0.6))
            .with_risk_free_rate(dec!(0.03));
        let resolved = terms.resolve(&DefaultPolicy::default()).unwrap();
        assert!(resolved.applied_defaults.is_empty());
        assert_eq!(resolved.implied_volatility, dec!(0.6));
        assert_eq!(resolved.risk_free_rate, dec!(0.03));
    }

    #[test]
    fn custom_policy_is_applied() {
        let policy = DefaultPolicy {
            default_volatility: dec!(0.55),
            default_risk_free_rate: dec!(0.02),
        };
        let terms = OptionTerms::new(dec!(3000), now(), OptionType::Put, dec!(3200));
        let resolved = terms.resolve(&policy).unwrap();
        assert_eq!(resolved.implied_volatility, dec!(0.55));
        assert_eq!(resolved.risk_free_rate, dec!(0.02));
    }

    #[test]
    fn expired_option_has_zero_greeks_without_warning() {
        let terms = OptionTerms::new(
            dec!(60000),
            now() - Duration::days(1),
            OptionType::Call,
            dec!(65000),
        );
        let position = Position::option(Exchange::Bybit, "BTC-60000-C", dec!(3), terms);
        let resolution = GreeksEngine::default().resolve(&position, now());
        assert!(resolution.greeks.is_zero());
        assert!(resolution.warnings.is_empty());
    }

    #[test]
    fn missing_strike_is_malformed() {
        let terms = OptionTerms {
            strike: None,
            ..OptionTerms::new(dec!(1), now(), OptionType::Call, dec!(65000))
        };
        let position = Position::option(Exchange::Binance, "BTC-C", dec!(1), terms);
        let resolution = GreeksEngine::default().resolve(&position, now());

        assert!(resolution.greeks.is_zero());
        assert_eq!(resolution.warnings.len(), 1);
        assert_eq!(resolution.warnings[0].kind, WarningKind::Malformed);
        assert!(resolution.warnings[0].reason.contains("strike"));
    }

    #[test]
    fn invalid_inputs_are_malformed() {
        let engine = GreeksEngine::default();

        let zero_strike = OptionTerms::new(Decimal::ZERO, now(), OptionType::Call, dec!(65000));
        let position = Position::option(Exchange::Binance, "BTC-0-C", dec!(1), zero_strike);
        assert_eq!(engine.resolve(&position, now()).warnings[0].kind, WarningKind::Malformed);

        let negative_vol = OptionTerms::new(dec!(60000), now(), OptionType::Call, dec!(65000))
            .with_implied_volatility(dec!(-0.2));
        assert!(matches!(
            negative_vol.resolve(&DefaultPolicy::default()),
            Err(MalformedPosition::InvalidField { field: "implied_volatility", .. })
        ));
    }

    #[test]
    fn zero_quantity_is_malformed() {
        let position = Position::future(Exchange::Bybit, "ETHUSDT", Decimal::ZERO);
        let resolution = GreeksEngine::default().resolve(&position, now());
        assert!(resolution.greeks.is_zero());
        assert_eq!(resolution.warnings[0].reason, "quantity is zero");
    }

    #[test]
    fn side_mismatch_warns_but_keeps_signed_quantity() {
        let position =
            Position::future(Exchange::Binance, "BTCUSDT", dec!(2)).with_side(Side::Short);
        let resolution = GreeksEngine::default().resolve(&position, now());
        assert_eq!(resolution.greeks.delta, dec!(2));
        assert_eq!(resolution.warnings.len(), 1);
        assert_eq!(resolution.warnings[0].kind, WarningKind::SideMismatch);
    }

    #[test]
    fn short_call_has_negative_delta_and_gamma() {
        let resolution = GreeksEngine::default().resolve(&btc_call(dec!(-2)), now());
        assert!(resolution.greeks.delta < Decimal::ZERO);
        assert!(resolution.greeks.gamma < Decimal::ZERO);
        assert!(resolution.greeks.theta > Decimal::ZERO);
    }

    #[test]
    fn time_to_expiry_uses_calendar_year() {
        let terms = OptionTerms::new(
            dec!(1),
            now() + Duration::seconds(SECONDS_PER_YEAR as i64),
            OptionType::Call,
            dec!(1),
        )
        .resolve(&DefaultPolicy::default())
        .unwrap();
        assert!((terms.time_to_expiry_years(now()) - 1.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn greeks_are_linear_in_quantity(
            units in 1i64..1_000_000,
            short in any::<bool>(),
            days in 0i64..720,
        ) {
            let quantity = Decimal::new(if short { -units } else { units }, 3);
            let terms = OptionTerms::new(
                dec!(60000),
                now() + Duration::days(days),
                OptionType::Put,
                dec!(64000),
            );
            let single = Position::option(Exchange::Bybit, "BTC-60000-P", quantity, terms.clone());
            let double = Position::option(Exchange::Bybit, "BTC-60000-P", quantity * dec!(2), terms);

            let engine = GreeksEngine::default();
            let one = engine.resolve(&single, now()).greeks;
            let two = engine.resolve(&double, now()).greeks;

            prop_assert_eq!(two, one.checked_scale(dec!(2)).unwrap());
        }
    }
}
