//! Option Pricing
//!
//! Closed-form Black-Scholes valuation and per-unit Greeks.
//!
//! # Example
//!
//! ```
//! use portfolio_risk_engine::domain::position::OptionType;
//! use portfolio_risk_engine::domain::pricing::price_and_greeks;
//!
//! let valuation = price_and_greeks(65_000.0, 70_000.0, 0.25, 0.05, 0.80, OptionType::Call)?;
//! assert!(valuation.delta > 0.0 && valuation.delta < 1.0);
//! # Ok::<(), portfolio_risk_engine::domain::pricing::PricingError>(())
//! ```

mod black_scholes;

pub use black_scholes::{OptionValuation, PricingError, norm_cdf, norm_pdf, price_and_greeks};
