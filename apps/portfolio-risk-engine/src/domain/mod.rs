//! Domain Layer - Positions, pricing, Greeks resolution and portfolio risk.
//!
//! Everything in this layer is synchronous and free of I/O. Time is always
//! passed in explicitly so the whole quantitative core can be exercised
//! without a runtime or a wall clock.

/// Exchange positions and instrument terms.
pub mod position;

/// Black-Scholes pricing and per-unit Greeks.
pub mod pricing;

/// Greeks value object and the position-level Greeks engine.
pub mod greeks;

/// Portfolio aggregation, classification, activity log and snapshots.
pub mod portfolio;
