#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Portfolio Risk Engine - Multi-Exchange Greeks Aggregator
//!
//! Collects BTC and ETH options and futures positions from Binance and Bybit,
//! prices every option with Black-Scholes, and publishes a portfolio risk
//! snapshot (Greeks per asset, delta exposure, hedge ratio, P&L, margin,
//! threshold status) on a fixed cadence. Exchanges that cannot be reached
//! are replaced by synthetic positions and flagged as degraded.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Pure risk logic
//!   - `position`: Exchanges, assets, instruments and option symbols
//!   - `pricing`: Black-Scholes price and per-unit Greeks
//!   - `greeks`: Position Greeks with defaults and warnings
//!   - `portfolio`: Aggregation, classification, activity log, snapshot
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Position sources, snapshot subscribers, order gateway, clock, metrics
//!   - `services`: Update scheduler, snapshot publisher, refresh-on-order
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `sources`: Synthetic, in-memory and JSON file position sources
//!   - `broadcast`: Snapshot fan-out to transports
//!   - `subscribers`: Operator logging
//!   - `orders`: Paper order gateway
//!   - `config`, `metrics`, `telemetry`: Ambient concerns
//!
//! # Data Flow
//!
//! ```text
//! Binance source ─┐                ┌───────────┐    ┌───────────┐
//!                 ├─► Greeks ─────►│ Aggregate │───►│ Publisher │──► current snapshot
//! Bybit source ───┤    engine      └───────────┘    └───────────┘──► subscribers
//! Synthetic ──────┘  (fallback)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Risk types and calculations with no I/O.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::greeks::{DefaultPolicy, Greeks, GreeksEngine, PositionWarning, ResolvedPosition};
pub use domain::portfolio::{
    FeedMode, PortfolioAggregator, RiskSnapshot, RiskStatus, RiskThresholds, SourceStatus,
};
pub use domain::position::{Asset, Exchange, Instrument, OptionTerms, OptionType, PerExchange, Position, Side};

// Application services
pub use application::services::{
    SchedulerConfig, SchedulerHandle, SnapshotPublisher, SnapshotReader, SourceRegistry,
    UpdateScheduler,
};

// Infrastructure config
pub use infrastructure::config::{ConfigError, EngineConfig};
