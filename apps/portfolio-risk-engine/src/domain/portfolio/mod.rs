//! Portfolio Risk
//!
//! Aggregation of resolved positions into a [`RiskSnapshot`]:
//!
//! - [`compute_portfolio_risk`]: pure fold into per-asset and portfolio metrics
//! - [`classify`]: threshold band classification
//! - [`ActivityLog`]: bounded recent activity
//! - [`PortfolioAggregator`]: per-tick snapshot construction

mod activity;
mod aggregator;
mod classification;
mod risk;
mod snapshot;

pub use activity::{ActivityEntry, ActivityLog, ActivityStatus, DEFAULT_ACTIVITY_CAPACITY};
pub use aggregator::{PortfolioAggregator, TickContext};
pub use classification::{
    GreeksStatus, RiskStatus, RiskThresholds, StatusReport, ThresholdBand, classify,
};
pub use risk::{
    AssetRisk, HedgePositions, PortfolioRisk, RiskMetrics, compute_portfolio_risk, hedge_ratio,
};
pub use snapshot::{FeedMode, PositionView, RiskSnapshot, SourceStatus};
