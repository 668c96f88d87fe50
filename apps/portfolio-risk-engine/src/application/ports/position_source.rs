//! Position Source Port (Driven Port)
//!
//! Interface for fetching the open positions of one exchange.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::position::{Exchange, Position};

/// Why a source could not deliver positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    /// The fetch exceeded its deadline.
    Timeout,
    /// Credentials were rejected.
    Authentication,
    /// The exchange throttled the request.
    RateLimited,
    /// No source is configured for the exchange.
    NotConfigured,
    /// Synthetic mode is forced by configuration.
    ForcedSynthetic,
    /// Any other failure.
    Unavailable(String),
}

impl UnavailableReason {
    /// Short label, suitable as a metric label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Authentication => "authentication",
            Self::RateLimited => "rate_limited",
            Self::NotConfigured => "not_configured",
            Self::ForcedSynthetic => "forced_synthetic",
            Self::Unavailable(_) => "unavailable",
        }
    }
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(detail) => write!(f, "unavailable: {detail}"),
            other => f.write_str(other.label()),
        }
    }
}

/// A source failed to deliver positions for an exchange.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{exchange} positions unavailable: {reason}")]
pub struct SourceUnavailable {
    /// Exchange that was queried.
    pub exchange: Exchange,
    /// Failure reason.
    pub reason: UnavailableReason,
}

impl SourceUnavailable {
    /// Create an error.
    #[must_use]
    pub const fn new(exchange: Exchange, reason: UnavailableReason) -> Self {
        Self { exchange, reason }
    }

    /// Generic failure with a detail message.
    #[must_use]
    pub fn unavailable(exchange: Exchange, detail: impl Into<String>) -> Self {
        Self::new(exchange, UnavailableReason::Unavailable(detail.into()))
    }
}

/// Port for fetching positions.
///
/// Records may be partial; filling or rejecting missing option fields is the
/// Greeks engine's job.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Source name for logs.
    fn name(&self) -> &'static str;

    /// Fetch the open positions held on `exchange`.
    async fn fetch_positions(&self, exchange: Exchange) -> Result<Vec<Position>, SourceUnavailable>;
}
