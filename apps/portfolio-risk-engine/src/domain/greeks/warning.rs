//! Position warnings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::position::{Exchange, Position};
use crate::domain::pricing::PricingError;

/// Reasons a position cannot be priced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedPosition {
    /// A required option field is absent.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A field is present but unusable.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// Quantity is zero.
    #[error("quantity is zero")]
    ZeroQuantity,

    /// The pricing model rejected the inputs.
    #[error("pricing failed: {0}")]
    Computation(#[from] PricingError),
}

/// Category of a position warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Position could not be priced; Greeks are zero.
    Malformed,
    /// Reported side disagrees with the quantity sign.
    SideMismatch,
    /// Symbol maps to no tracked asset.
    Unclassified,
}

/// A problem attached to one position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionWarning {
    /// Exchange holding the position.
    pub exchange: Exchange,
    /// Position symbol.
    pub symbol: String,
    /// Warning category.
    pub kind: WarningKind,
    /// Human-readable reason.
    pub reason: String,
}

impl PositionWarning {
    /// Warning for a position.
    #[must_use]
    pub fn new(position: &Position, kind: WarningKind, reason: impl Into<String>) -> Self {
        Self {
            exchange: position.exchange,
            symbol: position.symbol.clone(),
            kind,
            reason: reason.into(),
        }
    }

    /// Warning for a position that could not be priced.
    #[must_use]
    pub fn malformed(position: &Position, error: &MalformedPosition) -> Self {
        Self::new(position, WarningKind::Malformed, error.to_string())
    }
}
