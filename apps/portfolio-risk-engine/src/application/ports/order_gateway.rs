//! Order Gateway Port (Driven Port)
//!
//! Interface to the collaborator that places orders on an exchange. The risk
//! engine neither validates nor executes orders; it only reacts to a
//! successful placement.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::position::{Exchange, Side};

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Market order.
    Market,
    /// Limit order.
    Limit,
}

/// Order placement request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Target exchange.
    pub exchange: Exchange,
    /// Exchange symbol.
    pub symbol: String,
    /// Buy (long) or sell (short).
    pub side: Side,
    /// Market or limit.
    pub order_type: OrderType,
    /// Order size.
    pub amount: Decimal,
    /// Limit price.
    pub price: Option<Decimal>,
}

impl OrderRequest {
    /// Market order.
    #[must_use]
    pub fn market(exchange: Exchange, symbol: impl Into<String>, side: Side, amount: Decimal) -> Self {
        Self {
            exchange,
            symbol: symbol.into(),
            side,
            order_type: OrderType::Market,
            amount,
            price: None,
        }
    }

    /// Limit order.
    #[must_use]
    pub fn limit(
        exchange: Exchange,
        symbol: impl Into<String>,
        side: Side,
        amount: Decimal,
        price: Decimal,
    ) -> Self {
        Self {
            exchange,
            symbol: symbol.into(),
            side,
            order_type: OrderType::Limit,
            amount,
            price: Some(price),
        }
    }
}

/// Order placement acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAck {
    /// Exchange-assigned order id.
    pub order_id: String,
}

/// Order placement error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    /// The exchange rejected the order.
    #[error("Order rejected: {reason}")]
    Rejected {
        /// Rejection reason.
        reason: String,
    },

    /// The exchange could not be reached.
    #[error("Order gateway unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },
}

/// Port for placing orders.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Place an order.
    async fn place_order(&self, request: OrderRequest) -> Result<OrderAck, OrderError>;
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn limit_order_carries_price() {
        let order = OrderRequest::limit(Exchange::Bybit, "ETHUSDT", Side::Short, dec!(1), dec!(3300));
        assert_eq!(order.order_type, OrderType::Limit);
        assert_eq!(order.price, Some(dec!(3300)));

        let order = OrderRequest::market(Exchange::Binance, "BTCUSDT", Side::Long, dec!(0.1));
        assert_eq!(order.order_type, OrderType::Market);
        assert!(order.price.is_none());
    }
}
