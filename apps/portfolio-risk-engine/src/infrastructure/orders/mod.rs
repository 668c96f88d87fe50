//! Paper Order Gateway
//!
//! Local `OrderGateway` that acknowledges orders without touching an
//! exchange. Placed orders are kept for inspection, which makes it the
//! gateway of choice for synthetic runs and tests of the refresh-on-order
//! flow.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::application::ports::{OrderAck, OrderError, OrderGateway, OrderRequest, OrderType};

/// Order accepted by the paper gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperFill {
    /// Assigned order id.
    pub order_id: String,
    /// Original request.
    pub request: OrderRequest,
}

/// In-process order gateway.
#[derive(Debug, Default)]
pub struct PaperOrderGateway {
    fills: Mutex<Vec<PaperFill>>,
    halted: AtomicBool,
}

impl PaperOrderGateway {
    /// Create an empty gateway.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Orders accepted so far, oldest first.
    #[must_use]
    pub fn fills(&self) -> Vec<PaperFill> {
        self.fills.lock().clone()
    }

    /// Refuse every order until [`Self::resume`] is called.
    pub fn halt(&self) {
        self.halted.store(true, Ordering::Release);
    }

    /// Accept orders again.
    pub fn resume(&self) {
        self.halted.store(false, Ordering::Release);
    }

    fn check(request: &OrderRequest) -> Result<(), OrderError> {
        if request.amount <= Decimal::ZERO {
            return Err(OrderError::Rejected {
                reason: format!("amount must be positive, got {}", request.amount),
            });
        }
        if request.order_type == OrderType::Limit
            && !request.price.is_some_and(|p| p > Decimal::ZERO)
        {
            return Err(OrderError::Rejected {
                reason: "limit order requires a positive price".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl OrderGateway for PaperOrderGateway {
    async fn place_order(&self, request: OrderRequest) -> Result<OrderAck, OrderError> {
        if self.halted.load(Ordering::Acquire) {
            return Err(OrderError::Unavailable {
                message: "paper trading halted".to_string(),
            });
        }
        Self::check(&request)?;

        let order_id = Uuid::new_v4().to_string();
        tracing::info!(
            order_id = %order_id,
            exchange = %request.exchange,
            symbol = %request.symbol,
            side = ?request.side,
            amount = %request.amount,
            "Paper order accepted"
        );
        self.fills.lock().push(PaperFill {
            order_id: order_id.clone(),
            request,
        });
        Ok(OrderAck { order_id })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::position::{Exchange, Side};

    #[tokio::test]
    async fn accepts_and_records_orders() {
        let gateway = PaperOrderGateway::new();
        let request = OrderRequest::market(Exchange::Binance, "BTCUSDT", Side::Long, dec!(0.25));

        let ack = gateway.place_order(request.clone()).await.unwrap();

        assert!(Uuid::parse_str(&ack.order_id).is_ok());
        let fills = gateway.fills();
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].order_id, ack.order_id);
        assert_eq!(fills[0].request, request);
    }

    #[tokio::test]
    async fn rejects_non_positive_amount_and_missing_limit_price() {
        let gateway = PaperOrderGateway::new();

        let zero = OrderRequest::market(Exchange::Bybit, "ETHUSDT", Side::Short, Decimal::ZERO);
        assert!(matches!(
            gateway.place_order(zero).await,
            Err(OrderError::Rejected { .. })
        ));

        let mut limit = OrderRequest::limit(Exchange::Bybit, "ETHUSDT", Side::Short, dec!(1), dec!(3300));
        limit.price = None;
        assert!(matches!(
            gateway.place_order(limit).await,
            Err(OrderError::Rejected { .. })
        ));
        assert!(gateway.fills().is_empty());
    }

    #[tokio::test]
    async fn halted_gateway_is_unavailable() {
        let gateway = PaperOrderGateway::new();
        let request = OrderRequest::market(Exchange::Binance, "BTCUSDT", Side::Long, dec!(1));

        gateway.halt();
        assert!(matches!(
            gateway.place_order(request.clone()).await,
            Err(OrderError::Unavailable { .. })
        ));

        gateway.resume();
        assert!(gateway.place_order(request).await.is_ok());
    }
}
