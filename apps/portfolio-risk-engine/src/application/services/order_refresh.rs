//! Order Refresh Service
//!
//! Forwards orders to the [`OrderGateway`] and requests an out-of-cycle
//! snapshot once the gateway accepts one, so the dashboard reflects the new
//! position without waiting for the next tick.

use std::sync::Arc;

use crate::application::ports::{OrderAck, OrderError, OrderGateway, OrderRequest};
use crate::application::services::RefreshTrigger;

/// Places orders and refreshes the risk view after each success.
pub struct OrderRefreshService {
    gateway: Arc<dyn OrderGateway>,
    refresh: Arc<RefreshTrigger>,
}

impl std::fmt::Debug for OrderRefreshService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderRefreshService").finish_non_exhaustive()
    }
}

impl OrderRefreshService {
    /// Create the service.
    #[must_use]
    pub fn new(gateway: Arc<dyn OrderGateway>, refresh: Arc<RefreshTrigger>) -> Self {
        Self { gateway, refresh }
    }

    /// Place an order; on success request a refresh.
    pub async fn place_order(&self, request: OrderRequest) -> Result<OrderAck, OrderError> {
        let exchange = request.exchange;
        let symbol = request.symbol.clone();

        match self.gateway.place_order(request).await {
            Ok(ack) => {
                tracing::info!(
                    exchange = %exchange,
                    symbol = %symbol,
                    order_id = %ack.order_id,
                    "Order placed, refreshing risk snapshot"
                );
                self.refresh
                    .request(format!("order {} placed on {exchange} {symbol}", ack.order_id));
                Ok(ack)
            }
            Err(error) => {
                tracing::warn!(
                    exchange = %exchange,
                    symbol = %symbol,
                    error = %error,
                    "Order placement failed"
                );
                Err(error)
            }
        }
    }
}
