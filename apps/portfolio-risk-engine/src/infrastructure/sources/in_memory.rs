//! In-memory position source.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::application::ports::{PositionSource, SourceUnavailable, UnavailableReason};
use crate::domain::position::{Exchange, PerExchange, Position};

/// Position source backed by memory, with injectable failures.
#[derive(Debug, Default)]
pub struct InMemoryPositionSource {
    positions: RwLock<PerExchange<Vec<Position>>>,
    failures: RwLock<PerExchange<Option<UnavailableReason>>>,
    fetches: AtomicUsize,
}

impl InMemoryPositionSource {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source holding `positions` for `exchange`.
    #[must_use]
    pub fn with_positions(exchange: Exchange, positions: Vec<Position>) -> Self {
        let source = Self::new();
        source.set_positions(exchange, positions);
        source
    }

    /// Replace the positions of an exchange.
    pub fn set_positions(&self, exchange: Exchange, positions: Vec<Position>) {
        *self.positions.write().get_mut(exchange) = positions;
    }

    /// Make every fetch for `exchange` fail with `reason`.
    pub fn fail_with(&self, exchange: Exchange, reason: UnavailableReason) {
        *self.failures.write().get_mut(exchange) = Some(reason);
    }

    /// Clear an injected failure.
    pub fn recover(&self, exchange: Exchange) {
        *self.failures.write().get_mut(exchange) = None;
    }

    /// Number of fetches served or failed so far.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PositionSource for InMemoryPositionSource {
    fn name(&self) -> &'static str {
        "in_memory"
    }

    async fn fetch_positions(&self, exchange: Exchange) -> Result<Vec<Position>, SourceUnavailable> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        if let Some(reason) = self.failures.read().get(exchange).clone() {
            return Err(SourceUnavailable::new(exchange, reason));
        }
        Ok(self.positions.read().get(exchange).clone())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[tokio::test]
    async fn serves_positions_and_injected_failures() {
        let source = InMemoryPositionSource::with_positions(
            Exchange::Binance,
            vec![Position::future(Exchange::Binance, "BTCUSDT", dec!(1))],
        );

        assert_eq!(source.fetch_positions(Exchange::Binance).await.unwrap().len(), 1);
        assert!(source.fetch_positions(Exchange::Bybit).await.unwrap().is_empty());

        source.fail_with(Exchange::Binance, UnavailableReason::Authentication);
        let err = source.fetch_positions(Exchange::Binance).await.unwrap_err();
        assert_eq!(err.reason, UnavailableReason::Authentication);

        source.recover(Exchange::Binance);
        assert!(source.fetch_positions(Exchange::Binance).await.is_ok());
        assert_eq!(source.fetch_count(), 4);
    }
}
