//! Per-exchange container.

use serde::{Deserialize, Serialize};

use super::Exchange;

/// One value per supported exchange.
///
/// Serializes as `{ "binance": ..., "bybit": ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PerExchange<T> {
    /// Binance value.
    pub binance: T,
    /// Bybit value.
    pub bybit: T,
}

impl<T> PerExchange<T> {
    /// Build from a function of the exchange.
    pub fn from_fn(mut f: impl FnMut(Exchange) -> T) -> Self {
        Self {
            binance: f(Exchange::Binance),
            bybit: f(Exchange::Bybit),
        }
    }

    /// Value for an exchange.
    #[must_use]
    pub const fn get(&self, exchange: Exchange) -> &T {
        match exchange {
            Exchange::Binance => &self.binance,
            Exchange::Bybit => &self.bybit,
        }
    }

    /// Mutable value for an exchange.
    pub const fn get_mut(&mut self, exchange: Exchange) -> &mut T {
        match exchange {
            Exchange::Binance => &mut self.binance,
            Exchange::Bybit => &mut self.bybit,
        }
    }

    /// Iterate `(exchange, value)` pairs in reporting order.
    pub fn iter(&self) -> impl Iterator<Item = (Exchange, &T)> {
        Exchange::ALL.into_iter().map(move |exchange| (exchange, self.get(exchange)))
    }

    /// Transform every value.
    pub fn map<U>(self, mut f: impl FnMut(Exchange, T) -> U) -> PerExchange<U> {
        PerExchange {
            binance: f(Exchange::Binance, self.binance),
            bybit: f(Exchange::Bybit, self.bybit),
        }
    }
}
