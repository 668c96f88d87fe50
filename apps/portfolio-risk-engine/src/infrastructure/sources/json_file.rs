//! JSON File Position Source
//!
//! Reads one JSON array of position records per exchange, re-reading the
//! file on every fetch so an external process can keep it current.
//!
//! Records may omit `exchange` (the file's exchange is assumed) and `side`
//! (derived from the quantity sign). Option strike, right and expiry missing
//! from a record are recovered from the symbol when it parses as an option
//! symbol.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::application::ports::{PositionSource, SourceUnavailable, UnavailableReason};
use crate::domain::position::{
    Exchange, Instrument, PerExchange, Position, Side, parse_option_symbol,
};

#[derive(Debug, Deserialize)]
struct PositionRecord {
    #[serde(default)]
    exchange: Option<Exchange>,
    symbol: String,
    #[serde(default)]
    side: Option<Side>,
    quantity: Decimal,
    #[serde(flatten)]
    instrument: Instrument,
    #[serde(default)]
    mark_price: Option<Decimal>,
    #[serde(default)]
    unrealized_pnl: Option<Decimal>,
    #[serde(default)]
    margin: Option<Decimal>,
}

impl PositionRecord {
    fn into_position(self, exchange: Exchange) -> Position {
        let mut instrument = self.instrument;
        if let Instrument::Option(terms) = &mut instrument
            && let Some(parsed) = parse_option_symbol(&self.symbol)
        {
            terms.fill_from_symbol(&parsed);
        }

        Position {
            exchange,
            side: self.side.unwrap_or_else(|| Side::from_quantity(self.quantity)),
            symbol: self.symbol,
            quantity: self.quantity,
            instrument,
            mark_price: self.mark_price,
            unrealized_pnl: self.unrealized_pnl,
            margin: self.margin,
        }
    }
}

/// Position source reading one JSON file per exchange.
#[derive(Debug, Clone, Default)]
pub struct JsonFilePositionSource {
    paths: PerExchange<Option<PathBuf>>,
}

impl JsonFilePositionSource {
    /// Create a source from per-exchange paths.
    #[must_use]
    pub const fn new(paths: PerExchange<Option<PathBuf>>) -> Self {
        Self { paths }
    }

    /// Whether a file is configured for `exchange`.
    #[must_use]
    pub const fn is_configured(&self, exchange: Exchange) -> bool {
        self.paths.get(exchange).is_some()
    }

    /// File configured for `exchange`.
    #[must_use]
    pub fn path(&self, exchange: Exchange) -> Option<&Path> {
        self.paths.get(exchange).as_deref()
    }
}

#[async_trait]
impl PositionSource for JsonFilePositionSource {
    fn name(&self) -> &'static str {
        "json_file"
    }

    async fn fetch_positions(&self, exchange: Exchange) -> Result<Vec<Position>, SourceUnavailable> {
        let path = self
            .path(exchange)
            .ok_or(SourceUnavailable::new(exchange, UnavailableReason::NotConfigured))?;

        let bytes = tokio::fs::read(path).await.map_err(|e| {
            SourceUnavailable::unavailable(exchange, format!("read {}: {e}", path.display()))
        })?;

        let records: Vec<PositionRecord> = serde_json::from_slice(&bytes).map_err(|e| {
            SourceUnavailable::unavailable(exchange, format!("parse {}: {e}", path.display()))
        })?;

        let mut positions = Vec::with_capacity(records.len());
        for record in records {
            match record.exchange {
                Some(other) if other != exchange => {
                    tracing::warn!(
                        file = %path.display(),
                        expected = %exchange,
                        found = %other,
                        symbol = %record.symbol,
                        "Skipping position recorded for another exchange"
                    );
                }
                _ => positions.push(record.into_position(exchange)),
            }
        }

        tracing::debug!(
            exchange = %exchange,
            file = %path.display(),
            positions = positions.len(),
            "Positions loaded from file"
        );
        Ok(positions)
    }
}
