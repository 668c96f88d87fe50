//! Exchange Positions
//!
//! Canonical representation of an open derivatives position as reported by
//! an exchange. Option-only fields live on [`OptionTerms`], carried by the
//! [`Instrument::Option`] variant, so futures and spot positions cannot hold
//! option data they never use.
//!
//! Every option field is optional: exchanges frequently omit the implied
//! volatility or the underlying price, and the Greeks engine decides how
//! each gap is filled (default policy) or reported (malformed position).

mod per_exchange;
mod symbol;

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use per_exchange::PerExchange;
pub use symbol::{ParsedOptionSymbol, parse_option_symbol, underlying_ticker};

// =============================================================================
// Enumerations
// =============================================================================

/// Supported exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    /// Binance (USD-M futures and European options).
    Binance,
    /// Bybit (linear perpetuals and USDC options).
    Bybit,
}

impl Exchange {
    /// All supported exchanges, in reporting order.
    pub const ALL: [Self; 2] = [Self::Binance, Self::Bybit];

    /// Lowercase exchange name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Binance => "binance",
            Self::Bybit => "bybit",
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Underlying assets tracked by the risk view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Asset {
    /// Bitcoin.
    Btc,
    /// Ether.
    Eth,
}

impl Asset {
    /// All tracked assets.
    pub const ALL: [Self; 2] = [Self::Btc, Self::Eth];

    /// Classify a trading symbol by underlying.
    ///
    /// Any symbol containing `BTC` maps to [`Asset::Btc`], otherwise any
    /// symbol containing `ETH` maps to [`Asset::Eth`]. Matching is case
    /// insensitive. Symbols matching neither are unclassified.
    #[must_use]
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let upper = symbol.to_uppercase();
        if upper.contains("BTC") {
            Some(Self::Btc)
        } else if upper.contains("ETH") {
            Some(Self::Eth)
        } else {
            None
        }
    }

    /// Uppercase ticker.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Btc => "BTC",
            Self::Eth => "ETH",
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Instrument category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstrumentType {
    /// Listed option.
    Option,
    /// Future or perpetual swap.
    Future,
    /// Spot holding.
    Spot,
}

/// Position direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Long position.
    Long,
    /// Short position.
    Short,
}

impl Side {
    /// Side implied by the sign of a quantity (zero counts as long).
    #[must_use]
    pub fn from_quantity(quantity: Decimal) -> Self {
        if quantity.is_sign_negative() && !quantity.is_zero() {
            Self::Short
        } else {
            Self::Long
        }
    }
}

/// Option right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionType {
    /// Call option.
    Call,
    /// Put option.
    Put,
}

// =============================================================================
// Instrument
// =============================================================================

/// Option contract terms as delivered by the source.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OptionTerms {
    /// Strike price.
    #[serde(default)]
    pub strike: Option<Decimal>,
    /// Expiry timestamp.
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
    /// Call or put.
    #[serde(default)]
    pub option_type: Option<OptionType>,
    /// Current price of the underlying.
    #[serde(default)]
    pub underlying_price: Option<Decimal>,
    /// Annualized implied volatility (0.80 = 80%).
    #[serde(default)]
    pub implied_volatility: Option<Decimal>,
    /// Annualized risk-free rate (0.05 = 5%).
    #[serde(default)]
    pub risk_free_rate: Option<Decimal>,
}

impl OptionTerms {
    /// Fully specified terms with no implied volatility or rate override.
    #[must_use]
    pub const fn new(
        strike: Decimal,
        expiry: DateTime<Utc>,
        option_type: OptionType,
        underlying_price: Decimal,
    ) -> Self {
        Self {
            strike: Some(strike),
            expiry: Some(expiry),
            option_type: Some(option_type),
            underlying_price: Some(underlying_price),
            implied_volatility: None,
            risk_free_rate: None,
        }
    }

    /// Set the implied volatility.
    #[must_use]
    pub const fn with_implied_volatility(mut self, volatility: Decimal) -> Self {
        self.implied_volatility = Some(volatility);
        self
    }

    /// Set the risk-free rate.
    #[must_use]
    pub const fn with_risk_free_rate(mut self, rate: Decimal) -> Self {
        self.risk_free_rate = Some(rate);
        self
    }

    /// Fill absent strike, expiry and right from a parsed option symbol.
    ///
    /// Values already present are never overwritten.
    pub fn fill_from_symbol(&mut self, parsed: &ParsedOptionSymbol) {
        if self.strike.is_none() {
            self.strike = Some(parsed.strike);
        }
        if self.option_type.is_none() {
            self.option_type = Some(parsed.option_type);
        }
        if self.expiry.is_none() {
            self.expiry = parsed.expiry;
        }
    }
}

/// Instrument held by a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Instrument {
    /// Option with its contract terms.
    Option(OptionTerms),
    /// Future or perpetual swap.
    Future,
    /// Spot holding.
    Spot,
}

impl Instrument {
    /// Instrument category.
    #[must_use]
    pub const fn instrument_type(&self) -> InstrumentType {
        match self {
            Self::Option(_) => InstrumentType::Option,
            Self::Future => InstrumentType::Future,
            Self::Spot => InstrumentType::Spot,
        }
    }
}

// =============================================================================
// Position
// =============================================================================

/// Identity of a position: exchange plus symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionKey {
    /// Exchange holding the position.
    pub exchange: Exchange,
    /// Exchange symbol.
    pub symbol: String,
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.exchange, self.symbol)
    }
}

/// An open position reported by an exchange.
///
/// `quantity` is signed and authoritative for risk; `side` is carried for
/// display and cross-checked by the Greeks engine. `mark_price`,
/// `unrealized_pnl` and `margin` are taken as reported by the source and are
/// only summed by the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Exchange holding the position.
    pub exchange: Exchange,
    /// Exchange symbol (e.g. `BTCUSDT`, `BTC-260130-70000-C`).
    pub symbol: String,
    /// Reported direction.
    pub side: Side,
    /// Signed contract quantity (negative = short).
    pub quantity: Decimal,
    /// Held instrument.
    #[serde(flatten)]
    pub instrument: Instrument,
    /// Mark price of the instrument's underlying notional.
    #[serde(default)]
    pub mark_price: Option<Decimal>,
    /// Source-reported unrealized P&L.
    #[serde(default)]
    pub unrealized_pnl: Option<Decimal>,
    /// Source-reported margin in use.
    #[serde(default)]
    pub margin: Option<Decimal>,
}

impl Position {
    /// Create a position with side derived from the quantity sign.
    #[must_use]
    pub fn new(
        exchange: Exchange,
        symbol: impl Into<String>,
        quantity: Decimal,
        instrument: Instrument,
    ) -> Self {
        Self {
            exchange,
            symbol: symbol.into(),
            side: Side::from_quantity(quantity),
            quantity,
            instrument,
            mark_price: None,
            unrealized_pnl: None,
            margin: None,
        }
    }

    /// Create a futures position.
    #[must_use]
    pub fn future(exchange: Exchange, symbol: impl Into<String>, quantity: Decimal) -> Self {
        Self::new(exchange, symbol, quantity, Instrument::Future)
    }

    /// Create a spot position.
    #[must_use]
    pub fn spot(exchange: Exchange, symbol: impl Into<String>, quantity: Decimal) -> Self {
        Self::new(exchange, symbol, quantity, Instrument::Spot)
    }

    /// Create an option position.
    #[must_use]
    pub fn option(
        exchange: Exchange,
        symbol: impl Into<String>,
        quantity: Decimal,
        terms: OptionTerms,
    ) -> Self {
        Self::new(exchange, symbol, quantity, Instrument::Option(terms))
    }

    /// Override the reported side.
    #[must_use]
    pub const fn with_side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    /// Set the mark price.
    #[must_use]
    pub const fn with_mark_price(mut self, price: Decimal) -> Self {
        self.mark_price = Some(price);
        self
    }

    /// Set the unrealized P&L.
    #[must_use]
    pub const fn with_unrealized_pnl(mut self, pnl: Decimal) -> Self {
        self.unrealized_pnl = Some(pnl);
        self
    }

    /// Set the margin in use.
    #[must_use]
    pub const fn with_margin(mut self, margin: Decimal) -> Self {
        self.margin = Some(margin);
        self
    }

    /// Position identity.
    #[must_use]
    pub fn key(&self) -> PositionKey {
        PositionKey {
            exchange: self.exchange,
            symbol: self.symbol.clone(),
        }
    }

    /// Instrument category.
    #[must_use]
    pub const fn instrument_type(&self) -> InstrumentType {
        self.instrument.instrument_type()
    }

    /// Underlying asset, if the symbol maps to a tracked one.
    #[must_use]
    pub fn asset(&self) -> Option<Asset> {
        Asset::from_symbol(&self.symbol)
    }

    /// Whether the reported side agrees with the quantity sign.
    #[must_use]
    pub fn side_matches_quantity(&self) -> bool {
        self.quantity.is_zero() || Side::from_quantity(self.quantity) == self.side
    }

    /// Price used for notional: the mark price, or the option's underlying
    /// price when no mark is reported.
    #[must_use]
    pub fn notional_price(&self) -> Option<Decimal> {
        self.mark_price.or(match &self.instrument {
            Instrument::Option(terms) => terms.underlying_price,
            Instrument::Future | Instrument::Spot => None,
        })
    }

    /// Signed notional (`quantity × price`), zero when no price is known.
    ///
    /// Saturates at the decimal range on overflow.
    #[must_use]
    pub fn signed_notional(&self) -> Decimal {
        self.notional_price().map_or(Decimal::ZERO, |price| {
            self.quantity.checked_mul(price).unwrap_or_else(|| {
                if self.quantity.is_sign_negative() == price.is_sign_negative() {
                    Decimal::MAX
                } else {
                    Decimal::MIN
                }
            })
        })
    }
}
