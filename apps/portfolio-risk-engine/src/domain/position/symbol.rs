//! Option symbol parsing.
//!
//! Two layouts are recognised:
//!
//! - `UNDERLYING-STRIKE-RIGHT[-YYYYMMDD]` (e.g. `BTC-50000-C-20260130`)
//! - `UNDERLYING-YYMMDD-STRIKE-RIGHT` (Binance/Bybit style, e.g. `BTC-260130-50000-C`)
//!
//! Expiry dates carry no time of day and resolve to 00:00 UTC.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use super::OptionType;

/// Contract terms recovered from an option symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedOptionSymbol {
    /// Underlying ticker (e.g. `BTC`).
    pub underlying: String,
    /// Strike price.
    pub strike: Decimal,
    /// Call or put.
    pub option_type: OptionType,
    /// Expiry, when the symbol encodes one.
    pub expiry: Option<DateTime<Utc>>,
}

/// Parse an option symbol, returning `None` for anything that is not one.
#[must_use]
pub fn parse_option_symbol(symbol: &str) -> Option<ParsedOptionSymbol> {
    let parts: Vec<&str> = symbol.split('-').collect();
    if parts.len() < 3 {
        return None;
    }
    let underlying = parts[0].to_uppercase();

    // UNDERLYING-YYMMDD-STRIKE-RIGHT
    if parts.len() == 4
        && let Some(expiry) = parse_compact_date(parts[1])
        && let Some(option_type) = parse_right(parts[3])
    {
        let strike = parts[2].parse::<Decimal>().ok()?;
        return Some(ParsedOptionSymbol {
            underlying,
            strike,
            option_type,
            expiry: Some(expiry),
        });
    }

    // UNDERLYING-STRIKE-RIGHT[-YYYYMMDD]
    let strike = parts[1].parse::<Decimal>().ok()?;
    let option_type = parse_right(parts[2])?;
    let expiry = parts.get(3).and_then(|raw| parse_compact_date(raw));

    Some(ParsedOptionSymbol {
        underlying,
        strike,
        option_type,
        expiry,
    })
}

/// Underlying ticker of any symbol.
///
/// Option symbols yield their parsed underlying. Other symbols drop
/// separators and a trailing `PERP`, `USDT` or `USD` quote suffix, so
/// `BTCUSDT`, `BTC/USDT:USDT` and `BTC-PERP` all yield `BTC`.
#[must_use]
pub fn underlying_ticker(symbol: &str) -> String {
    if let Some(parsed) = parse_option_symbol(symbol) {
        return parsed.underlying;
    }
    let base = symbol.split([':', '/']).next().unwrap_or(symbol);
    let mut ticker: String = base
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_uppercase();
    for suffix in ["PERP", "USDT", "USD"] {
        if ticker.len() > suffix.len()
            && let Some(stripped) = ticker.strip_suffix(suffix)
        {
            ticker = stripped.to_string();
        }
    }
    ticker
}

fn parse_right(raw: &str) -> Option<OptionType> {
    match raw.to_uppercase().as_str() {
        "C" | "CALL" => Some(OptionType::Call),
        "P" | "PUT" => Some(OptionType::Put),
        _ => None,
    }
}

fn parse_compact_date(raw: &str) -> Option<DateTime<Utc>> {
    if !raw.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let date = match raw.len() {
        8 => NaiveDate::parse_from_str(raw, "%Y%m%d").ok()?,
        6 => NaiveDate::parse_from_str(raw, "%y%m%d").ok()?,
        _ => return None,
    };
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}
