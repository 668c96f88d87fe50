//! Synthetic Position Source
//!
//! Generates a realistic BTC/ETH book per exchange: options a month from
//! expiry plus futures hedges, with jittered prices and P&L. Output is a pure
//! function of the seed, the exchange, the call count for that exchange and
//! the clock, so runs with the same seed are reproducible.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::application::ports::{Clock, PositionSource, SourceUnavailable};
use crate::domain::position::{Asset, Exchange, OptionTerms, OptionType, PerExchange, Position};

/// Days until the generated options expire.
const OPTION_TENOR_DAYS: i64 = 30;

/// Margin as a fraction of notional.
const MARGIN_RATE: Decimal = dec!(0.10);

/// Maximum price jitter in basis points.
const PRICE_JITTER_BPS: i64 = 200;

enum Leg {
    Option {
        asset: Asset,
        strike: Decimal,
        option_type: OptionType,
        quantity: Decimal,
        quote_volatility: bool,
    },
    Future {
        asset: Asset,
        quantity: Decimal,
    },
}

fn book(exchange: Exchange) -> [Leg; 4] {
    match exchange {
        Exchange::Binance => [
            Leg::Option {
                asset: Asset::Btc,
                strike: dec!(70000),
                option_type: OptionType::Call,
                quantity: dec!(2),
                quote_volatility: true,
            },
            Leg::Future {
                asset: Asset::Btc,
                quantity: dec!(-0.5),
            },
            Leg::Option {
                asset: Asset::Eth,
                strike: dec!(3000),
                option_type: OptionType::Put,
                quantity: dec!(-5),
                quote_volatility: true,
            },
            Leg::Future {
                asset: Asset::Eth,
                quantity: dec!(2),
            },
        ],
        Exchange::Bybit => [
            Leg::Option {
                asset: Asset::Btc,
                strike: dec!(60000),
                option_type: OptionType::Put,
                quantity: dec!(1),
                quote_volatility: false,
            },
            Leg::Future {
                asset: Asset::Btc,
                quantity: dec!(0.3),
            },
            Leg::Option {
                asset: Asset::Eth,
                strike: dec!(3500),
                option_type: OptionType::Call,
                quantity: dec!(10),
                quote_volatility: true,
            },
            Leg::Future {
                asset: Asset::Eth,
                quantity: dec!(-3),
            },
        ],
    }
}

const fn reference_price(asset: Asset) -> Decimal {
    match asset {
        Asset::Btc => dec!(65000),
        Asset::Eth => dec!(3200),
    }
}

const fn exchange_salt(exchange: Exchange) -> u64 {
    match exchange {
        Exchange::Binance => 0x42_494E_414E_4345,
        Exchange::Bybit => 0x0042_5942_4954,
    }
}

/// Seeded generator of synthetic positions.
pub struct SyntheticPositionSource {
    seed: u64,
    clock: Arc<dyn Clock>,
    generations: PerExchange<AtomicU64>,
}

impl std::fmt::Debug for SyntheticPositionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntheticPositionSource")
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

impl SyntheticPositionSource {
    /// Create a generator.
    #[must_use]
    pub fn new(seed: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            seed,
            clock,
            generations: PerExchange::default(),
        }
    }

    /// Generate the positions of `exchange` for a given generation.
    #[must_use]
    pub fn generate(&self, exchange: Exchange, generation: u64, now: DateTime<Utc>) -> Vec<Position> {
        let mut rng = StdRng::seed_from_u64(
            self.seed ^ exchange_salt(exchange) ^ generation.wrapping_mul(0x9E37_79B9_7F4A_7C15),
        );

        let btc = jitter(&mut rng, reference_price(Asset::Btc));
        let eth = jitter(&mut rng, reference_price(Asset::Eth));
        let spot = |asset: Asset| match asset {
            Asset::Btc => btc,
            Asset::Eth => eth,
        };
        let expiry = (now + Duration::days(OPTION_TENOR_DAYS))
            .date_naive()
            .and_time(NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default())
            .and_utc();

        book(exchange)
            .into_iter()
            .map(|leg| match leg {
                Leg::Option {
                    asset,
                    strike,
                    option_type,
                    quantity,
                    quote_volatility,
                } => {
                    let right = match option_type {
                        OptionType::Call => "C",
                        OptionType::Put => "P",
                    };
                    let symbol = format!("{asset}-{}-{strike}-{right}", expiry.format("%y%m%d"));
                    let mut terms = OptionTerms::new(strike, expiry, option_type, spot(asset));
                    if quote_volatility {
                        terms = terms.with_implied_volatility(Decimal::new(rng.random_range(55..=85), 2));
                    }
                    let notional = quantity.abs() * spot(asset);
                    Position::option(exchange, symbol, quantity, terms)
                        .with_unrealized_pnl(random_pnl(&mut rng))
                        .with_margin((notional * MARGIN_RATE).round_dp(2))
                }
                Leg::Future { asset, quantity } => {
                    let price = spot(asset);
                    Position::future(exchange, format!("{asset}USDT"), quantity)
                        .with_mark_price(price)
                        .with_unrealized_pnl(random_pnl(&mut rng))
                        .with_margin((quantity.abs() * price * MARGIN_RATE).round_dp(2))
                }
            })
            .collect()
    }
}

fn jitter(rng: &mut StdRng, price: Decimal) -> Decimal {
    let bps = rng.random_range(-PRICE_JITTER_BPS..=PRICE_JITTER_BPS);
    (price * (Decimal::ONE + Decimal::new(bps, 4))).round_dp(2)
}

fn random_pnl(rng: &mut StdRng) -> Decimal {
    Decimal::new(rng.random_range(-150_000..=150_000), 2)
}

#[async_trait]
impl PositionSource for SyntheticPositionSource {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    async fn fetch_positions(&self, exchange: Exchange) -> Result<Vec<Position>, SourceUnavailable> {
        let generation = self.generations.get(exchange).fetch_add(1, Ordering::Relaxed);
        Ok(self.generate(exchange, generation, self.clock.now()))
    }
}
