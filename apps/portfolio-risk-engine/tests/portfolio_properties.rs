//! Portfolio Aggregation Properties
//!
//! Property tests over randomly generated books: totals are plain sums of
//! per-position Greeks and do not depend on position order.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use portfolio_risk_engine::domain::greeks::{Greeks, GreeksEngine, ResolvedPosition};
use portfolio_risk_engine::domain::portfolio::{
    RiskStatus, ThresholdBand, classify, compute_portfolio_risk,
};
use portfolio_risk_engine::domain::position::{
    Asset, Exchange, OptionTerms, OptionType, PerExchange, Position,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

#[derive(Debug, Clone)]
enum Leg {
    Future { btc: bool, lots: i64 },
    Option { btc: bool, lots: i64, call: bool, moneyness_pct: i64, days: i64 },
}

fn leg() -> impl Strategy<Value = Leg> {
    prop_oneof![
        (any::<bool>(), -50i64..=50)
            .prop_filter("non-zero", |(_, lots)| *lots != 0)
            .prop_map(|(btc, lots)| Leg::Future { btc, lots }),
        (any::<bool>(), -50i64..=50, any::<bool>(), 70i64..=130, 1i64..=365)
            .prop_filter("non-zero", |(_, lots, ..)| *lots != 0)
            .prop_map(|(btc, lots, call, moneyness_pct, days)| Leg::Option {
                btc,
                lots,
                call,
                moneyness_pct,
                days,
            }),
    ]
}

fn to_position(exchange: Exchange, leg: &Leg) -> Position {
    match *leg {
        Leg::Future { btc, lots } => {
            let symbol = if btc { "BTCUSDT" } else { "ETHUSDT" };
            Position::future(exchange, symbol, Decimal::new(lots, 1))
        }
        Leg::Option {
            btc,
            lots,
            call,
            moneyness_pct,
            days,
        } => {
            let (underlying, spot) = if btc {
                ("BTC", Decimal::from(65_000))
            } else {
                ("ETH", Decimal::from(3_200))
            };
            let strike = (spot * Decimal::new(moneyness_pct, 2)).round_dp(0);
            let option_type = if call { OptionType::Call } else { OptionType::Put };
            let terms = OptionTerms::new(strike, now() + Duration::days(days), option_type, spot);
            Position::option(
                exchange,
                format!("{underlying}-{strike}-{}", if call { "C" } else { "P" }),
                Decimal::new(lots, 1),
                terms,
            )
        }
    }
}

fn resolve_book(legs: &[Leg]) -> PerExchange<Vec<ResolvedPosition>> {
    let engine = GreeksEngine::default();
    let (binance, bybit) = legs.split_at(legs.len() / 2);
    PerExchange {
        binance: binance
            .iter()
            .map(|leg| engine.resolve_position(to_position(Exchange::Binance, leg), now()))
            .collect(),
        bybit: bybit
            .iter()
            .map(|leg| engine.resolve_position(to_position(Exchange::Bybit, leg), now()))
            .collect(),
    }
}

fn asset_sum(book: &PerExchange<Vec<ResolvedPosition>>, asset: Asset) -> Greeks {
    book.iter()
        .flat_map(|(_, positions)| positions.iter())
        .filter(|p| p.position.asset() == Some(asset))
        .map(|p| p.greeks)
        .sum()
}

proptest! {
    #[test]
    fn asset_totals_are_sums_of_position_greeks(legs in prop::collection::vec(leg(), 0..16)) {
        let book = resolve_book(&legs);
        prop_assert!(book.iter().all(|(_, ps)| ps.iter().all(|p| !p.is_malformed())));

        let risk = compute_portfolio_risk(&book);

        prop_assert_eq!(risk.btc.greeks, asset_sum(&book, Asset::Btc));
        prop_assert_eq!(risk.eth.greeks, asset_sum(&book, Asset::Eth));
        prop_assert_eq!(
            risk.metrics.delta_exposure,
            risk.btc.greeks.delta + risk.eth.greeks.delta
        );
        prop_assert_eq!(
            risk.metrics.option_delta + risk.metrics.hedge_position.btc + risk.metrics.hedge_position.eth,
            risk.metrics.delta_exposure
        );
        prop_assert!(risk.unclassified.is_empty());
    }

    #[test]
    fn totals_do_not_depend_on_position_order(legs in prop::collection::vec(leg(), 0..16)) {
        let book = resolve_book(&legs);
        let mut reversed = book.clone();
        reversed.binance.reverse();
        reversed.bybit.reverse();

        let a = compute_portfolio_risk(&book);
        let b = compute_portfolio_risk(&reversed);

        prop_assert_eq!(a.btc, b.btc);
        prop_assert_eq!(a.eth, b.eth);
        prop_assert_eq!(a.metrics, b.metrics);
    }

    #[test]
    fn classification_is_monotonic_in_magnitude(
        safe in 0i64..1_000,
        spread in 0i64..1_000,
        x in -3_000i64..3_000,
        y in -3_000i64..3_000,
    ) {
        let band = ThresholdBand::new(Decimal::new(safe, 3), Decimal::new(safe + spread, 3));
        let (small, large) = if x.abs() <= y.abs() { (x, y) } else { (y, x) };

        let lower = classify(Decimal::new(small, 3), band);
        let upper = classify(Decimal::new(large, 3), band);

        prop_assert!(lower <= upper);
        prop_assert_eq!(classify(Decimal::new(x, 3), band), classify(Decimal::new(-x, 3), band));
        prop_assert!(upper <= RiskStatus::Breach);
    }
}
