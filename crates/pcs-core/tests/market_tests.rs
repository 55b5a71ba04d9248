#![allow(clippy::expect_used)]

use chrono::NaiveDate;
use pcs_core::error::PcsError;
use pcs_core::market::{MarketData, Split};
use pcs_core::security::{Security, SecurityId};
use pcs_money::{Currency, Money};
use rust_decimal_macros::dec;

fn date(s: &str) -> NaiveDate {
    s.parse().expect("valid date")
}

fn aapl() -> Security {
    Security::new(
        "AAPL",
        "US0378331005.XNAS".parse().expect("id"),
        Currency::USD,
    )
}

fn eurusd() -> Security {
    Security::new("EURUSD", "EURUSD".parse().expect("id"), Currency::USD)
}

#[test]
fn test_set_price_requires_added_security() {
    let mut market = MarketData::new();
    let id: SecurityId = "US0378331005.XNAS".parse().expect("id");
    let err = market
        .set_price(&id, date("2025-01-02"), Money::new(dec!(100), Currency::USD))
        .expect_err("unknown security");
    assert!(matches!(err, PcsError::UnknownSecurity(_)));

    market.add(&aapl());
    market
        .set_price(&id, date("2025-01-02"), Money::new(dec!(100), Currency::USD))
        .expect("known security");
}

#[test]
fn test_add_is_idempotent() {
    let mut market = MarketData::new();
    let security = aapl();
    market.add(&security);
    market
        .set_price(
            &security.id,
            date("2025-01-02"),
            Money::new(dec!(100), Currency::USD),
        )
        .expect("set price");
    market.add(&security);
    assert_eq!(
        market.price_as_of(&security.id, date("2025-01-02")),
        Some(Money::new(dec!(100), Currency::USD))
    );
}

#[test]
fn test_price_as_of_picks_latest_on_or_before() {
    let mut market = MarketData::new();
    let security = aapl();
    market.add(&security);
    for (day, price) in [("2025-01-02", dec!(100)), ("2025-01-08", dec!(110))] {
        market
            .set_price(&security.id, date(day), Money::new(price, Currency::USD))
            .expect("set price");
    }

    assert_eq!(market.price_as_of(&security.id, date("2025-01-01")), None);
    assert_eq!(
        market.price_as_of(&security.id, date("2025-01-05")),
        Some(Money::new(dec!(100), Currency::USD))
    );
    assert_eq!(
        market.price_as_of(&security.id, date("2025-02-01")),
        Some(Money::new(dec!(110), Currency::USD))
    );
}

#[test]
fn test_fx_conversion_direct_and_reverse() {
    let mut market = MarketData::new();
    let pair = eurusd();
    market.add(&pair);
    market
        .set_price(
            &pair.id,
            date("2025-01-02"),
            Money::new(dec!(1.10), Currency::USD),
        )
        .expect("set rate");

    // Direct: EUR -> USD multiplies by the pair rate.
    let converted = market
        .convert(
            Money::new(dec!(100), Currency::EUR),
            Currency::USD,
            date("2025-01-02"),
        )
        .expect("direct");
    assert_eq!(converted, Money::new(dec!(110.0), Currency::USD));

    // Reverse: USD -> EUR divides.
    let converted = market
        .convert(
            Money::new(dec!(220), Currency::USD),
            Currency::EUR,
            date("2025-01-02"),
        )
        .expect("reverse");
    assert_eq!(converted, Money::new(dec!(200), Currency::EUR));

    // Identity.
    let same = market
        .convert(
            Money::new(dec!(5), Currency::EUR),
            Currency::EUR,
            date("2025-01-02"),
        )
        .expect("identity");
    assert_eq!(same, Money::new(dec!(5), Currency::EUR));
}

#[test]
fn test_fx_conversion_missing_pair() {
    let market = MarketData::new();
    let err = market
        .convert(
            Money::new(dec!(100), Currency::USD),
            Currency::EUR,
            date("2025-01-01"),
        )
        .expect_err("no pair");
    assert!(
        matches!(err, PcsError::NoFxRate { ref from, ref to, date: d }
            if from == "USD" && to == "EUR" && d == date("2025-01-01"))
    );
}

#[test]
fn test_splits_sorted_by_date() {
    let mut market = MarketData::new();
    let security = aapl();
    market.add(&security);
    market
        .add_split(
            &security.id,
            Split {
                date: date("2025-06-01"),
                num: 3,
                den: 1,
            },
        )
        .expect("split");
    market
        .add_split(
            &security.id,
            Split {
                date: date("2025-01-01"),
                num: 2,
                den: 1,
            },
        )
        .expect("split");

    let splits = market.splits(&security.id);
    assert_eq!(splits.len(), 2);
    assert_eq!(splits[0].date, date("2025-01-01"));
    assert_eq!(splits[0].factor(), dec!(2));
}

#[test]
fn test_import_export_import_round_trip() {
    let input = "\
{\"event\":\"price\",\"id\":\"US0378331005.XNAS\",\"date\":\"2025-01-02\",\"price\":{\"currency\":\"USD\",\"amount\":\"100\"}}
{\"event\":\"price\",\"id\":\"EURUSD\",\"date\":\"2025-01-02\",\"price\":{\"currency\":\"USD\",\"amount\":\"1.10\"}}
{\"event\":\"split\",\"id\":\"US0378331005.XNAS\",\"date\":\"2025-06-01\",\"num\":2,\"den\":1}
";
    let first = MarketData::decode(input.as_bytes()).expect("decode");
    let mut encoded = Vec::new();
    first.encode(&mut encoded).expect("encode");
    let second = MarketData::decode(encoded.as_slice()).expect("re-decode");
    assert_eq!(first, second);

    // Canonical form is stable under a second round.
    let mut encoded_again = Vec::new();
    second.encode(&mut encoded_again).expect("re-encode");
    assert_eq!(encoded, encoded_again);
}

#[test]
fn test_decode_rejects_unknown_event() {
    let input = "{\"event\":\"quote\",\"id\":\"EURUSD\",\"date\":\"2025-01-02\"}\n";
    let err = MarketData::decode(input.as_bytes()).expect_err("unknown event");
    assert!(matches!(err, PcsError::Malformed { line: 1, .. }));
}

#[test]
fn test_merge_prefers_incoming_points() {
    let base_input = "{\"event\":\"price\",\"id\":\"EURUSD\",\"date\":\"2025-01-02\",\"price\":{\"currency\":\"USD\",\"amount\":\"1.10\"}}\n";
    let incoming_input = "\
{\"event\":\"price\",\"id\":\"EURUSD\",\"date\":\"2025-01-02\",\"price\":{\"currency\":\"USD\",\"amount\":\"1.12\"}}
{\"event\":\"price\",\"id\":\"EURUSD\",\"date\":\"2025-01-03\",\"price\":{\"currency\":\"USD\",\"amount\":\"1.13\"}}
";
    let mut base = MarketData::decode(base_input.as_bytes()).expect("decode base");
    let incoming = MarketData::decode(incoming_input.as_bytes()).expect("decode incoming");
    base.merge(&incoming);

    let id: SecurityId = "EURUSD".parse().expect("id");
    assert_eq!(
        base.price_as_of(&id, date("2025-01-02")),
        Some(Money::new(dec!(1.12), Currency::USD))
    );
    assert_eq!(
        base.price_as_of(&id, date("2025-01-03")),
        Some(Money::new(dec!(1.13), Currency::USD))
    );
}
