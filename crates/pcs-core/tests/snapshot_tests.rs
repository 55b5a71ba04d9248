#![allow(clippy::expect_used)]

use chrono::NaiveDate;
use pcs_core::error::PcsError;
use pcs_core::ledger::Ledger;
use pcs_core::snapshot::{CostBasis, Snapshot};
use pcs_core::transaction::{Command, Transaction};
use pcs_money::{Currency, Money};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn date(s: &str) -> NaiveDate {
    s.parse().expect("valid date")
}

fn txn(day: &str, command: Command) -> Transaction {
    Transaction::new(date(day), command)
}

fn usd(amount: Decimal) -> Money {
    Money::new(amount, Currency::USD)
}

fn declare(ticker: &str, id: &str) -> Command {
    Command::Declare {
        ticker: ticker.to_string(),
        id: id.parse().expect("valid id"),
        currency: Currency::USD.into(),
    }
}

fn buy(ticker: &str, quantity: Decimal, amount: Decimal) -> Command {
    Command::Buy {
        security: ticker.to_string(),
        quantity,
        amount: usd(amount),
    }
}

fn sell(ticker: &str, quantity: Decimal, amount: Decimal) -> Command {
    Command::Sell {
        security: ticker.to_string(),
        quantity,
        amount: usd(amount),
    }
}

fn ledger_of(txns: impl IntoIterator<Item = Transaction>) -> Ledger {
    let mut ledger = Ledger::new();
    ledger.append(txns).expect("valid ledger");
    ledger
}

#[test]
fn test_cash_flows_per_currency() {
    let ledger = ledger_of([
        txn(
            "2025-01-01",
            Command::Deposit {
                amount: Money::new(dec!(10000), Currency::EUR),
            },
        ),
        txn(
            "2025-01-01",
            Command::Deposit {
                amount: usd(dec!(2000)),
            },
        ),
        txn(
            "2025-01-02",
            Command::Withdraw {
                amount: usd(dec!(300)),
            },
        ),
        txn(
            "2025-01-03",
            Command::Convert {
                from: Money::new(dec!(1100), Currency::EUR),
                to: usd(dec!(1200)),
            },
        ),
    ]);

    let snapshot = Snapshot::new(&ledger, date("2025-01-03")).expect("snapshot");
    assert_eq!(snapshot.cash(Currency::EUR).amount, dec!(8900));
    assert_eq!(snapshot.cash(Currency::USD).amount, dec!(2900));
}

#[test]
fn test_snapshot_ignores_future_transactions() {
    let ledger = ledger_of([
        txn(
            "2025-01-01",
            Command::Deposit {
                amount: usd(dec!(100)),
            },
        ),
        txn(
            "2025-02-01",
            Command::Deposit {
                amount: usd(dec!(900)),
            },
        ),
    ]);

    let snapshot = Snapshot::new(&ledger, date("2025-01-15")).expect("snapshot");
    assert_eq!(snapshot.cash(Currency::USD).amount, dec!(100));
}

#[test]
fn test_fifo_vs_average_cost_basis() {
    // Buy 10 @ 100, buy 10 @ 120, sell 5 @ 150.
    let ledger = ledger_of([
        txn("2025-01-01", declare("ACME", "acme-private")),
        txn("2025-01-02", buy("ACME", dec!(10), dec!(1000))),
        txn("2025-01-03", buy("ACME", dec!(10), dec!(1200))),
        txn("2025-01-04", sell("ACME", dec!(5), dec!(750))),
    ]);

    let snapshot = Snapshot::new(&ledger, date("2025-01-04")).expect("snapshot");

    let fifo: Vec<_> = snapshot
        .realized_between(CostBasis::Fifo, date("2025-01-01"), date("2025-01-04"))
        .collect();
    assert_eq!(fifo.len(), 1);
    assert_eq!(fifo[0].gain(), dec!(250));

    let average: Vec<_> = snapshot
        .realized_between(CostBasis::Average, date("2025-01-01"), date("2025-01-04"))
        .collect();
    assert_eq!(average.len(), 1);
    assert_eq!(average[0].gain(), dec!(200));

    // Remaining position: 15 shares.
    let position = snapshot.position("ACME").expect("position");
    assert_eq!(position.quantity(), dec!(15));
    // FIFO kept 5 @ 100 and 10 @ 120; average kept 15 @ 110.
    assert_eq!(position.cost_basis(CostBasis::Fifo).amount, dec!(1700));
    assert_eq!(position.cost_basis(CostBasis::Average).amount, dec!(1650));
}

#[test]
fn test_lot_quantities_always_sum_to_position() {
    let ledger = ledger_of([
        txn("2025-01-01", declare("ACME", "acme-private")),
        txn("2025-01-02", buy("ACME", dec!(10), dec!(1000))),
        txn("2025-01-03", buy("ACME", dec!(7), dec!(840))),
        txn("2025-01-04", sell("ACME", dec!(12), dec!(1800))),
    ]);

    let snapshot = Snapshot::new(&ledger, date("2025-01-04")).expect("snapshot");
    let position = snapshot.position("ACME").expect("position");
    let lot_sum: Decimal = position.lots().map(|lot| lot.quantity).sum();
    assert_eq!(lot_sum, position.quantity());
    assert_eq!(position.quantity(), dec!(5));
}

#[test]
fn test_sell_to_zero_then_oversell() {
    let base = [
        txn("2025-01-01", declare("ACME", "acme-private")),
        txn("2025-01-02", buy("ACME", dec!(10), dec!(1000))),
        txn("2025-01-03", sell("ACME", dec!(10), dec!(1500))),
    ];

    let ledger = ledger_of(base.clone());
    let snapshot = Snapshot::new(&ledger, date("2025-01-03")).expect("snapshot");
    let position = snapshot.position("ACME").expect("position");
    assert!(!position.is_open());
    assert_eq!(position.quantity(), Decimal::ZERO);

    // One more share than held.
    let mut txns = base.to_vec();
    txns.push(txn("2025-01-04", sell("ACME", dec!(1), dec!(150))));
    let ledger = ledger_of(txns);
    let err = Snapshot::new(&ledger, date("2025-01-04")).expect_err("oversell");
    assert!(matches!(err, PcsError::OverSell { ticker, .. } if ticker == "ACME"));
}

#[test]
fn test_same_day_buy_then_sell_realizes_against_fresh_lot() {
    let ledger = ledger_of([
        txn("2025-01-01", declare("ACME", "acme-private")),
        txn("2025-01-02", buy("ACME", dec!(10), dec!(1000))),
        txn("2025-01-02", sell("ACME", dec!(4), dec!(600))),
    ]);

    let snapshot = Snapshot::new(&ledger, date("2025-01-02")).expect("snapshot");
    let fifo: Vec<_> = snapshot
        .realized_between(CostBasis::Fifo, date("2025-01-01"), date("2025-01-02"))
        .collect();
    assert_eq!(fifo.len(), 1);
    // 600 - 4 x 100 from the lot bought earlier the same day.
    assert_eq!(fifo[0].gain(), dec!(200));
}

#[test]
fn test_reopened_position_starts_fresh_lots() {
    let ledger = ledger_of([
        txn("2025-01-01", declare("ACME", "acme-private")),
        txn("2025-01-02", buy("ACME", dec!(10), dec!(1000))),
        txn("2025-01-03", sell("ACME", dec!(10), dec!(1500))),
        txn("2025-01-04", buy("ACME", dec!(4), dec!(520))),
    ]);

    let snapshot = Snapshot::new(&ledger, date("2025-01-04")).expect("snapshot");
    let position = snapshot.position("ACME").expect("position");
    assert_eq!(position.quantity(), dec!(4));
    assert_eq!(position.lots().count(), 1);
    assert_eq!(position.cost_basis(CostBasis::Fifo).amount, dec!(520));
    // Average basis resumes from the new buy alone.
    assert_eq!(position.cost_basis(CostBasis::Average).amount, dec!(520));
}

#[test]
fn test_dividend_uses_held_quantity_in_ledger_order() {
    let ledger = ledger_of([
        txn("2025-01-01", declare("ACME", "acme-private")),
        txn("2025-01-02", buy("ACME", dec!(10), dec!(1000))),
        // Same-day buy recorded before the dividend: its shares count.
        txn("2025-01-05", buy("ACME", dec!(5), dec!(550))),
        txn(
            "2025-01-05",
            Command::Dividend {
                security: "ACME".to_string(),
                amount: usd(dec!(2)),
            },
        ),
    ]);

    let snapshot = Snapshot::new(&ledger, date("2025-01-05")).expect("snapshot");
    let dividends = snapshot.dividends();
    assert_eq!(dividends.len(), 1);
    assert_eq!(dividends[0].amount, usd(dec!(30)));
    // Cash: -1000 - 550 + 30.
    assert_eq!(snapshot.cash(Currency::USD).amount, dec!(-1520));
}

#[test]
fn test_dividend_with_no_holdings_leaves_no_trace() {
    let ledger = ledger_of([
        txn("2025-01-01", declare("ACME", "acme-private")),
        txn(
            "2025-01-05",
            Command::Dividend {
                security: "ACME".to_string(),
                amount: usd(dec!(2)),
            },
        ),
    ]);

    let snapshot = Snapshot::new(&ledger, date("2025-01-05")).expect("snapshot");
    assert!(snapshot.dividends().is_empty());
    assert_eq!(snapshot.cash(Currency::USD).amount, Decimal::ZERO);
}

#[test]
fn test_split_doubles_quantity_and_preserves_cost() {
    let ledger = ledger_of([
        txn("2025-01-01", declare("ACME", "acme-private")),
        txn("2025-01-02", buy("ACME", dec!(10), dec!(1000))),
        txn(
            "2025-01-05",
            Command::Split {
                id: "acme-private".parse().expect("id"),
                num: 2,
                den: 1,
            },
        ),
    ]);

    let snapshot = Snapshot::new(&ledger, date("2025-01-05")).expect("snapshot");
    let position = snapshot.position("ACME").expect("position");
    assert_eq!(position.quantity(), dec!(20));

    let lots: Vec<_> = position.lots().collect();
    assert_eq!(lots.len(), 1);
    assert_eq!(lots[0].quantity, dec!(20));
    assert_eq!(lots[0].unit_cost, dec!(50));
    assert_eq!(position.cost_basis(CostBasis::Fifo).amount, dec!(1000));
    assert_eq!(position.cost_basis(CostBasis::Average).amount, dec!(1000));
}

#[test]
fn test_three_for_two_split_preserves_total_cost() {
    let ledger = ledger_of([
        txn("2025-01-01", declare("ACME", "acme-private")),
        txn("2025-01-02", buy("ACME", dec!(7), dec!(1000))),
        txn(
            "2025-01-05",
            Command::Split {
                id: "acme-private".parse().expect("id"),
                num: 3,
                den: 2,
            },
        ),
    ]);

    let snapshot = Snapshot::new(&ledger, date("2025-01-05")).expect("snapshot");
    let position = snapshot.position("ACME").expect("position");
    assert_eq!(position.quantity(), dec!(10.5));
    let total: Decimal = position
        .lots()
        .map(|lot| lot.quantity * lot.unit_cost)
        .sum();
    // Total cost within one ulp of the decimal precision.
    assert!((total - dec!(1000)).abs() < dec!(0.000000000000000000000001));
}

#[test]
fn test_counterparty_accrual_and_currency_conflict() {
    let ledger = ledger_of([
        txn(
            "2025-03-01",
            Command::Deposit {
                amount: usd(dec!(5000)),
            },
        ),
        txn(
            "2025-03-06",
            Command::Accrue {
                counterparty: "TaxAccount".to_string(),
                amount: usd(dec!(-60)),
            },
        ),
    ]);

    let snapshot = Snapshot::new(&ledger, date("2025-03-06")).expect("snapshot");
    let counterparties = snapshot.counterparty_balances();
    assert_eq!(counterparties.len(), 1);
    assert_eq!(counterparties[0].0, "TaxAccount");
    assert_eq!(counterparties[0].1, usd(dec!(-60)));

    // Accruing in a different currency on the same account is rejected.
    let ledger = ledger_of([
        txn(
            "2025-03-06",
            Command::Accrue {
                counterparty: "TaxAccount".to_string(),
                amount: usd(dec!(-60)),
            },
        ),
        txn(
            "2025-03-07",
            Command::Accrue {
                counterparty: "TaxAccount".to_string(),
                amount: Money::new(dec!(10), Currency::EUR),
            },
        ),
    ]);
    let err = Snapshot::new(&ledger, date("2025-03-07")).expect_err("conflict");
    assert!(matches!(err, PcsError::CurrencyConflict { name, .. } if name == "TaxAccount"));
}

#[test]
fn test_cash_reconciles_with_tapes() {
    // The §8 conservation property: cash equals signed flows, and the
    // realized tape is consistent with it.
    let ledger = ledger_of([
        txn("2025-01-01", declare("ACME", "acme-private")),
        txn(
            "2025-01-01",
            Command::Deposit {
                amount: usd(dec!(10000)),
            },
        ),
        txn("2025-01-02", buy("ACME", dec!(10), dec!(1000))),
        txn("2025-01-03", sell("ACME", dec!(4), dec!(480))),
        txn(
            "2025-01-04",
            Command::Dividend {
                security: "ACME".to_string(),
                amount: usd(dec!(1)),
            },
        ),
        txn(
            "2025-01-05",
            Command::Withdraw {
                amount: usd(dec!(200)),
            },
        ),
    ]);

    let snapshot = Snapshot::new(&ledger, date("2025-01-05")).expect("snapshot");
    // 10000 - 1000 + 480 + 6 - 200
    assert_eq!(snapshot.cash(Currency::USD).amount, dec!(9286));
}
