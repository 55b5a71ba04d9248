//! Time-weighted return: geometric compounding between external flows.

use super::{convert_amount, position_value};
use crate::error::PcsError;
use crate::history::merged_dates;
use crate::ledger::Ledger;
use crate::market::MarketData;
use crate::snapshot::Snapshot;
use crate::transaction::Command;
use chrono::NaiveDate;
use pcs_money::Currency;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Result of a TWR computation. `twr` is a fraction (0.15 = +15%);
/// `None` means some required valuation was impossible and the return is
/// undefined for the whole period.
#[derive(Debug, Clone)]
pub(crate) struct TwrOutcome {
    pub twr: Option<Decimal>,
    pub warnings: Vec<String>,
}

impl TwrOutcome {
    fn undefined(warning: String) -> Self {
        Self {
            twr: None,
            warnings: vec![warning],
        }
    }
}

/// Portfolio-level TWR over `(from, to]`.
///
/// External flows are deposits, withdrawals, accruals, and dividend
/// credits; buys and sells are internal rebalancing. The period is
/// partitioned at each flow date: for each subperiod the return is
/// V(t⁻)/V(prev) where V(t⁻) is the end-of-day value minus that day's
/// flows. Subperiods starting from a zero value are skipped. Flow days
/// without a quote value through the last known price (`value_as_of`).
pub(crate) fn portfolio_twr(
    ledger: &Ledger,
    market: &MarketData,
    currency: Currency,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<TwrOutcome, PcsError> {
    let end = Snapshot::new(ledger, to)?;

    let mut flows: HashMap<NaiveDate, Decimal> = HashMap::new();
    for txn in ledger.transactions() {
        if txn.date <= from || txn.date > to {
            continue;
        }
        let signed = match &txn.command {
            Command::Deposit { amount } => Some(*amount),
            Command::Withdraw { amount } => Some(amount.negated()),
            Command::Accrue { amount, .. } => Some(*amount),
            _ => None,
        };
        if let Some(amount) = signed {
            match convert_amount(market, amount, currency, txn.date) {
                Ok(converted) => *flows.entry(txn.date).or_default() += converted,
                Err(warning) => return Ok(TwrOutcome::undefined(warning)),
            }
        }
    }
    for dividend in end.dividends_between(from, to) {
        match convert_amount(market, dividend.amount, currency, dividend.date) {
            Ok(converted) => *flows.entry(dividend.date).or_default() += converted,
            Err(warning) => return Ok(TwrOutcome::undefined(warning)),
        }
    }

    compound(
        |date| portfolio_value(ledger, market, currency, date),
        &flows,
        from,
        to,
    )
}

/// Per-asset TWR: the asset's own buys and sells are its external flows.
pub(crate) fn asset_twr(
    ledger: &Ledger,
    market: &MarketData,
    currency: Currency,
    ticker: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<TwrOutcome, PcsError> {
    let mut flows: HashMap<NaiveDate, Decimal> = HashMap::new();
    for txn in ledger.transactions() {
        if txn.date <= from || txn.date > to {
            continue;
        }
        let signed = match &txn.command {
            Command::Buy {
                security, amount, ..
            } if security == ticker => Some(*amount),
            Command::Sell {
                security, amount, ..
            } if security == ticker => Some(amount.negated()),
            _ => None,
        };
        if let Some(amount) = signed {
            match convert_amount(market, amount, currency, txn.date) {
                Ok(converted) => *flows.entry(txn.date).or_default() += converted,
                Err(warning) => return Ok(TwrOutcome::undefined(warning)),
            }
        }
    }

    compound(
        |date| {
            let snapshot = Snapshot::new(ledger, date)?;
            let Some(position) = snapshot.position(ticker) else {
                return Ok(Ok(Decimal::ZERO));
            };
            Ok(position_value(position, market, currency, date))
        },
        &flows,
        from,
        to,
    )
}

/// The shared compounding loop. `value_at` returns the valuation at the
/// end of a day, or a warning when a required price or rate is missing.
fn compound<F>(
    mut value_at: F,
    flows: &HashMap<NaiveDate, Decimal>,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<TwrOutcome, PcsError>
where
    F: FnMut(NaiveDate) -> Result<Result<Decimal, String>, PcsError>,
{
    let mut boundaries = merged_dates([flows.keys().copied().collect::<Vec<_>>(), vec![to]]);
    boundaries.retain(|d| *d > from && *d <= to);

    let mut prev_value = match value_at(from)? {
        Ok(value) => value,
        Err(warning) => return Ok(TwrOutcome::undefined(warning)),
    };

    let mut factor = Decimal::ONE;
    for date in boundaries {
        let value = match value_at(date)? {
            Ok(value) => value,
            Err(warning) => return Ok(TwrOutcome::undefined(warning)),
        };
        let flow = flows.get(&date).copied().unwrap_or_default();
        let before_flow = value - flow;
        // A subperiod starting from nothing has no rate of return.
        if !prev_value.is_zero() {
            factor *= before_flow / prev_value;
        }
        prev_value = value;
    }

    Ok(TwrOutcome {
        twr: Some(factor - Decimal::ONE),
        warnings: Vec::new(),
    })
}

/// Total portfolio value (cash + securities + counterparties) at the end
/// of a day, in the reporting currency.
pub(crate) fn portfolio_value(
    ledger: &Ledger,
    market: &MarketData,
    currency: Currency,
    date: NaiveDate,
) -> Result<Result<Decimal, String>, PcsError> {
    let snapshot = Snapshot::new(ledger, date)?;
    let mut total = Decimal::ZERO;

    for balance in snapshot.cash_balances() {
        match convert_amount(market, balance, currency, date) {
            Ok(amount) => total += amount,
            Err(warning) => return Ok(Err(warning)),
        }
    }
    for position in snapshot.positions() {
        match position_value(position, market, currency, date) {
            Ok(amount) => total += amount,
            Err(warning) => return Ok(Err(warning)),
        }
    }
    for (_, balance) in snapshot.counterparty_balances() {
        match convert_amount(market, balance, currency, date) {
            Ok(amount) => total += amount,
            Err(warning) => return Ok(Err(warning)),
        }
    }

    Ok(Ok(total))
}
