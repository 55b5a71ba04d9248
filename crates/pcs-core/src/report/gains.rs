//! Realized and unrealized P&L over a period.

use super::{convert_amount, position_value};
use crate::error::PcsError;
use crate::ledger::Ledger;
use crate::market::MarketData;
use crate::snapshot::{CostBasis, Snapshot};
use crate::transaction::Command;
use chrono::NaiveDate;
use pcs_money::{Currency, CurrencyCode, Money};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::Serialize;

/// P&L decomposition for the half-open period `(from, to]`, in the
/// reporting currency, under one cost-basis policy.
///
/// - `realized`: disposition gains, converted at their event-day FX.
/// - `unrealized`: mark-to-market at `to` minus mark-to-market at `from`.
/// - `dividends`: credited dividends in the period, at event-day FX.
/// - `market_gain_loss`: change in security market value minus the net
///   trading flow (buys − sells) — price movement alone.
/// - `total_return`: `market_gain_loss + dividends`.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct GainsReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub currency: CurrencyCode,
    pub basis: CostBasis,
    pub realized: Money,
    pub unrealized: Money,
    pub dividends: Money,
    pub net_trading_flow: Money,
    pub market_gain_loss: Money,
    pub total_return: Money,
    pub warnings: Vec<String>,
}

impl GainsReport {
    pub fn new(
        ledger: &Ledger,
        market: &MarketData,
        currency: Currency,
        basis: CostBasis,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Self, PcsError> {
        let start = Snapshot::new(ledger, from)?;
        let end = Snapshot::new(ledger, to)?;
        let mut warnings = Vec::new();

        let mut realized = Decimal::ZERO;
        for entry in end.realized_between(basis, from, to) {
            let gain = entry.proceeds.try_sub(&entry.cost)?;
            match convert_amount(market, gain, currency, entry.date) {
                Ok(amount) => realized += amount,
                Err(warning) => warnings.push(warning),
            }
        }

        let mut dividends = Decimal::ZERO;
        for entry in end.dividends_between(from, to) {
            match convert_amount(market, entry.amount, currency, entry.date) {
                Ok(amount) => dividends += amount,
                Err(warning) => warnings.push(warning),
            }
        }

        let unrealized_end = unrealized_at(&end, market, currency, basis, &mut warnings);
        let unrealized_start = unrealized_at(&start, market, currency, basis, &mut warnings);
        let unrealized = unrealized_end - unrealized_start;

        let mut net_trading_flow = Decimal::ZERO;
        for txn in ledger.transactions() {
            if txn.date <= from || txn.date > to {
                continue;
            }
            let signed = match &txn.command {
                Command::Buy { amount, .. } => Some(*amount),
                Command::Sell { amount, .. } => Some(amount.negated()),
                _ => None,
            };
            if let Some(amount) = signed {
                match convert_amount(market, amount, currency, txn.date) {
                    Ok(converted) => net_trading_flow += converted,
                    Err(warning) => warnings.push(warning),
                }
            }
        }

        let market_start = market_value(&start, market, currency, &mut warnings);
        let market_end = market_value(&end, market, currency, &mut warnings);
        let market_gain_loss = (market_end - market_start) - net_trading_flow;

        warnings.sort();
        warnings.dedup();

        Ok(GainsReport {
            from,
            to,
            currency: currency.into(),
            basis,
            realized: Money::new(realized, currency),
            unrealized: Money::new(unrealized, currency),
            dividends: Money::new(dividends, currency),
            net_trading_flow: Money::new(net_trading_flow, currency),
            market_gain_loss: Money::new(market_gain_loss, currency),
            total_return: Money::new(market_gain_loss + dividends, currency),
            warnings,
        })
    }
}

/// Mark-to-market gain of the open positions at the snapshot date:
/// market value minus cost basis, converted at that date's FX.
fn unrealized_at(
    snapshot: &Snapshot,
    market: &MarketData,
    currency: Currency,
    basis: CostBasis,
    warnings: &mut Vec<String>,
) -> Decimal {
    let date = snapshot.date();
    let mut total = Decimal::ZERO;
    for position in snapshot.positions() {
        if !position.is_open() {
            continue;
        }
        let value = match position_value(position, market, currency, date) {
            Ok(value) => value,
            Err(warning) => {
                warnings.push(warning);
                continue;
            }
        };
        match convert_amount(market, position.cost_basis(basis), currency, date) {
            Ok(cost) => total += value - cost,
            Err(warning) => warnings.push(warning),
        }
    }
    total
}

/// Total security market value at the snapshot date.
fn market_value(
    snapshot: &Snapshot,
    market: &MarketData,
    currency: Currency,
    warnings: &mut Vec<String>,
) -> Decimal {
    let date = snapshot.date();
    let mut total = Decimal::ZERO;
    for position in snapshot.positions() {
        match position_value(position, market, currency, date) {
            Ok(value) => total += value,
            Err(warning) => warnings.push(warning),
        }
    }
    total
}
