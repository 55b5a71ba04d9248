//! Periodic review: value-change decomposition and time-weighted return.

use super::twr::{asset_twr, portfolio_twr, portfolio_value};
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

use super::GainsReport;

/// Per-security performance over the period.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct AssetReview {
    pub ticker: String,
    pub start_value: Option<Money>,
    pub end_value: Option<Money>,
    /// Time-weighted return as a fraction (0.15 = +15%), partitioned at
    /// the asset's own buys and sells.
    pub twr: Option<Decimal>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Review of the half-open period `(from, to]`.
///
/// The change in total portfolio value decomposes as
/// `change = net_cash_flow + market_gain_loss + dividends + fx_effect`,
/// where `net_cash_flow` covers deposits, withdrawals, and accruals,
/// `market_gain_loss` is price movement net of trading, and `fx_effect`
/// is the residual attributable to rate movements on cash and value.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ReviewReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub currency: CurrencyCode,
    pub start_value: Option<Money>,
    pub end_value: Option<Money>,
    pub change: Option<Money>,
    pub net_cash_flow: Money,
    pub market_gain_loss: Money,
    pub dividends: Money,
    pub fx_effect: Option<Money>,
    /// The gains breakdown (realized / unrealized) for the same period.
    pub gains: GainsReport,
    /// Portfolio-level TWR, partitioned at external cash flows.
    pub twr: Option<Decimal>,
    pub assets: Vec<AssetReview>,
    pub warnings: Vec<String>,
}

impl ReviewReport {
    pub fn new(
        ledger: &Ledger,
        market: &MarketData,
        currency: Currency,
        basis: CostBasis,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Self, PcsError> {
        let mut warnings = Vec::new();

        let start_value = match portfolio_value(ledger, market, currency, from)? {
            Ok(value) => Some(value),
            Err(warning) => {
                warnings.push(warning);
                None
            }
        };
        let end_value = match portfolio_value(ledger, market, currency, to)? {
            Ok(value) => Some(value),
            Err(warning) => {
                warnings.push(warning);
                None
            }
        };
        let change = match (start_value, end_value) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        };

        let mut net_cash_flow = Decimal::ZERO;
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
                    Ok(converted) => net_cash_flow += converted,
                    Err(warning) => warnings.push(warning),
                }
            }
        }

        let gains = GainsReport::new(ledger, market, currency, basis, from, to)?;
        let dividends = gains.dividends.amount;
        let market_gain_loss = gains.market_gain_loss.amount;

        let fx_effect =
            change.map(|change| change - net_cash_flow - market_gain_loss - dividends);

        let portfolio = portfolio_twr(ledger, market, currency, from, to)?;
        warnings.extend(portfolio.warnings);

        let mut assets = Vec::new();
        for security in ledger.declared() {
            if security.id.is_currency_pair() {
                continue;
            }
            let ticker = security.ticker;
            let start_position = value_of(ledger, market, currency, &ticker, from)?;
            let end_position = value_of(ledger, market, currency, &ticker, to)?;
            // Skip assets never held nor traded in the period.
            let traded = ledger.transactions().any(|t| {
                t.date > from && t.date <= to && t.command.security() == Some(ticker.as_str())
            });
            if !traded
                && matches!(&start_position, Ok(v) if v.is_zero())
                && matches!(&end_position, Ok(v) if v.is_zero())
            {
                continue;
            }
            let outcome = asset_twr(ledger, market, currency, &ticker, from, to)?;
            let mut asset_warnings = outcome.warnings;
            let start_value = match start_position {
                Ok(value) => Some(Money::new(value, currency)),
                Err(warning) => {
                    asset_warnings.push(warning);
                    None
                }
            };
            let end_value = match end_position {
                Ok(value) => Some(Money::new(value, currency)),
                Err(warning) => {
                    asset_warnings.push(warning);
                    None
                }
            };
            asset_warnings.dedup();
            assets.push(AssetReview {
                ticker,
                start_value,
                end_value,
                twr: outcome.twr,
                warnings: asset_warnings,
            });
        }

        warnings.sort();
        warnings.dedup();

        Ok(ReviewReport {
            from,
            to,
            currency: currency.into(),
            start_value: start_value.map(|v| Money::new(v, currency)),
            end_value: end_value.map(|v| Money::new(v, currency)),
            change: change.map(|v| Money::new(v, currency)),
            net_cash_flow: Money::new(net_cash_flow, currency),
            market_gain_loss: Money::new(market_gain_loss, currency),
            dividends: Money::new(dividends, currency),
            fx_effect: fx_effect.map(|v| Money::new(v, currency)),
            gains,
            twr: portfolio.twr,
            assets,
            warnings,
        })
    }
}

/// Market value of one asset at the end of a day, as a warning-or-value.
fn value_of(
    ledger: &Ledger,
    market: &MarketData,
    currency: Currency,
    ticker: &str,
    date: NaiveDate,
) -> Result<Result<Decimal, String>, PcsError> {
    let snapshot = Snapshot::new(ledger, date)?;
    match snapshot.position(ticker) {
        Some(position) => Ok(position_value(position, market, currency, date)),
        None => Ok(Ok(Decimal::ZERO)),
    }
}
