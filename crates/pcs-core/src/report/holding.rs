//! Point-in-time holdings valued in a reporting currency.

use super::{convert_amount, position_value};
use crate::error::PcsError;
use crate::ledger::Ledger;
use crate::market::MarketData;
use crate::security::SecurityId;
use crate::snapshot::Snapshot;
use chrono::NaiveDate;
use pcs_money::{Currency, CurrencyCode, Money, Quantity};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::Serialize;

/// One security row. `value` is in the reporting currency; a row with a
/// missing price or FX rate carries a warning and no value.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct HoldingRow {
    pub ticker: String,
    pub quantity: Quantity,
    /// Latest price in the security's own currency, if known.
    pub price: Option<Money>,
    pub value: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CashRow {
    pub balance: Money,
    pub value: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CounterpartyRow {
    pub name: String,
    pub balance: Money,
    pub value: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// What is owned at the end of a day, valued in one currency.
///
/// Securities with a zero position are omitted. Rows that cannot be
/// valued still appear, but are excluded from `total` and listed in
/// `warnings` (and, for unpriced securities, `missing_prices`).
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct HoldingReport {
    pub date: NaiveDate,
    pub currency: CurrencyCode,
    pub securities: Vec<HoldingRow>,
    pub cash: Vec<CashRow>,
    pub counterparties: Vec<CounterpartyRow>,
    pub total: Money,
    pub missing_prices: Vec<SecurityId>,
    pub warnings: Vec<String>,
}

impl HoldingReport {
    pub fn new(
        ledger: &Ledger,
        market: &MarketData,
        currency: Currency,
        date: NaiveDate,
    ) -> Result<Self, PcsError> {
        let snapshot = Snapshot::new(ledger, date)?;

        let mut securities = Vec::new();
        let mut missing_prices = Vec::new();
        let mut warnings = Vec::new();
        let mut total = Decimal::ZERO;

        for position in snapshot.positions() {
            if !position.is_open() {
                continue;
            }
            let id = &position.security.id;
            let price = market.price_as_of(id, date);
            if price.is_none() {
                missing_prices.push(id.clone());
            }
            let (value, warning) = match position_value(position, market, currency, date) {
                Ok(amount) => {
                    total += amount;
                    (Some(Money::new(amount, currency)), None)
                }
                Err(warning) => {
                    log::warn!("holding {}: {warning}", position.security.ticker);
                    warnings.push(warning.clone());
                    (None, Some(warning))
                }
            };
            securities.push(HoldingRow {
                ticker: position.security.ticker.clone(),
                quantity: position.quantity(),
                price,
                value,
                warning,
            });
        }

        let mut cash = Vec::new();
        for balance in snapshot.cash_balances() {
            let (value, warning) = match convert_amount(market, balance, currency, date) {
                Ok(amount) => {
                    total += amount;
                    (Some(Money::new(amount, currency)), None)
                }
                Err(warning) => {
                    warnings.push(warning.clone());
                    (None, Some(warning))
                }
            };
            cash.push(CashRow {
                balance,
                value,
                warning,
            });
        }

        let mut counterparties = Vec::new();
        for (name, balance) in snapshot.counterparty_balances() {
            let (value, warning) = match convert_amount(market, balance, currency, date) {
                Ok(amount) => {
                    total += amount;
                    (Some(Money::new(amount, currency)), None)
                }
                Err(warning) => {
                    warnings.push(warning.clone());
                    (None, Some(warning))
                }
            };
            counterparties.push(CounterpartyRow {
                name: name.to_string(),
                balance,
                value,
                warning,
            });
        }

        Ok(HoldingReport {
            date,
            currency: currency.into(),
            securities,
            cash,
            counterparties,
            total: Money::new(total, currency),
            missing_prices,
            warnings,
        })
    }
}
