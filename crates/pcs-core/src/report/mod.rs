//! Report value objects: holdings, gains, periodic review.
//!
//! Reports are plain values consumed by external renderers. They never
//! fail on missing market data; rows degrade to warnings and totals
//! exclude what cannot be valued.

mod gains;
mod holding;
mod review;
mod twr;

pub use gains::GainsReport;
pub use holding::{CashRow, CounterpartyRow, HoldingReport, HoldingRow};
pub use review::{AssetReview, ReviewReport};

use crate::error::PcsError;
use crate::market::MarketData;
use crate::snapshot::Position;
use chrono::NaiveDate;
use pcs_money::{Currency, Money};
use rust_decimal::Decimal;

/// Convert into the reporting currency, describing the failure as a
/// renderable warning instead of an error.
pub(crate) fn convert_amount(
    market: &MarketData,
    amount: Money,
    currency: Currency,
    on: NaiveDate,
) -> Result<Decimal, String> {
    match market.convert(amount, currency, on) {
        Ok(converted) => Ok(converted.amount),
        Err(PcsError::NoFxRate { from, to, date }) => {
            Err(format!("no FX rate {from}->{to} on {date}"))
        }
        Err(other) => Err(other.to_string()),
    }
}

/// Market value of a position in the reporting currency. Closed positions
/// are worth zero without needing a price.
pub(crate) fn position_value(
    position: &Position,
    market: &MarketData,
    currency: Currency,
    on: NaiveDate,
) -> Result<Decimal, String> {
    if !position.is_open() {
        return Ok(Decimal::ZERO);
    }
    let id = &position.security.id;
    let price = market
        .price_as_of(id, on)
        .ok_or_else(|| format!("no price for {id} as of {on}"))?;
    convert_amount(market, price.scaled(position.quantity()), currency, on)
}
