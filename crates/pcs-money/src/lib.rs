mod amount;
mod currency;

pub use amount::{Money, MoneyError};
pub use currency::CurrencyCode;
pub use iso_currency::Currency;

/// Exact decimal count of shares or units. Dimensionless.
pub type Quantity = rust_decimal::Decimal;
