pub mod date;
pub mod error;
pub mod fetch;
pub mod history;
pub mod ledger;
pub mod market;
pub mod report;
pub mod security;
pub mod snapshot;
pub mod transaction;

pub use error::PcsError;
pub use history::{History, merged_dates};
pub use ledger::Ledger;
pub use market::{MarketData, Split};
pub use pcs_money::{Currency, CurrencyCode, Money, MoneyError, Quantity};
pub use report::{GainsReport, HoldingReport, ReviewReport};
pub use security::{Security, SecurityId};
pub use snapshot::{CostBasis, Snapshot};
pub use transaction::{Command, CommandKind, Transaction};
