use chrono::NaiveDate;
use pcs_money::Quantity;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PcsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: malformed record: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("line {line}: unknown command '{command}'")]
    UnknownCommand { line: usize, command: String },

    #[error("invalid date '{0}'")]
    InvalidDate(String),

    #[error("invalid security id '{0}': {1}")]
    InvalidId(String, String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("unknown security '{0}'")]
    UnknownSecurity(String),

    #[error("duplicate ticker '{0}'")]
    DuplicateTicker(String),

    #[error("duplicate security id '{0}'")]
    DuplicateId(String),

    #[error("transaction dated {next} predates the last ledger entry on {prev}")]
    OutOfOrder { prev: NaiveDate, next: NaiveDate },

    #[error("cannot sell {requested} of '{ticker}': only {held} held")]
    OverSell {
        ticker: String,
        requested: Quantity,
        held: Quantity,
    },

    #[error("counterparty '{name}' is held in {existing}, got {incoming}")]
    CurrencyConflict {
        name: String,
        existing: String,
        incoming: String,
    },

    #[error("no FX rate {from}->{to} on {date}")]
    NoFxRate {
        from: String,
        to: String,
        date: NaiveDate,
    },

    #[error("currency arithmetic: {0}")]
    Money(#[from] pcs_money::MoneyError),

    #[error("price fetch failed: {0}")]
    Fetcher(String),
}
