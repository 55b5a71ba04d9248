//! Append-only transaction log with ordering and declaration invariants.

use crate::error::PcsError;
use crate::security::{Security, SecurityId};
use crate::transaction::{decode_line, encode_line, Command, CommandKind, Transaction};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::io::{BufRead, Write};
use std::path::Path;

/// The append-only ledger. Transactions are kept in insertion order, which
/// is also chronological order (ties broken by insertion).
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    transactions: Vec<Transaction>,
    tickers: HashMap<String, SecurityId>,
    ids: HashSet<SecurityId>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.transactions.last().map(|t| t.date)
    }

    /// Append a batch of transactions.
    ///
    /// The whole batch is validated against the current ledger before
    /// anything is committed; on any failure the ledger is unchanged.
    /// Checks: non-decreasing dates, declare-before-use for securities,
    /// unique tickers and ids, and well-formed amounts.
    pub fn append(
        &mut self,
        batch: impl IntoIterator<Item = Transaction>,
    ) -> Result<(), PcsError> {
        let mut staged: Vec<Transaction> = Vec::new();
        let mut tickers = self.tickers.clone();
        let mut ids = self.ids.clone();
        let mut last_date = self.last_date();

        for txn in batch {
            if let Some(prev) = last_date
                && txn.date < prev
            {
                return Err(PcsError::OutOfOrder {
                    prev,
                    next: txn.date,
                });
            }
            validate_command(&txn, &tickers, &ids)?;
            if let Command::Declare { ticker, id, .. } = &txn.command {
                tickers.insert(ticker.clone(), id.clone());
                ids.insert(id.clone());
            }
            last_date = Some(txn.date);
            staged.push(txn);
        }

        self.transactions.extend(staged);
        self.tickers = tickers;
        self.ids = ids;
        Ok(())
    }

    /// All transactions in ledger order.
    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter()
    }

    /// Start a filtered query over the ledger.
    pub fn query(&self) -> TransactionQuery<'_> {
        TransactionQuery {
            ledger: self,
            security: None,
            from: None,
            to: None,
            kind: None,
        }
    }

    /// Declared securities, in declaration order.
    pub fn declared(&self) -> Vec<Security> {
        self.transactions
            .iter()
            .filter_map(|txn| match &txn.command {
                Command::Declare {
                    ticker,
                    id,
                    currency,
                } => Some(Security::new(ticker.clone(), id.clone(), currency.0)),
                _ => None,
            })
            .collect()
    }

    /// Look up a declared security by ticker.
    pub fn security(&self, ticker: &str) -> Option<Security> {
        self.declared().into_iter().find(|s| s.ticker == ticker)
    }

    /// Decode a JSON-Lines stream. Blank lines and `#` comments are
    /// ignored. The result is a fully validated ledger.
    pub fn decode<R: BufRead>(reader: R) -> Result<Self, PcsError> {
        let mut batch = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if let Some(txn) = decode_line(&line, idx + 1)? {
                batch.push(txn);
            }
        }
        let mut ledger = Ledger::new();
        ledger.append(batch)?;
        Ok(ledger)
    }

    /// Encode as JSON Lines: one object per line, trailing newline.
    /// Encoding the decoded output again is byte-identical.
    pub fn encode<W: Write>(&self, writer: &mut W) -> Result<(), PcsError> {
        for txn in &self.transactions {
            writeln!(writer, "{}", encode_line(txn)?)?;
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, PcsError> {
        let file = std::fs::File::open(path)?;
        Self::decode(std::io::BufReader::new(file))
    }

    pub fn save(&self, path: &Path) -> Result<(), PcsError> {
        let mut out = Vec::new();
        self.encode(&mut out)?;
        std::fs::write(path, out)?;
        Ok(())
    }
}

fn validate_command(
    txn: &Transaction,
    tickers: &HashMap<String, SecurityId>,
    ids: &HashSet<SecurityId>,
) -> Result<(), PcsError> {
    if let Some(ticker) = txn.command.security()
        && !tickers.contains_key(ticker)
    {
        return Err(PcsError::UnknownSecurity(ticker.to_string()));
    }
    if let Some(id) = txn.command.security_id()
        && !ids.contains(id)
    {
        return Err(PcsError::UnknownSecurity(id.to_string()));
    }

    match &txn.command {
        Command::Declare { ticker, id, .. } => {
            if tickers.contains_key(ticker) {
                return Err(PcsError::DuplicateTicker(ticker.clone()));
            }
            if ids.contains(id) {
                return Err(PcsError::DuplicateId(id.to_string()));
            }
        }
        Command::Deposit { amount } | Command::Withdraw { amount } => {
            require_positive(amount.amount, txn, "amount")?;
            require_currency(amount, txn)?;
        }
        Command::Convert { from, to } => {
            require_positive(from.amount, txn, "from")?;
            require_positive(to.amount, txn, "to")?;
            require_currency(from, txn)?;
            require_currency(to, txn)?;
        }
        Command::Buy {
            quantity, amount, ..
        }
        | Command::Sell {
            quantity, amount, ..
        } => {
            require_positive(*quantity, txn, "quantity")?;
            require_currency(amount, txn)?;
            if amount.amount < Decimal::ZERO {
                return Err(PcsError::InvalidAmount(format!(
                    "negative amount {} on {}",
                    amount, txn.date
                )));
            }
        }
        Command::Dividend { amount, .. } => {
            require_positive(amount.amount, txn, "amount")?;
            require_currency(amount, txn)?;
        }
        Command::Accrue { amount, .. } => {
            require_currency(amount, txn)?;
        }
        Command::UpdatePrice { price, .. } => {
            require_positive(price.amount, txn, "price")?;
            require_currency(price, txn)?;
        }
        Command::Split { num, den, .. } => {
            if *num == 0 || *den == 0 {
                return Err(PcsError::InvalidAmount(format!(
                    "split ratio {num}/{den} on {} must be positive",
                    txn.date
                )));
            }
        }
    }
    Ok(())
}

fn require_positive(value: Decimal, txn: &Transaction, field: &str) -> Result<(), PcsError> {
    if value <= Decimal::ZERO {
        return Err(PcsError::InvalidAmount(format!(
            "'{field}' must be positive (got {value}) on {}",
            txn.date
        )));
    }
    Ok(())
}

fn require_currency(amount: &pcs_money::Money, txn: &Transaction) -> Result<(), PcsError> {
    if amount.is_neutral() {
        return Err(PcsError::InvalidAmount(format!(
            "amount without currency on {}",
            txn.date
        )));
    }
    Ok(())
}

/// Lazy filter combinators over a ledger's transactions.
#[derive(Debug, Clone)]
pub struct TransactionQuery<'a> {
    ledger: &'a Ledger,
    security: Option<String>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    kind: Option<CommandKind>,
}

impl<'a> TransactionQuery<'a> {
    pub fn by_security(mut self, ticker: &str) -> Self {
        self.security = Some(ticker.to_string());
        self
    }

    /// Inclusive date range.
    pub fn by_date_range(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn by_kind(mut self, kind: CommandKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn iter(self) -> impl Iterator<Item = &'a Transaction> + 'a {
        let TransactionQuery {
            ledger,
            security,
            from,
            to,
            kind,
        } = self;
        ledger.transactions.iter().filter(move |txn| {
            if let Some(ticker) = &security
                && txn.command.security() != Some(ticker.as_str())
            {
                return false;
            }
            if let Some(from) = from
                && txn.date < from
            {
                return false;
            }
            if let Some(to) = to
                && txn.date > to
            {
                return false;
            }
            if let Some(kind) = kind
                && txn.kind() != kind
            {
                return false;
            }
            true
        })
    }
}
