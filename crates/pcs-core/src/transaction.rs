//! The closed transaction taxonomy and its JSON-Lines codec.

use crate::error::PcsError;
use crate::security::SecurityId;
use chrono::NaiveDate;
use pcs_money::{CurrencyCode, Money, Quantity};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A ledger entry: a command with its date and free-form memo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Transaction {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub command: Command,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub memo: String,
}

impl Transaction {
    pub fn new(date: NaiveDate, command: Command) -> Self {
        Self {
            date,
            command,
            memo: String::new(),
        }
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }

    pub fn kind(&self) -> CommandKind {
        self.command.kind()
    }
}

/// The fixed set of ledger commands. The snapshot engine is total over
/// this set; there is no open extensibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum Command {
    /// Introduce a security: its ticker, identity, and trading currency.
    Declare {
        ticker: String,
        id: SecurityId,
        currency: CurrencyCode,
    },
    Deposit {
        amount: Money,
    },
    Withdraw {
        amount: Money,
    },
    /// Currency exchange at the user-observed rate implied by the two legs.
    Convert {
        from: Money,
        to: Money,
    },
    /// `amount` is the total debit, in the security's currency.
    Buy {
        security: String,
        quantity: Quantity,
        amount: Money,
    },
    /// `amount` is the total credit.
    Sell {
        security: String,
        quantity: Quantity,
        amount: Money,
    },
    /// `amount` is per share; the credit is per-share × held quantity.
    Dividend {
        security: String,
        amount: Money,
    },
    /// Positive amounts are receivable, negative payable.
    Accrue {
        counterparty: String,
        amount: Money,
    },
    /// A market event: injects a point into the price history.
    UpdatePrice {
        id: SecurityId,
        price: Money,
    },
    /// An n-for-d share multiplier.
    Split {
        id: SecurityId,
        num: u32,
        den: u32,
    },
}

/// Discriminator-only view of a command, for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Declare,
    Deposit,
    Withdraw,
    Convert,
    Buy,
    Sell,
    Dividend,
    Accrue,
    UpdatePrice,
    Split,
}

/// Wire names of every known command, in declaration order.
pub(crate) const COMMAND_NAMES: [&str; 10] = [
    "declare",
    "deposit",
    "withdraw",
    "convert",
    "buy",
    "sell",
    "dividend",
    "accrue",
    "update-price",
    "split",
];

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Declare { .. } => CommandKind::Declare,
            Command::Deposit { .. } => CommandKind::Deposit,
            Command::Withdraw { .. } => CommandKind::Withdraw,
            Command::Convert { .. } => CommandKind::Convert,
            Command::Buy { .. } => CommandKind::Buy,
            Command::Sell { .. } => CommandKind::Sell,
            Command::Dividend { .. } => CommandKind::Dividend,
            Command::Accrue { .. } => CommandKind::Accrue,
            Command::UpdatePrice { .. } => CommandKind::UpdatePrice,
            Command::Split { .. } => CommandKind::Split,
        }
    }

    /// The ticker this command refers to, if it has a security field.
    pub fn security(&self) -> Option<&str> {
        match self {
            Command::Buy { security, .. }
            | Command::Sell { security, .. }
            | Command::Dividend { security, .. } => Some(security),
            _ => None,
        }
    }

    /// The security id this command refers to, for market events.
    pub fn security_id(&self) -> Option<&SecurityId> {
        match self {
            Command::UpdatePrice { id, .. } | Command::Split { id, .. } => Some(id),
            _ => None,
        }
    }
}

/// Decode one ledger line.
///
/// Blank lines and `#` comments yield `None`. An unrecognized `command`
/// discriminator is [`PcsError::UnknownCommand`]; everything else that
/// fails to decode (including a missing required field) is
/// [`PcsError::Malformed`]. `line_no` is 1-based for diagnostics.
pub fn decode_line(line: &str, line_no: usize) -> Result<Option<Transaction>, PcsError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let value: serde_json::Value =
        serde_json::from_str(trimmed).map_err(|e| PcsError::Malformed {
            line: line_no,
            reason: e.to_string(),
        })?;

    let command = value
        .get("command")
        .and_then(|v| v.as_str())
        .ok_or_else(|| PcsError::Malformed {
            line: line_no,
            reason: "missing 'command' discriminator".to_string(),
        })?;
    if !COMMAND_NAMES.contains(&command) {
        return Err(PcsError::UnknownCommand {
            line: line_no,
            command: command.to_string(),
        });
    }

    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| PcsError::Malformed {
            line: line_no,
            reason: e.to_string(),
        })
}

/// Encode a transaction as one JSON line (no trailing newline).
pub fn encode_line(txn: &Transaction) -> Result<String, PcsError> {
    serde_json::to_string(txn).map_err(|e| PcsError::Malformed {
        line: 0,
        reason: e.to_string(),
    })
}
