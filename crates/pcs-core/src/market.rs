//! Market data store: price histories, split events, FX resolution.

use crate::error::PcsError;
use crate::history::History;
use crate::ledger::Ledger;
use crate::security::{Security, SecurityId};
use crate::transaction::Command;
use chrono::NaiveDate;
use pcs_money::{Currency, Money};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::Path;

/// An n-for-d share multiplier effective on a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Split {
    pub date: NaiveDate,
    pub num: u32,
    pub den: u32,
}

impl Split {
    /// The quantity multiplier n/d.
    pub fn factor(&self) -> Decimal {
        Decimal::from(self.num) / Decimal::from(self.den)
    }
}

/// One record of the market data file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "event", rename_all = "kebab-case")]
enum MarketRecord {
    Price {
        id: SecurityId,
        date: NaiveDate,
        price: Money,
    },
    Split {
        id: SecurityId,
        date: NaiveDate,
        num: u32,
        den: u32,
    },
}

/// Per-security price history and split events, with ticker resolution
/// for securities a ledger has declared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketData {
    prices: HashMap<SecurityId, History<Money>>,
    splits: HashMap<SecurityId, Vec<Split>>,
    tickers: HashMap<String, SecurityId>,
}

impl MarketData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a security. Idempotent: re-adding keeps existing history.
    pub fn add(&mut self, security: &Security) {
        self.prices.entry(security.id.clone()).or_default();
        self.splits.entry(security.id.clone()).or_default();
        self.tickers
            .insert(security.ticker.clone(), security.id.clone());
    }

    /// Resolve a ledger ticker to its security id.
    pub fn resolve(&self, ticker: &str) -> Option<&SecurityId> {
        self.tickers.get(ticker)
    }

    pub fn set_price(
        &mut self,
        id: &SecurityId,
        date: NaiveDate,
        price: Money,
    ) -> Result<(), PcsError> {
        let history = self
            .prices
            .get_mut(id)
            .ok_or_else(|| PcsError::UnknownSecurity(id.to_string()))?;
        history.append(date, price);
        Ok(())
    }

    /// The most recent price on or before `date`.
    pub fn price_as_of(&self, id: &SecurityId, date: NaiveDate) -> Option<Money> {
        self.prices
            .get(id)?
            .value_as_of(date)
            .map(|(_, price)| *price)
    }

    pub fn price_history(&self, id: &SecurityId) -> Option<&History<Money>> {
        self.prices.get(id)
    }

    pub fn add_split(&mut self, id: &SecurityId, split: Split) -> Result<(), PcsError> {
        let splits = self
            .splits
            .get_mut(id)
            .ok_or_else(|| PcsError::UnknownSecurity(id.to_string()))?;
        splits.push(split);
        splits.sort_by_key(|s| s.date);
        Ok(())
    }

    pub fn splits(&self, id: &SecurityId) -> &[Split] {
        self.splits.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Convert an amount into `target` using a declared currency pair.
    ///
    /// Same-currency conversion is the identity. Otherwise a
    /// `CurrencyPair` security quoting source→target is used directly,
    /// or target→source inverted. No pair, or a pair with no price on or
    /// before `on`, is [`PcsError::NoFxRate`].
    pub fn convert(
        &self,
        amount: Money,
        target: Currency,
        on: NaiveDate,
    ) -> Result<Money, PcsError> {
        let Some(source) = amount.currency() else {
            // The neutral zero converts to zero in the target currency.
            return Ok(Money::new(amount.amount, target));
        };
        if source == target {
            return Ok(amount);
        }

        if let Some(rate) = self.pair_rate(source, target, on) {
            return Ok(Money::new(amount.amount * rate, target));
        }
        if let Some(rate) = self.pair_rate(target, source, on)
            && !rate.is_zero()
        {
            return Ok(Money::new(amount.amount / rate, target));
        }

        Err(PcsError::NoFxRate {
            from: source.code().to_string(),
            to: target.code().to_string(),
            date: on,
        })
    }

    fn pair_rate(&self, base: Currency, quote: Currency, on: NaiveDate) -> Option<Decimal> {
        let id = SecurityId::CurrencyPair { base, quote };
        self.price_as_of(&id, on).map(|p| p.amount)
    }

    /// Route a ledger's declarations and market events into the store.
    ///
    /// Declares register securities; `update-price` and `split` entries
    /// become price points and split events. Ledger validation has
    /// already guaranteed declare-before-use.
    pub fn absorb(&mut self, ledger: &Ledger) -> Result<(), PcsError> {
        for txn in ledger.transactions() {
            match &txn.command {
                Command::Declare {
                    ticker,
                    id,
                    currency,
                } => {
                    self.add(&Security::new(ticker.clone(), id.clone(), currency.0));
                }
                Command::UpdatePrice { id, price } => {
                    self.set_price(id, txn.date, *price)?;
                }
                Command::Split { id, num, den } => {
                    self.add_split(
                        id,
                        Split {
                            date: txn.date,
                            num: *num,
                            den: *den,
                        },
                    )?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Merge another store into this one. Colliding price points take the
    /// other store's value; split events are deduplicated.
    pub fn merge(&mut self, other: &MarketData) {
        for (id, history) in &other.prices {
            let target = self.prices.entry(id.clone()).or_default();
            for (date, price) in history.iter() {
                target.append(date, *price);
            }
        }
        for (id, splits) in &other.splits {
            let target = self.splits.entry(id.clone()).or_default();
            for split in splits {
                if !target.contains(split) {
                    target.push(*split);
                }
            }
            target.sort_by_key(|s| s.date);
        }
        for (ticker, id) in &other.tickers {
            self.tickers.insert(ticker.clone(), id.clone());
        }
    }

    /// Decode a JSON-Lines market file. Records may reference securities
    /// the store has not seen; histories are created on demand, since the
    /// file is the store's own serialization.
    pub fn decode<R: BufRead>(reader: R) -> Result<Self, PcsError> {
        let mut market = MarketData::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let record: MarketRecord =
                serde_json::from_str(trimmed).map_err(|e| PcsError::Malformed {
                    line: idx + 1,
                    reason: e.to_string(),
                })?;
            match record {
                MarketRecord::Price { id, date, price } => {
                    market.prices.entry(id).or_default().append(date, price);
                }
                MarketRecord::Split { id, date, num, den } => {
                    let splits = market.splits.entry(id).or_default();
                    splits.push(Split { date, num, den });
                    splits.sort_by_key(|s| s.date);
                }
            }
        }
        Ok(market)
    }

    /// Encode as JSON Lines: prices sorted by (id, date), then splits.
    /// Canonical: decode→encode→decode is a fixed point.
    pub fn encode<W: Write>(&self, writer: &mut W) -> Result<(), PcsError> {
        let mut price_ids: Vec<&SecurityId> = self.prices.keys().collect();
        price_ids.sort_by_key(|id| id.to_string());
        for id in price_ids {
            if let Some(history) = self.prices.get(id) {
                for (date, price) in history.iter() {
                    let record = MarketRecord::Price {
                        id: id.clone(),
                        date,
                        price: *price,
                    };
                    writeln!(writer, "{}", to_line(&record)?)?;
                }
            }
        }

        let mut split_ids: Vec<&SecurityId> = self.splits.keys().collect();
        split_ids.sort_by_key(|id| id.to_string());
        for id in split_ids {
            if let Some(splits) = self.splits.get(id) {
                for split in splits {
                    let record = MarketRecord::Split {
                        id: id.clone(),
                        date: split.date,
                        num: split.num,
                        den: split.den,
                    };
                    writeln!(writer, "{}", to_line(&record)?)?;
                }
            }
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

fn to_line(record: &MarketRecord) -> Result<String, PcsError> {
    serde_json::to_string(record).map_err(|e| PcsError::Malformed {
        line: 0,
        reason: e.to_string(),
    })
}
