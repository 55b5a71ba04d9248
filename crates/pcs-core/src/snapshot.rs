//! Point-in-time portfolio state, reconstructed by replaying the ledger.

use crate::error::PcsError;
use crate::ledger::Ledger;
use crate::security::Security;
use crate::transaction::Command;
use chrono::NaiveDate;
use pcs_money::{Currency, Money, Quantity};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::str::FromStr;

/// Cost-basis policy for matching dispositions to acquisitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CostBasis {
    /// Earliest-acquired lots are consumed first.
    Fifo,
    /// A single running lot at the weighted-average unit cost.
    Average,
}

impl FromStr for CostBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fifo" => Ok(CostBasis::Fifo),
            "average" | "avg" => Ok(CostBasis::Average),
            other => Err(format!("unknown cost basis '{other}'")),
        }
    }
}

impl std::fmt::Display for CostBasis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CostBasis::Fifo => f.write_str("fifo"),
            CostBasis::Average => f.write_str("average"),
        }
    }
}

/// An acquisition lot still (partially) open.
#[derive(Debug, Clone, PartialEq)]
pub struct Lot {
    pub date: NaiveDate,
    pub quantity: Quantity,
    /// Cost per share, in the security's currency.
    pub unit_cost: Decimal,
}

/// Holdings of one security: quantity plus cost tracking under both bases.
#[derive(Debug, Clone)]
pub struct Position {
    pub security: Security,
    quantity: Quantity,
    lots: VecDeque<Lot>,
    /// Total open cost under the average basis, in the security currency.
    average_cost: Decimal,
}

impl Position {
    fn new(security: Security) -> Self {
        Self {
            security,
            quantity: Decimal::ZERO,
            lots: VecDeque::new(),
            average_cost: Decimal::ZERO,
        }
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn is_open(&self) -> bool {
        !self.quantity.is_zero()
    }

    pub fn lots(&self) -> impl Iterator<Item = &Lot> {
        self.lots.iter()
    }

    /// Total cost of the open position under `basis`.
    pub fn cost_basis(&self, basis: CostBasis) -> Money {
        let total = match basis {
            CostBasis::Fifo => self
                .lots
                .iter()
                .map(|lot| lot.quantity * lot.unit_cost)
                .sum(),
            CostBasis::Average => self.average_cost,
        };
        Money::new(total, self.security.currency())
    }
}

/// One realized-gain tape entry. Proceeds and cost share the security's
/// currency; reports convert at the event-day FX.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct Realized {
    pub date: NaiveDate,
    pub ticker: String,
    pub proceeds: Money,
    pub cost: Money,
    pub basis: CostBasis,
}

impl Realized {
    /// Proceeds minus cost, in the entry's (security) currency.
    pub fn gain(&self) -> Decimal {
        self.proceeds.amount - self.cost.amount
    }
}

/// One dividend tape entry: the total credited amount.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct DividendPayment {
    pub date: NaiveDate,
    pub ticker: String,
    pub amount: Money,
}

/// Derived portfolio state at the end of a day.
///
/// Built by a fold over every ledger transaction dated on or before the
/// snapshot date, in ledger order. Same-day ordering is insertion order
/// and is significant (a buy recorded before a same-day sell is
/// consumable by it).
#[derive(Debug, Clone)]
pub struct Snapshot {
    date: NaiveDate,
    cash: HashMap<Currency, Decimal>,
    positions: HashMap<String, Position>,
    counterparties: HashMap<String, Money>,
    realized: Vec<Realized>,
    dividends: Vec<DividendPayment>,
}

impl Snapshot {
    /// Replay `ledger` up to and including `date`.
    ///
    /// The ledger has already enforced ordering and declaration
    /// invariants; this surfaces the stateful rejections (over-sell,
    /// counterparty currency conflicts, duplicate declarations).
    pub fn new(ledger: &Ledger, date: NaiveDate) -> Result<Self, PcsError> {
        let mut snapshot = Snapshot {
            date,
            cash: HashMap::new(),
            positions: HashMap::new(),
            counterparties: HashMap::new(),
            realized: Vec::new(),
            dividends: Vec::new(),
        };

        for txn in ledger.transactions() {
            if txn.date > date {
                break;
            }
            snapshot.apply(txn.date, &txn.command)?;
        }

        Ok(snapshot)
    }

    fn apply(&mut self, date: NaiveDate, command: &Command) -> Result<(), PcsError> {
        match command {
            Command::Declare {
                ticker,
                id,
                currency,
            } => {
                if self.positions.contains_key(ticker) {
                    return Err(PcsError::DuplicateTicker(ticker.clone()));
                }
                if self
                    .positions
                    .values()
                    .any(|p| p.security.id == *id)
                {
                    return Err(PcsError::DuplicateId(id.to_string()));
                }
                let security = Security::new(ticker.clone(), id.clone(), currency.0);
                self.positions
                    .insert(ticker.clone(), Position::new(security));
            }

            Command::Deposit { amount } => {
                *self.cash.entry(currency_of(amount)?).or_default() += amount.amount;
            }

            Command::Withdraw { amount } => {
                *self.cash.entry(currency_of(amount)?).or_default() -= amount.amount;
            }

            Command::Convert { from, to } => {
                *self.cash.entry(currency_of(from)?).or_default() -= from.amount;
                *self.cash.entry(currency_of(to)?).or_default() += to.amount;
            }

            Command::Buy {
                security,
                quantity,
                amount,
            } => {
                let position = self.position_mut(security)?;
                let currency = position.security.currency();
                position.lots.push_back(Lot {
                    date,
                    quantity: *quantity,
                    unit_cost: amount.amount / *quantity,
                });
                position.quantity += *quantity;
                position.average_cost += amount.amount;
                *self.cash.entry(currency).or_default() -= amount.amount;
            }

            Command::Sell {
                security,
                quantity,
                amount,
            } => {
                let position = self.position_mut(security)?;
                if *quantity > position.quantity {
                    return Err(PcsError::OverSell {
                        ticker: security.clone(),
                        requested: *quantity,
                        held: position.quantity,
                    });
                }
                let currency = position.security.currency();

                // FIFO: consume lots in acquisition order.
                let mut remaining = *quantity;
                let mut fifo_cost = Decimal::ZERO;
                while remaining > Decimal::ZERO {
                    let Some(front) = position.lots.front_mut() else {
                        break;
                    };
                    let take = remaining.min(front.quantity);
                    fifo_cost += take * front.unit_cost;
                    front.quantity -= take;
                    remaining -= take;
                    if front.quantity.is_zero() {
                        position.lots.pop_front();
                    }
                }

                // Average: one running lot; a full close consumes the
                // exact remaining cost so no residue accumulates.
                let average_cost = if *quantity == position.quantity {
                    position.average_cost
                } else {
                    *quantity * (position.average_cost / position.quantity)
                };
                position.average_cost -= average_cost;
                position.quantity -= *quantity;

                *self.cash.entry(currency).or_default() += amount.amount;

                let proceeds = Money::new(amount.amount, currency);
                self.realized.push(Realized {
                    date,
                    ticker: security.clone(),
                    proceeds,
                    cost: Money::new(fifo_cost, currency),
                    basis: CostBasis::Fifo,
                });
                self.realized.push(Realized {
                    date,
                    ticker: security.clone(),
                    proceeds,
                    cost: Money::new(average_cost, currency),
                    basis: CostBasis::Average,
                });
            }

            Command::Dividend { security, amount } => {
                let position = self.position_mut(security)?;
                let held = position.quantity;
                // Zero holdings on the dividend date: no credit, no tape.
                if held > Decimal::ZERO {
                    let total = amount.scaled(held);
                    *self.cash.entry(currency_of(&total)?).or_default() += total.amount;
                    self.dividends.push(DividendPayment {
                        date,
                        ticker: security.clone(),
                        amount: total,
                    });
                }
            }

            Command::Accrue {
                counterparty,
                amount,
            } => match self.counterparties.get_mut(counterparty) {
                Some(balance) => {
                    *balance =
                        balance
                            .try_add(amount)
                            .map_err(|_| PcsError::CurrencyConflict {
                                name: counterparty.clone(),
                                existing: balance.code().to_string(),
                                incoming: amount.code().to_string(),
                            })?;
                }
                None => {
                    self.counterparties
                        .insert(counterparty.clone(), *amount);
                }
            },

            // Prices live in the market view; nothing to fold here.
            Command::UpdatePrice { .. } => {}

            Command::Split { id, num, den } => {
                let factor = Decimal::from(*num) / Decimal::from(*den);
                for position in self.positions.values_mut() {
                    if position.security.id != *id {
                        continue;
                    }
                    for lot in &mut position.lots {
                        // Rescale via the lot's total cost so the basis
                        // is preserved exactly.
                        let total = lot.quantity * lot.unit_cost;
                        lot.quantity *= factor;
                        if !lot.quantity.is_zero() {
                            lot.unit_cost = total / lot.quantity;
                        }
                    }
                    position.quantity *= factor;
                }
            }
        }
        Ok(())
    }

    fn position_mut(&mut self, ticker: &str) -> Result<&mut Position, PcsError> {
        self.positions
            .get_mut(ticker)
            .ok_or_else(|| PcsError::UnknownSecurity(ticker.to_string()))
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Cash balances, sorted by currency code. Balances may be negative.
    pub fn cash_balances(&self) -> Vec<Money> {
        let mut balances: Vec<Money> = self
            .cash
            .iter()
            .map(|(currency, amount)| Money::new(*amount, *currency))
            .collect();
        balances.sort_by_key(|m| m.code());
        balances
    }

    pub fn cash(&self, currency: Currency) -> Money {
        Money::new(
            self.cash.get(&currency).copied().unwrap_or_default(),
            currency,
        )
    }

    /// Positions sorted by ticker, declared-but-never-traded included.
    pub fn positions(&self) -> Vec<&Position> {
        let mut positions: Vec<&Position> = self.positions.values().collect();
        positions.sort_by(|a, b| a.security.ticker.cmp(&b.security.ticker));
        positions
    }

    pub fn position(&self, ticker: &str) -> Option<&Position> {
        self.positions.get(ticker)
    }

    /// Counterparty balances, sorted by name.
    pub fn counterparty_balances(&self) -> Vec<(&str, Money)> {
        let mut balances: Vec<(&str, Money)> = self
            .counterparties
            .iter()
            .map(|(name, balance)| (name.as_str(), *balance))
            .collect();
        balances.sort_by_key(|(name, _)| *name);
        balances
    }

    pub fn realized(&self) -> &[Realized] {
        &self.realized
    }

    /// Realized entries under `basis` with date in the half-open
    /// period `(after, until]`.
    pub fn realized_between(
        &self,
        basis: CostBasis,
        after: NaiveDate,
        until: NaiveDate,
    ) -> impl Iterator<Item = &Realized> {
        self.realized
            .iter()
            .filter(move |r| r.basis == basis && r.date > after && r.date <= until)
    }

    pub fn dividends(&self) -> &[DividendPayment] {
        &self.dividends
    }

    /// Dividend entries with date in the half-open period `(after, until]`.
    pub fn dividends_between(
        &self,
        after: NaiveDate,
        until: NaiveDate,
    ) -> impl Iterator<Item = &DividendPayment> {
        self.dividends
            .iter()
            .filter(move |d| d.date > after && d.date <= until)
    }
}

fn currency_of(amount: &Money) -> Result<Currency, PcsError> {
    amount
        .currency()
        .ok_or_else(|| PcsError::InvalidAmount("amount without currency".to_string()))
}
