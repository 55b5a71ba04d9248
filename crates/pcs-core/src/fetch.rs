//! The price-provider port. Transport adapters live outside the core.

use crate::error::PcsError;
use crate::history::History;
use crate::market::{MarketData, Split};
use crate::security::{Security, SecurityId};
use chrono::NaiveDate;
use pcs_money::Money;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Opaque provider failure. Adapters retry transient conditions
/// themselves and surface only persistent ones.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct FetchError(pub String);

/// Cooperative cancellation shared between the caller and an adapter.
/// Adapters are expected to check it at each HTTP boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// A source of daily prices, split events, and intraday quotes.
///
/// Implementations own all transport concerns; the core never sees them.
pub trait PriceFetcher {
    fn fetch_daily(
        &self,
        id: &SecurityId,
        from: NaiveDate,
        to: NaiveDate,
        cancel: &CancelToken,
    ) -> Result<History<Money>, FetchError>;

    fn fetch_splits(&self, id: &SecurityId, cancel: &CancelToken)
    -> Result<Vec<Split>, FetchError>;

    fn fetch_intraday(&self, id: &SecurityId, cancel: &CancelToken) -> Result<Money, FetchError>;
}

/// Pull daily prices and splits for `securities` into the market store.
///
/// Each security is written independently: a provider failure for one
/// security leaves every other security's points intact, and points
/// already written stay written. Failures are reported together as a
/// single [`PcsError::Fetcher`] after all securities were attempted.
pub fn sync_market(
    market: &mut MarketData,
    fetcher: &dyn PriceFetcher,
    securities: &[Security],
    from: NaiveDate,
    to: NaiveDate,
    cancel: &CancelToken,
) -> Result<(), PcsError> {
    let mut failures: Vec<String> = Vec::new();

    for security in securities {
        if cancel.is_cancelled() {
            return Err(PcsError::Fetcher("cancelled".to_string()));
        }
        market.add(security);

        match fetcher.fetch_daily(&security.id, from, to, cancel) {
            Ok(history) => {
                for (date, price) in history.iter() {
                    market.set_price(&security.id, date, *price)?;
                }
            }
            Err(err) => {
                log::warn!("daily prices for {} failed: {err}", security.id);
                failures.push(format!("{}: {err}", security.id));
                continue;
            }
        }

        match fetcher.fetch_splits(&security.id, cancel) {
            Ok(splits) => {
                for split in splits {
                    market.add_split(&security.id, split)?;
                }
            }
            Err(err) => {
                log::warn!("splits for {} failed: {err}", security.id);
                failures.push(format!("{}: {err}", security.id));
            }
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(PcsError::Fetcher(failures.join("; ")))
    }
}
