//! Environment-variable configuration with flag overrides.
//!
//! The environment boundary is `PCS_LEDGER_FILE`, `PCS_MARKET_FILE`, and
//! `PCS_DEFAULT_CURRENCY`; command-line flags take precedence.

use anyhow::{Context, Result, bail};
use pcs_core::{Ledger, MarketData};
use pcs_money::Currency;
use std::path::PathBuf;

pub const LEDGER_ENV: &str = "PCS_LEDGER_FILE";
pub const MARKET_ENV: &str = "PCS_MARKET_FILE";
pub const CURRENCY_ENV: &str = "PCS_DEFAULT_CURRENCY";

#[derive(Debug, Clone)]
pub struct Config {
    pub ledger_file: PathBuf,
    pub market_file: Option<PathBuf>,
    pub currency: Currency,
}

impl Config {
    /// Resolve configuration: flags first, then environment.
    pub fn resolve(
        ledger_flag: Option<PathBuf>,
        market_flag: Option<PathBuf>,
        currency_flag: Option<String>,
    ) -> Result<Self> {
        let ledger_file = match ledger_flag.or_else(|| env_path(LEDGER_ENV)) {
            Some(path) => path,
            None => bail!("no ledger file: pass --ledger or set {LEDGER_ENV}"),
        };
        let market_file = market_flag.or_else(|| env_path(MARKET_ENV));

        let code = currency_flag
            .or_else(|| std::env::var(CURRENCY_ENV).ok())
            .unwrap_or_else(|| "EUR".to_string());
        let currency = match Currency::from_code(&code.trim().to_uppercase()) {
            Some(currency) => currency,
            None => bail!("invalid currency code '{code}'"),
        };

        Ok(Self {
            ledger_file,
            market_file,
            currency,
        })
    }

    /// Load the ledger and the market view it implies: the market file
    /// (when configured) plus the ledger's own price and split events.
    pub fn load(&self) -> Result<(Ledger, MarketData)> {
        let ledger = Ledger::load(&self.ledger_file)
            .with_context(|| format!("loading ledger {}", self.ledger_file.display()))?;

        let mut market = match &self.market_file {
            Some(path) if path.exists() => MarketData::load(path)
                .with_context(|| format!("loading market data {}", path.display()))?,
            _ => MarketData::new(),
        };
        market.absorb(&ledger)?;

        Ok((ledger, market))
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var_os(name).map(PathBuf::from)
}
