use anyhow::{Context, Result, bail};
use clap::Parser;
use pcs_core::date::{self, Period};
use pcs_core::snapshot::CostBasis;
use pcs_core::transaction::{Transaction, decode_line};
use pcs_core::{GainsReport, HoldingReport, MarketData, ReviewReport};
use schemars::schema_for;
use std::path::PathBuf;

mod commands;
mod config;

use commands::{Commands, OutputFormat};
use config::Config;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Ledger file (overrides PCS_LEDGER_FILE)
    #[arg(long, global = true)]
    ledger: Option<PathBuf>,

    /// Market data file (overrides PCS_MARKET_FILE)
    #[arg(long, global = true)]
    market: Option<PathBuf>,

    /// Reporting currency (overrides PCS_DEFAULT_CURRENCY)
    #[arg(long, global = true)]
    currency: Option<String>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "plain")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let today = chrono::Local::now().date_naive();

    if let Commands::Schema = &cli.command {
        let schema = schema_for!(Vec<Transaction>);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }

    let config = Config::resolve(cli.ledger.clone(), cli.market.clone(), cli.currency.clone())?;

    match &cli.command {
        Commands::Holding { date } => {
            let date = date::parse(date, today)?;
            let (ledger, market) = config.load()?;
            let report = HoldingReport::new(&ledger, &market, config.currency, date)?;
            match cli.format {
                OutputFormat::Plain => print!("{}", pcs_format::format_holding(&report)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            }
        }

        Commands::Gains { from, to, basis } => {
            let from = date::parse(from, today)?;
            let to = date::parse(to, today)?;
            let basis = parse_basis(basis)?;
            let (ledger, market) = config.load()?;
            let report = GainsReport::new(&ledger, &market, config.currency, basis, from, to)?;
            match cli.format {
                OutputFormat::Plain => print!("{}", pcs_format::format_gains(&report)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            }
        }

        Commands::Review {
            period,
            date: anchor,
            from,
            to,
            basis,
        } => {
            let basis = parse_basis(basis)?;
            let (from, to) = match (period, from, to) {
                (Some(period), None, None) => {
                    let anchor = date::parse(anchor, today)?;
                    let period = Period::from(*period);
                    let start = date::start_of(period, anchor);
                    let end = date::end_of(period, anchor);
                    // The review covers (from, to], so start one day early.
                    let from = date::add_days(start, -1)
                        .ok_or_else(|| anyhow::anyhow!("period start out of range"))?;
                    (from, end)
                }
                (None, Some(from), Some(to)) => {
                    (date::parse(from, today)?, date::parse(to, today)?)
                }
                (None, None, None) => {
                    // Default: the current month so far.
                    let start = date::start_of(Period::Month, today);
                    let from = date::add_days(start, -1)
                        .ok_or_else(|| anyhow::anyhow!("period start out of range"))?;
                    (from, today)
                }
                _ => bail!("pass either --period or both --from and --to"),
            };
            let (ledger, market) = config.load()?;
            let report =
                ReviewReport::new(&ledger, &market, config.currency, basis, from, to)?;
            match cli.format {
                OutputFormat::Plain => print!("{}", pcs_format::format_review(&report)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            }
        }

        Commands::Record { file } => {
            let content = std::fs::read_to_string(file)
                .with_context(|| format!("reading {}", file.display()))?;
            let mut batch = Vec::new();
            for (idx, line) in content.lines().enumerate() {
                if let Some(txn) = decode_line(line, idx + 1)? {
                    batch.push(txn);
                }
            }
            let count = batch.len();
            let mut ledger = if config.ledger_file.exists() {
                pcs_core::Ledger::load(&config.ledger_file)?
            } else {
                pcs_core::Ledger::new()
            };
            ledger.append(batch)?;
            ledger.save(&config.ledger_file)?;
            println!(
                "recorded {count} transaction(s) into {}",
                config.ledger_file.display()
            );
        }

        Commands::Check => {
            let (ledger, _) = config.load()?;
            println!("{} transaction(s), ledger is valid", ledger.len());
            for security in ledger.declared() {
                println!("{}\t{}\t{}", security.ticker, security.id, security.currency);
            }
        }

        Commands::Import { file } => {
            let Some(market_file) = &config.market_file else {
                bail!("no market file: pass --market or set {}", config::MARKET_ENV);
            };
            let incoming = MarketData::load(file)
                .with_context(|| format!("reading {}", file.display()))?;
            let mut market = if market_file.exists() {
                MarketData::load(market_file)?
            } else {
                MarketData::new()
            };
            market.merge(&incoming);
            market.save(market_file)?;
            println!("imported into {}", market_file.display());
        }

        Commands::Export => {
            let (_, market) = config.load()?;
            let mut stdout = std::io::stdout().lock();
            market.encode(&mut stdout)?;
        }

        // Handled before config resolution.
        Commands::Schema => {}
    }

    Ok(())
}

fn parse_basis(s: &str) -> Result<CostBasis> {
    s.parse::<CostBasis>().map_err(|e| anyhow::anyhow!(e))
}
