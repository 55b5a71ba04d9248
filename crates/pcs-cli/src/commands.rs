use clap::{Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Value holdings, cash, and counterparties at a date
    Holding {
        /// Report date (flexible: 0d, -1w, [MM-]DD, YYYY-MM-DD)
        #[arg(long, default_value = "0d")]
        date: String,
    },
    /// Realized and unrealized gains over a period
    Gains {
        /// Period start (exclusive)
        #[arg(long)]
        from: String,

        /// Period end (inclusive)
        #[arg(long, default_value = "0d")]
        to: String,

        /// Cost basis policy
        #[arg(long, default_value = "fifo")]
        basis: String,
    },
    /// Periodic review: value change decomposition and TWR
    Review {
        /// Calendar period anchored on --date
        #[arg(long, value_enum, conflicts_with_all = ["from", "to"])]
        period: Option<PeriodArg>,

        /// Anchor date for --period (default today)
        #[arg(long, default_value = "0d")]
        date: String,

        /// Period start (exclusive), alternative to --period
        #[arg(long, requires = "to")]
        from: Option<String>,

        /// Period end (inclusive)
        #[arg(long)]
        to: Option<String>,

        /// Cost basis policy for the gains breakdown
        #[arg(long, default_value = "fifo")]
        basis: String,
    },
    /// Append transactions from a JSON-Lines file to the ledger
    Record {
        /// File of transactions, one JSON object per line
        file: PathBuf,
    },
    /// Validate the ledger and list declared securities
    Check,
    /// Merge a JSON-Lines market data file into the market store
    Import {
        /// File of price and split records
        file: PathBuf,
    },
    /// Print the market store in canonical JSON-Lines form
    Export,
    /// Print the JSON schema of the transaction format
    Schema,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PeriodArg {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl From<PeriodArg> for pcs_core::date::Period {
    fn from(arg: PeriodArg) -> Self {
        match arg {
            PeriodArg::Day => Self::Day,
            PeriodArg::Week => Self::Week,
            PeriodArg::Month => Self::Month,
            PeriodArg::Quarter => Self::Quarter,
            PeriodArg::Year => Self::Year,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}
