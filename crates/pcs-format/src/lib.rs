//! Plain-text rendering of portfolio reports.
//!
//! Formatting helpers plus one renderer per report object. Everything
//! here is a pure function of report values; the reports themselves come
//! from `pcs-core`.

use chrono::NaiveDate;
use pcs_core::report::{GainsReport, HoldingReport, ReviewReport};
use pcs_money::Money;
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt::Write;

/// Format a decimal to a fixed number of fractional digits.
pub fn format_decimal_fixed(value: Decimal, precision: u32) -> String {
    let rounded = value.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.precision$}", precision = precision as usize)
}

/// Format a decimal, removing trailing zeros after the decimal point.
pub fn format_decimal(value: Decimal) -> String {
    let s = value.to_string();
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

/// Format an amount with thousands separators, rounded to the currency's
/// minor units, suffixed with the code: `1,234.50 EUR`.
pub fn format_money(value: &Money) -> String {
    let rounded = value.amount.round_dp_with_strategy(
        value.minor_units(),
        RoundingStrategy::MidpointAwayFromZero,
    );
    let fixed = format_decimal_fixed(rounded.abs(), value.minor_units());
    let mut parts = fixed.split('.');
    let integer_part = parts.next().unwrap_or("0");
    let fractional_part = parts.next();

    let mut grouped = group_thousands(integer_part);
    if let Some(frac) = fractional_part {
        grouped.push('.');
        grouped.push_str(frac);
    }

    let sign = if rounded.is_sign_negative() { "-" } else { "" };
    if value.code().is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped} {}", value.code())
    }
}

/// Format a fraction as a signed percentage: `0.15` → `+15.00%`.
pub fn format_percent(fraction: Decimal) -> String {
    let percent = (fraction * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if percent.is_sign_negative() {
        format!("{percent}%")
    } else {
        format!("+{percent}%")
    }
}

/// Format a date as ISO `YYYY-MM-DD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn group_thousands(integer_part: &str) -> String {
    let chars: Vec<char> = integer_part.chars().collect();
    let mut result = String::with_capacity(chars.len() + chars.len() / 3);
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result
}

fn optional_money(value: &Option<Money>) -> String {
    match value {
        Some(money) => format_money(money),
        None => "?".to_string(),
    }
}

fn optional_percent(value: &Option<Decimal>) -> String {
    match value {
        Some(fraction) => format_percent(*fraction),
        None => "N/A".to_string(),
    }
}

fn write_warnings(out: &mut String, warnings: &[String]) {
    if warnings.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n# WARNINGS\n");
    for warning in warnings {
        let _ = writeln!(out, "- {warning}");
    }
}

/// Render a holdings report as plain text.
pub fn format_holding(report: &HoldingReport) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "# HOLDINGS on {} (in {})\n",
        format_date(report.date),
        report.currency
    );

    if !report.securities.is_empty() {
        let _ = writeln!(out, "{:<10}{:>14}{:>16}{:>18}", "Ticker", "Quantity", "Price", "Value");
        let _ = writeln!(out, "==========================================================");
        for row in &report.securities {
            let price = match &row.price {
                Some(price) => format_money(price),
                None => "unknown".to_string(),
            };
            let _ = writeln!(
                out,
                "{:<10}{:>14}{:>16}{:>18}",
                row.ticker,
                format_decimal(row.quantity),
                price,
                optional_money(&row.value),
            );
        }
    }

    if !report.cash.is_empty() {
        let _ = writeln!(out, "\n## Cash\n");
        for row in &report.cash {
            let _ = writeln!(
                out,
                "{:<14}{:>18}",
                format_money(&row.balance),
                optional_money(&row.value)
            );
        }
    }

    if !report.counterparties.is_empty() {
        let _ = writeln!(out, "\n## Counterparties\n");
        for row in &report.counterparties {
            let _ = writeln!(
                out,
                "{:<14}{:>16}{:>18}",
                row.name,
                format_money(&row.balance),
                optional_money(&row.value)
            );
        }
    }

    let _ = writeln!(out, "\nTOTAL: {}", format_money(&report.total));
    write_warnings(&mut out, &report.warnings);

    out
}

/// Render a gains report as plain text.
pub fn format_gains(report: &GainsReport) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "# GAINS {}..{} ({} basis, in {})\n",
        format_date(report.from),
        format_date(report.to),
        report.basis,
        report.currency
    );
    let _ = writeln!(out, "{:<22}{:>18}", "Realized", format_money(&report.realized));
    let _ = writeln!(out, "{:<22}{:>18}", "Unrealized", format_money(&report.unrealized));
    let _ = writeln!(out, "{:<22}{:>18}", "Dividends", format_money(&report.dividends));
    let _ = writeln!(
        out,
        "{:<22}{:>18}",
        "Net trading flow",
        format_money(&report.net_trading_flow)
    );
    let _ = writeln!(
        out,
        "{:<22}{:>18}",
        "Market gain/loss",
        format_money(&report.market_gain_loss)
    );
    let _ = writeln!(
        out,
        "{:<22}{:>18}",
        "Total return",
        format_money(&report.total_return)
    );
    write_warnings(&mut out, &report.warnings);

    out
}

/// Render a review report as plain text.
pub fn format_review(report: &ReviewReport) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "# REVIEW {}..{} (in {})\n",
        format_date(report.from),
        format_date(report.to),
        report.currency
    );
    let _ = writeln!(out, "{:<22}{:>18}", "Start value", optional_money(&report.start_value));
    let _ = writeln!(out, "{:<22}{:>18}", "End value", optional_money(&report.end_value));
    let _ = writeln!(out, "{:<22}{:>18}", "Change", optional_money(&report.change));
    let _ = writeln!(
        out,
        "{:<22}{:>18}",
        "Net cash flow",
        format_money(&report.net_cash_flow)
    );
    let _ = writeln!(
        out,
        "{:<22}{:>18}",
        "Market gain/loss",
        format_money(&report.market_gain_loss)
    );
    let _ = writeln!(out, "{:<22}{:>18}", "Dividends", format_money(&report.dividends));
    let _ = writeln!(
        out,
        "{:<22}{:>18}",
        "FX effect",
        optional_money(&report.fx_effect)
    );
    let _ = writeln!(out, "{:<22}{:>18}", "TWR", optional_percent(&report.twr));

    if !report.assets.is_empty() {
        let _ = writeln!(out, "\n## Assets\n");
        let _ = writeln!(
            out,
            "{:<10}{:>18}{:>18}{:>12}",
            "Ticker", "Start", "End", "TWR"
        );
        let _ = writeln!(out, "==========================================================");
        for asset in &report.assets {
            let _ = writeln!(
                out,
                "{:<10}{:>18}{:>18}{:>12}",
                asset.ticker,
                optional_money(&asset.start_value),
                optional_money(&asset.end_value),
                optional_percent(&asset.twr),
            );
        }
    }

    write_warnings(&mut out, &report.warnings);

    out
}
