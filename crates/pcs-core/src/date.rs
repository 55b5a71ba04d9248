//! Flexible date parsing and calendar period helpers.
//!
//! Dates are plain `chrono::NaiveDate` values: day granularity, no
//! time-of-day, no timezone. Parsing is always relative to an explicit
//! `today` so the accounting core never reads the clock.

use crate::error::PcsError;
use chrono::{Datelike, Days, Months, NaiveDate};

/// A calendar period used for report ranges. Weeks start on Monday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

/// Parse a date expression relative to `today`.
///
/// Accepted forms, in order of disambiguation:
/// 1. the literal `0d` (today);
/// 2. a signed offset `[+-]N[dwmqy]` — days, weeks, calendar months,
///    quarters (3 months), calendar years;
/// 3. `[MM-]DD` in the current year, where day `0` means the last day of
///    the previous month and month `0` means December of the previous year;
/// 4. ISO `YYYY-M-D` with permissive zero padding.
pub fn parse(input: &str, today: NaiveDate) -> Result<NaiveDate, PcsError> {
    let s = input.trim();
    if s == "0d" {
        return Ok(today);
    }
    if let Some(date) = parse_offset(s, today) {
        return Ok(date);
    }
    if let Some(date) = parse_month_day(s, today)? {
        return Ok(date);
    }
    if let Some(date) = parse_iso(s) {
        return Ok(date);
    }
    Err(PcsError::InvalidDate(input.to_string()))
}

/// `[+-]N[dwmqy]`: the sign is mandatory.
fn parse_offset(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let mut chars = s.chars();
    let sign = match chars.next()? {
        '+' => 1i64,
        '-' => -1i64,
        _ => return None,
    };
    let rest = &s[1..];
    if rest.len() < 2 {
        return None;
    }
    let (digits, unit) = rest.split_at(rest.len() - 1);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let magnitude: u32 = digits.parse().ok()?;

    let shift_months = |months: u32| -> Option<NaiveDate> {
        if sign > 0 {
            today.checked_add_months(Months::new(months))
        } else {
            today.checked_sub_months(Months::new(months))
        }
    };
    let shift_days = |days: u64| -> Option<NaiveDate> {
        if sign > 0 {
            today.checked_add_days(Days::new(days))
        } else {
            today.checked_sub_days(Days::new(days))
        }
    };

    match unit {
        "d" => shift_days(u64::from(magnitude)),
        "w" => shift_days(u64::from(magnitude) * 7),
        "m" => shift_months(magnitude),
        "q" => shift_months(magnitude * 3),
        "y" => shift_months(magnitude * 12),
        _ => None,
    }
}

/// `[MM-]DD` in the current year, with the zero back-off conventions.
///
/// Returns `Ok(None)` when the shape doesn't match (so ISO parsing can have
/// a go), and an error when the shape matches but the values are no date.
fn parse_month_day(s: &str, today: NaiveDate) -> Result<Option<NaiveDate>, PcsError> {
    let parts: Vec<&str> = s.split('-').collect();
    if parts.len() > 2 || parts.iter().any(|p| p.is_empty()) {
        return Ok(None);
    }
    if !parts
        .iter()
        .all(|p| p.chars().all(|c| c.is_ascii_digit()))
    {
        return Ok(None);
    }

    let invalid = || PcsError::InvalidDate(s.to_string());

    let (month_str, day_str) = match parts.as_slice() {
        [day] => (None, *day),
        [month, day] => (Some(*month), *day),
        _ => return Ok(None),
    };

    let day: u32 = day_str.parse().map_err(|_| invalid())?;
    let mut year = today.year();
    let mut month: u32 = match month_str {
        Some(m) => m.parse().map_err(|_| invalid())?,
        None => today.month(),
    };

    // Month 0 is December of the previous year.
    if month == 0 {
        month = 12;
        year -= 1;
    }
    if month > 12 {
        return Err(invalid());
    }

    // Day 0 is the last day of the previous month.
    if day == 0 {
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        return first.checked_sub_days(Days::new(1)).map(Some).ok_or_else(invalid);
    }

    NaiveDate::from_ymd_opt(year, month, day)
        .map(Some)
        .ok_or_else(invalid)
}

/// ISO `YYYY-M-D`, permissive about zero padding.
fn parse_iso(s: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = s.split('-').collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    if !parts
        .iter()
        .all(|p| p.chars().all(|c| c.is_ascii_digit()))
    {
        return None;
    }
    let year: i32 = parts[0].parse().ok()?;
    let month: u32 = parts[1].parse().ok()?;
    let day: u32 = parts[2].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// First day of the period containing `date`.
pub fn start_of(period: Period, date: NaiveDate) -> NaiveDate {
    match period {
        Period::Day => date,
        Period::Week => {
            let back = u64::from(date.weekday().num_days_from_monday());
            date.checked_sub_days(Days::new(back)).unwrap_or(date)
        }
        Period::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date),
        Period::Quarter => {
            let month = ((date.month() - 1) / 3) * 3 + 1;
            NaiveDate::from_ymd_opt(date.year(), month, 1).unwrap_or(date)
        }
        Period::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
    }
}

/// Last day of the period containing `date`.
pub fn end_of(period: Period, date: NaiveDate) -> NaiveDate {
    let start = start_of(period, date);
    let next = match period {
        Period::Day => return date,
        Period::Week => start.checked_add_days(Days::new(7)),
        Period::Month => start.checked_add_months(Months::new(1)),
        Period::Quarter => start.checked_add_months(Months::new(3)),
        Period::Year => start.checked_add_months(Months::new(12)),
    };
    next.and_then(|d| d.checked_sub_days(Days::new(1)))
        .unwrap_or(date)
}

/// Shift a date by a signed number of days.
pub fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    if days >= 0 {
        date.checked_add_days(Days::new(days as u64))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).expect("valid date")
    }

    #[test]
    fn test_parse_today_literal() {
        let today = d(2025, 3, 15);
        assert_eq!(parse("0d", today).expect("parse"), today);
    }

    #[test]
    fn test_parse_signed_offsets() {
        let today = d(2025, 3, 15);
        assert_eq!(parse("-3d", today).expect("parse"), d(2025, 3, 12));
        assert_eq!(parse("+1w", today).expect("parse"), d(2025, 3, 22));
        assert_eq!(parse("-1m", today).expect("parse"), d(2025, 2, 15));
        assert_eq!(parse("+1q", today).expect("parse"), d(2025, 6, 15));
        assert_eq!(parse("-2y", today).expect("parse"), d(2023, 3, 15));
    }

    #[test]
    fn test_parse_offset_requires_sign() {
        let today = d(2025, 3, 15);
        assert!(parse("3d", today).is_err());
    }

    #[test]
    fn test_parse_month_clamps_end_of_month() {
        // Jan 31 plus one month clamps to the last day of February.
        let today = d(2025, 1, 31);
        assert_eq!(parse("+1m", today).expect("parse"), d(2025, 2, 28));
    }

    #[test]
    fn test_parse_month_day_current_year() {
        let today = d(2025, 3, 15);
        assert_eq!(parse("7", today).expect("parse"), d(2025, 3, 7));
        assert_eq!(parse("12-24", today).expect("parse"), d(2025, 12, 24));
    }

    #[test]
    fn test_parse_zero_day_and_month() {
        let today = d(2025, 3, 15);
        // Day 0: last day of the previous month.
        assert_eq!(parse("0", today).expect("parse"), d(2025, 2, 28));
        assert_eq!(parse("3-0", today).expect("parse"), d(2025, 2, 28));
        assert_eq!(parse("1-0", today).expect("parse"), d(2024, 12, 31));
        // Month 0: December of the previous year.
        assert_eq!(parse("0-5", today).expect("parse"), d(2024, 12, 5));
    }

    #[test]
    fn test_parse_iso_permissive_padding() {
        let today = d(2025, 3, 15);
        assert_eq!(parse("2024-1-5", today).expect("parse"), d(2024, 1, 5));
        assert_eq!(parse("2024-01-05", today).expect("parse"), d(2024, 1, 5));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let today = d(2025, 3, 15);
        for input in ["", "tomorrow", "+3x", "2024-13-01", "1-2-3-4", "13-40"] {
            assert!(parse(input, today).is_err(), "should reject '{input}'");
        }
    }

    #[test]
    fn test_iso_round_trip() {
        let today = d(2025, 3, 15);
        for date in [d(2024, 2, 29), d(2025, 12, 31), d(1999, 1, 1)] {
            let parsed = parse(&date.to_string(), today).expect("parse");
            assert_eq!(parsed, date);
        }
    }

    #[test]
    fn test_period_boundaries() {
        let mid = d(2025, 8, 14); // a Thursday
        assert_eq!(start_of(Period::Week, mid), d(2025, 8, 11));
        assert_eq!(end_of(Period::Week, mid), d(2025, 8, 17));
        assert_eq!(start_of(Period::Month, mid), d(2025, 8, 1));
        assert_eq!(end_of(Period::Month, mid), d(2025, 8, 31));
        assert_eq!(start_of(Period::Quarter, mid), d(2025, 7, 1));
        assert_eq!(end_of(Period::Quarter, mid), d(2025, 9, 30));
        assert_eq!(start_of(Period::Year, mid), d(2025, 1, 1));
        assert_eq!(end_of(Period::Year, mid), d(2025, 12, 31));
    }

    #[test]
    fn test_february_month_end() {
        assert_eq!(end_of(Period::Month, d(2024, 2, 10)), d(2024, 2, 29));
        assert_eq!(end_of(Period::Month, d(2025, 2, 10)), d(2025, 2, 28));
    }
}
