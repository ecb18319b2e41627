//! Shared utilities for CLI commands.

use std::sync::LazyLock;

use anyhow::Context;
use chrono::{Days, Local, NaiveDate};
use regex::Regex;

/// Pre-compiled regex for relative day parsing.
static RELATIVE_DAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+days?\s+ago$").unwrap());

/// Conservative bound for relative day parsing (~1000 years).
const MAX_RELATIVE_DAYS: u64 = 1000 * 365;

/// Parses a `--date` argument, defaulting to today.
pub fn parse_date_or_today(s: Option<&str>) -> anyhow::Result<NaiveDate> {
    let today = Local::now().date_naive();
    s.map_or(Ok(today), |s| parse_date(s, today))
}

/// Parses a calendar day relative to `today`.
///
/// Supports:
/// - ISO 8601: "2025-01-29"
/// - "today", "yesterday"
/// - Relative: "1 day ago", "3 days ago"
pub fn parse_date(s: &str, today: NaiveDate) -> anyhow::Result<NaiveDate> {
    let s = s.trim();
    match s {
        "today" => return Ok(today),
        "yesterday" => return days_before(today, 1),
        _ => {}
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }

    let Some(caps) = RELATIVE_DAY_RE.captures(s) else {
        anyhow::bail!(
            "Invalid date: {s}. Use YYYY-MM-DD, 'today', 'yesterday' or relative (e.g., '3 days ago')"
        );
    };

    let n: u64 = caps[1]
        .parse()
        .context("failed to parse number in relative date")?;
    if n > MAX_RELATIVE_DAYS {
        anyhow::bail!("Relative date value too large: {n} days");
    }
    days_before(today, n)
}

fn days_before(today: NaiveDate, n: u64) -> anyhow::Result<NaiveDate> {
    today
        .checked_sub_days(Days::new(n))
        .with_context(|| format!("date out of range: {n} days before {today}"))
}

/// Formats whole seconds as `1h 5m`, `12m` or `40s`.
pub fn format_duration(secs: i64) -> String {
    if secs <= 0 {
        return "0m".to_string();
    }
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else if minutes >= 1 {
        format!("{minutes}m")
    } else {
        format!("{secs}s")
    }
}

/// The local timezone name, falling back to UTC when it cannot be detected.
pub fn timezone_name() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}
