//! Stats command: per-state totals for one day.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, TimeZone};
use deskcare_core::stats::daily_stats;
use deskcare_core::{ActivityState, DailyStats, IntervalStore};

use crate::commands::util::format_duration;

/// Writes the statistics of `date` as a table or as the flat JSON mapping.
pub fn run<W: Write, S: IntervalStore>(
    writer: &mut W,
    store: &S,
    date: NaiveDate,
    threshold_secs: i64,
    json: bool,
) -> Result<()> {
    let stats = daily_stats(store, date, None, Local::now(), threshold_secs);
    if json {
        let json = serde_json::to_string_pretty(&stats.to_flat_map())
            .context("failed to serialize stats")?;
        writeln!(writer, "{json}")?;
    } else {
        write_table(writer, &stats, threshold_secs)?;
    }
    Ok(())
}

/// Renders statistics as a fixed-width table.
pub fn write_table<W: Write>(writer: &mut W, stats: &DailyStats, threshold_secs: i64) -> Result<()> {
    writeln!(writer, "Activity on {}", stats.date)?;
    writeln!(writer, "{:<8} {:>8} {:>8}  Longest", "State", "Total", "Sessions")?;
    for state in ActivityState::ALL {
        let totals = stats.totals(state);
        let longest = match totals.max_start.and_then(|s| Local.timestamp_opt(s, 0).earliest()) {
            Some(start) => format!(
                "{} from {}",
                format_duration(totals.max_seconds),
                start.format("%H:%M")
            ),
            None => "-".to_string(),
        };
        writeln!(
            writer,
            "{:<8} {:>8} {:>8}  {longest}",
            state.as_str(),
            format_duration(totals.total_seconds),
            totals.count,
        )?;
    }
    writeln!(
        writer,
        "Focus blocks over {}: {}",
        format_duration(threshold_secs),
        stats.focus_session_count
    )?;
    Ok(())
}
