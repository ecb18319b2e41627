//! Report command: annotated focus sessions as a text report.

use std::io::Write;

use anyhow::Result;
use chrono::NaiveDate;
use deskcare_core::report::generate_report;
use deskcare_core::{IntervalStore, ReportMode, ReportRange};

/// Chooses the range from the `--week` / `--month` flags.
pub const fn range_from_flags(week: bool, month: bool) -> ReportRange {
    if month {
        ReportRange::Month
    } else if week {
        ReportRange::Week
    } else {
        ReportRange::Day
    }
}

pub fn run<W: Write, S: IntervalStore>(
    writer: &mut W,
    store: &S,
    date: NaiveDate,
    range: ReportRange,
    mode: ReportMode,
) -> Result<()> {
    let report = generate_report(store, date, range, mode);
    write!(writer, "{report}")?;
    Ok(())
}
