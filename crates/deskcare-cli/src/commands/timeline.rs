//! Timeline command: the recorded sessions of one day.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, TimeZone};
use deskcare_core::timeline::daily_activities;
use deskcare_core::{ActivityRecord, IntervalStore, WorkNotes, WorkType};

use crate::commands::util::format_duration;

pub fn run<W: Write, S: IntervalStore>(
    writer: &mut W,
    store: &S,
    date: NaiveDate,
    json: bool,
) -> Result<()> {
    let records = daily_activities(store, date, None, Local::now());
    if json {
        let json =
            serde_json::to_string_pretty(&records).context("failed to serialize timeline")?;
        writeln!(writer, "{json}")?;
        return Ok(());
    }
    write_records(writer, date, &records)
}

/// Renders timeline records one per line.
pub fn write_records<W: Write>(
    writer: &mut W,
    date: NaiveDate,
    records: &[ActivityRecord],
) -> Result<()> {
    writeln!(writer, "Timeline for {date}")?;
    if records.is_empty() {
        writeln!(writer, "No sessions recorded.")?;
        return Ok(());
    }

    for record in records {
        let id = record
            .id
            .map_or_else(|| "now".to_string(), |id| format!("#{id}"));
        let span = format!(
            "{}-{}",
            clock(record.start_time),
            if record.is_ongoing {
                "...".to_string()
            } else {
                clock(record.end_time)
            }
        );
        write!(
            writer,
            "{id:>5}  {span:<11}  {:<8} {:>7}",
            record.state.as_str(),
            format_duration(record.duration)
        )?;
        if let Some(content) = record.content.as_deref().filter(|c| !c.is_empty()) {
            let notes = WorkNotes::parse(content, WorkType::from_code(record.work_type));
            write!(writer, "  {}", summarize(&notes))?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

fn clock(millis: i64) -> String {
    Local
        .timestamp_millis_opt(millis)
        .earliest()
        .map_or_else(|| "??:??".to_string(), |t| t.format("%H:%M").to_string())
}

fn summarize(notes: &WorkNotes) -> String {
    [
        ("formal", &notes.formal),
        ("learning", &notes.learning),
        ("personal", &notes.personal),
    ]
    .into_iter()
    .filter(|(_, text)| !text.is_empty())
    .map(|(kind, text)| format!("[{kind}] {}", text.replace('\n', " / ")))
    .collect::<Vec<_>>()
    .join(" ")
}
