//! Status command: database location and the latest recorded session.

use std::io::Write;
use std::path::Path;

use anyhow::Result;

use deskcare_db::Database;

use crate::commands::util::format_duration;

pub fn run<W: Write>(writer: &mut W, db: &Database, database_path: &Path) -> Result<()> {
    let count = db.interval_count()?;

    writeln!(writer, "DeskCare status")?;
    writeln!(writer, "Database: {}", database_path.display())?;
    writeln!(writer, "Sessions: {count}")?;

    let Some(latest) = db.latest_interval()? else {
        writeln!(writer, "No sessions recorded.")?;
        return Ok(());
    };
    let started = latest.start_local().map_or_else(
        || latest.start_time.to_string(),
        |t| t.format("%Y-%m-%d %H:%M").to_string(),
    );
    writeln!(
        writer,
        "Latest: #{} {} for {} from {started}",
        latest.id,
        latest.state,
        format_duration(latest.duration)
    )?;
    Ok(())
}
