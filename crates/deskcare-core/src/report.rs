//! Work reports built from annotated focus sessions.
//!
//! Notes are stored in the `content` column either as a structured record
//! (`{"formal":"…","learning":"…","personal":"…"}`) or, for rows written by
//! older clients, as plain text whose category is given by the row's work
//! type.

use std::fmt::{self, Write};
use std::str::FromStr;

use chrono::{Local, NaiveDate, TimeZone};
use serde::Deserialize;

use crate::calendar::{days_window, month_start, week_start};
use crate::interval::Interval;
use crate::state::{ValidationError, WorkType};
use crate::store::IntervalStore;

/// Which days a report covers, ending on the reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportRange {
    /// The reference date only.
    #[default]
    Day,
    /// Monday of the reference date's week through the reference date.
    Week,
    /// The 1st of the reference date's month through the reference date.
    Month,
}

impl ReportRange {
    /// First day covered when the report ends on `date`.
    #[must_use]
    pub fn first_day(self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Day => date,
            Self::Week => week_start(date),
            Self::Month => month_start(date),
        }
    }
}

impl FromStr for ReportRange {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            _ => Err(ValidationError::UnknownRange(s.to_string())),
        }
    }
}

/// Who the report is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportMode {
    /// Every category, for the user's own review.
    #[default]
    SelfReview,
    /// Formal work only, for a workplace audience.
    Formal,
}

impl ReportMode {
    fn description(self) -> &'static str {
        match self {
            Self::SelfReview => "Full review (self)",
            Self::Formal => "Workplace report (formal)",
        }
    }
}

impl FromStr for ReportMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "self" => Ok(Self::SelfReview),
            "formal" => Ok(Self::Formal),
            _ => Err(ValidationError::UnknownMode(s.to_string())),
        }
    }
}

/// The three note categories attached to a focus session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkNotes {
    pub formal: String,
    pub learning: String,
    pub personal: String,
}

#[derive(Deserialize)]
struct RawNotes {
    #[serde(default)]
    formal: Option<String>,
    #[serde(default)]
    learning: Option<String>,
    #[serde(default)]
    personal: Option<String>,
}

impl WorkNotes {
    /// Interprets stored content.
    ///
    /// Content starting with `{` is read as a structured record; anything else
    /// is a single legacy note filed under `work_type`.
    #[must_use]
    pub fn parse(content: &str, work_type: WorkType) -> Self {
        let trimmed = content.trim_start();
        if trimmed.starts_with('{') {
            return Self::parse_structured(trimmed);
        }

        let mut notes = Self::default();
        let text = content.to_string();
        match work_type {
            WorkType::Formal => notes.formal = text,
            WorkType::Learning => notes.learning = text,
            WorkType::Personal => notes.personal = text,
        }
        notes
    }

    /// Reads the first JSON value in `content`, ignoring anything after it.
    ///
    /// Records the JSON parser rejects (older clients wrote raw control
    /// characters) fall back to scanning for the literal field markers.
    fn parse_structured(content: &str) -> Self {
        let mut values = serde_json::Deserializer::from_str(content).into_iter::<RawNotes>();
        match values.next() {
            Some(Ok(raw)) => Self {
                formal: raw.formal.unwrap_or_default(),
                learning: raw.learning.unwrap_or_default(),
                personal: raw.personal.unwrap_or_default(),
            },
            Some(Err(err)) => {
                tracing::debug!(error = %err, "notes are not valid JSON, scanning markers");
                Self::scan_markers(content)
            }
            None => Self::default(),
        }
    }

    fn scan_markers(content: &str) -> Self {
        Self {
            formal: scan_field(content, "formal"),
            learning: scan_field(content, "learning"),
            personal: scan_field(content, "personal"),
        }
    }

    /// Serializes the notes as a structured record.
    #[must_use]
    pub fn to_content(&self) -> String {
        serde_json::json!({
            "formal": self.formal,
            "learning": self.learning,
            "personal": self.personal,
        })
        .to_string()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.formal.is_empty() && self.learning.is_empty() && self.personal.is_empty()
    }
}

/// Extracts the value after the first `"<key>":"` up to the next quote and
/// turns literal `\n` sequences into newlines. Missing markers and unterminated
/// values yield an empty string.
fn scan_field(content: &str, key: &str) -> String {
    let marker = format!("\"{key}\":\"");
    let Some(start) = content.find(&marker).map(|i| i + marker.len()) else {
        return String::new();
    };
    let rest = &content[start..];
    match rest.find('"') {
        Some(end) => rest[..end].replace("\\n", "\n"),
        None => String::new(),
    }
}

struct Header {
    first: NaiveDate,
    last: NaiveDate,
    mode: ReportMode,
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "📅 Work Report")?;
        writeln!(
            f,
            "Range: {} to {}",
            self.first.format("%m-%d"),
            self.last.format("%m-%d")
        )?;
        writeln!(f, "Mode: {}", self.mode.description())?;
        writeln!(f, "{}", "-".repeat(40))
    }
}

/// Renders annotated focus sessions covering `[first, last]`.
///
/// Each note becomes `<marker> [MM-dd HH:mm-HH:mm] (<minutes>m) <text>`.
/// Formal mode keeps only formal notes.
#[must_use]
pub fn render_report(
    first: NaiveDate,
    last: NaiveDate,
    mode: ReportMode,
    rows: &[Interval],
) -> String {
    let mut output = Header { first, last, mode }.to_string();
    let mut count = 0;

    for row in rows {
        let Some(content) = row.content() else {
            continue;
        };
        let (Some(start), Some(end)) = (
            Local.timestamp_opt(row.start_time, 0).earliest(),
            Local.timestamp_opt(row.end_time, 0).earliest(),
        ) else {
            tracing::warn!(id = row.id, "skipping row with unrepresentable times");
            continue;
        };
        let span = format!(
            "[{} {}-{}] ({}m)",
            start.format("%m-%d"),
            start.format("%H:%M"),
            end.format("%H:%M"),
            row.duration / 60
        );

        let notes = WorkNotes::parse(content, row.work_type);
        let formal_marker = match mode {
            ReportMode::SelfReview => "🔵",
            ReportMode::Formal => "•",
        };
        let mut lines = vec![(formal_marker, &notes.formal)];
        if mode == ReportMode::SelfReview {
            lines.push(("🟢", &notes.learning));
            lines.push(("🟡", &notes.personal));
        }

        let mut has_output = false;
        for (marker, text) in lines.into_iter().filter(|(_, text)| !text.is_empty()) {
            let _ = writeln!(output, "{marker} {span} {text}");
            has_output = true;
        }
        if has_output {
            count += 1;
        }
    }

    if count == 0 {
        output.push_str("(no records)\n");
    }
    output
}

/// Generates the report for the range ending on `date`.
///
/// Never fails: a query error is returned as a short message.
pub fn generate_report<S: IntervalStore>(
    store: &S,
    date: NaiveDate,
    range: ReportRange,
    mode: ReportMode,
) -> String {
    let first = range.first_day(date);
    let (start, end) = days_window(first, date);
    match store.annotated_focus_between(start, end) {
        Ok(rows) => render_report(first, date, mode, &rows),
        Err(err) => {
            tracing::warn!(error = %err, "report query failed");
            format!("Error: Query failed {err}")
        }
    }
}
