//! Display records for a day's timeline.

use chrono::{DateTime, Local, NaiveDate};
use serde::Serialize;

use crate::calendar::day_window;
use crate::interval::{CurrentSession, Interval};
use crate::state::ActivityState;
use crate::store::IntervalStore;

/// One bar on the timeline.
///
/// Times are milliseconds since the epoch; durations stay in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    /// `None` for the synthetic in-progress record.
    pub id: Option<i64>,
    pub state: ActivityState,
    pub start_time: i64,
    pub end_time: i64,
    pub duration: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub work_type: i64,
    /// Colour bucket, see [`ActivityState::color_code`].
    #[serde(rename = "type")]
    pub color: u8,
    pub is_ongoing: bool,
}

impl From<&Interval> for ActivityRecord {
    fn from(interval: &Interval) -> Self {
        Self {
            id: Some(interval.id),
            state: interval.state,
            start_time: interval.start_time * 1000,
            end_time: interval.end_time * 1000,
            duration: interval.duration,
            content: interval.content.clone(),
            work_type: interval.work_type.code(),
            color: interval.state.color_code(),
            is_ongoing: false,
        }
    }
}

impl ActivityRecord {
    /// The open session rendered as if it ended at `now`.
    #[must_use]
    pub fn ongoing(current: &CurrentSession, now: DateTime<Local>) -> Self {
        Self {
            id: None,
            state: current.state,
            start_time: current.started_at.timestamp() * 1000,
            end_time: now.timestamp() * 1000,
            duration: current.elapsed_secs(now),
            content: None,
            work_type: 0,
            color: current.state.color_code(),
            is_ongoing: true,
        }
    }
}

/// Lists the day's intervals in start order, followed by the open session
/// when it started on `date`.
///
/// A failed query is logged; the open session is still reported.
pub fn daily_activities<S: IntervalStore>(
    store: &S,
    date: NaiveDate,
    current: Option<&CurrentSession>,
    now: DateTime<Local>,
) -> Vec<ActivityRecord> {
    let (start, end) = day_window(date);
    let rows = store
        .intervals_starting_between(start, end)
        .unwrap_or_else(|err| {
            tracing::warn!(%date, error = %err, "daily activities query failed");
            Vec::new()
        });

    let mut records: Vec<ActivityRecord> = rows.iter().map(ActivityRecord::from).collect();
    if let Some(current) = current.filter(|c| c.started_on(date)) {
        records.push(ActivityRecord::ongoing(current, now));
    }
    records
}
