//! Closed intervals and the open session at the tail of the timeline.

use chrono::{DateTime, Local, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use crate::state::{ActivityState, WorkType};

/// A closed, persisted record of one contiguous state occupancy.
///
/// Times are whole seconds since the Unix epoch. Rows are immutable once
/// written except for `content` and `work_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    /// Auto-incremented primary key.
    pub id: i64,
    pub state: ActivityState,
    pub start_time: i64,
    pub end_time: i64,
    /// Length in seconds. Equals `end_time - start_time` for tracked sessions;
    /// manual exercise rows carry the reported duration verbatim.
    pub duration: i64,
    /// Free-text or structured notes attached after the fact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub work_type: WorkType,
}

impl Interval {
    /// Start time in the local timezone.
    #[must_use]
    pub fn start_local(&self) -> Option<DateTime<Local>> {
        Local.timestamp_opt(self.start_time, 0).single()
    }

    /// End time in the local timezone.
    #[must_use]
    pub fn end_local(&self) -> Option<DateTime<Local>> {
        Local.timestamp_opt(self.end_time, 0).single()
    }

    /// Returns the notes, treating an empty string as absent.
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.is_empty())
    }
}

/// An interval ready to be inserted. The store assigns the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewInterval {
    pub state: ActivityState,
    pub start_time: i64,
    pub end_time: i64,
    pub duration: i64,
}

impl NewInterval {
    /// Builds an interval spanning `[start, end]`.
    ///
    /// Returns `None` when `end` precedes `start`, compared at full precision.
    #[must_use]
    pub fn spanning(
        state: ActivityState,
        start: DateTime<Local>,
        end: DateTime<Local>,
    ) -> Option<Self> {
        if end < start {
            return None;
        }
        let start_time = start.timestamp();
        let end_time = end.timestamp();
        Some(Self {
            state,
            start_time,
            end_time,
            duration: end_time - start_time,
        })
    }
}

/// The open-ended, not yet persisted tail of the activity timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentSession {
    pub state: ActivityState,
    pub started_at: DateTime<Local>,
}

impl CurrentSession {
    #[must_use]
    pub const fn new(state: ActivityState, started_at: DateTime<Local>) -> Self {
        Self { state, started_at }
    }

    /// Whole seconds between the session start and `now`.
    #[must_use]
    pub fn elapsed_secs(&self, now: DateTime<Local>) -> i64 {
        now.timestamp() - self.started_at.timestamp()
    }

    /// Whether the session started on the given local calendar day.
    #[must_use]
    pub fn started_on(&self, date: NaiveDate) -> bool {
        self.started_at.date_naive() == date
    }
}
