//! Per-day aggregation of persisted intervals plus the in-progress session.

use std::collections::BTreeMap;

use chrono::{DateTime, Local, NaiveDate};
use serde::Serialize;

use crate::calendar::day_window;
use crate::interval::{CurrentSession, Interval};
use crate::state::ActivityState;
use crate::store::IntervalStore;

/// Focus blocks longer than this count towards `focus_session_count`.
pub const FOCUS_SESSION_THRESHOLD_SECS: i64 = 30 * 60;

/// Running totals for one state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StateTotals {
    pub total_seconds: i64,
    pub count: u32,
    /// Longest single session. Zero-length sessions never set it.
    pub max_seconds: i64,
    /// Start of the longest session, epoch seconds.
    pub max_start: Option<i64>,
}

impl StateTotals {
    fn record(&mut self, duration: i64, start_time: i64) {
        self.total_seconds += duration;
        self.count += 1;
        if duration > self.max_seconds {
            self.max_seconds = duration;
            self.max_start = Some(start_time);
        }
    }
}

/// Derived statistics for one local calendar day. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyStats {
    pub date: NaiveDate,
    totals: BTreeMap<ActivityState, StateTotals>,
    /// Focus sessions longer than the configured threshold.
    pub focus_session_count: u32,
    threshold_secs: i64,
}

impl DailyStats {
    /// Creates empty statistics for `date`.
    #[must_use]
    pub fn new(date: NaiveDate, threshold_secs: i64) -> Self {
        Self {
            date,
            totals: BTreeMap::new(),
            focus_session_count: 0,
            threshold_secs,
        }
    }

    /// Folds persisted rows and, when it started on `date`, the open session.
    #[must_use]
    pub fn from_parts(
        date: NaiveDate,
        rows: &[Interval],
        current: Option<&CurrentSession>,
        now: DateTime<Local>,
        threshold_secs: i64,
    ) -> Self {
        let mut stats = Self::new(date, threshold_secs);
        for row in rows {
            stats.record(row.state, row.duration, row.start_time);
        }
        if let Some(current) = current.filter(|c| c.started_on(date)) {
            stats.record(
                current.state,
                current.elapsed_secs(now).max(0),
                current.started_at.timestamp(),
            );
        }
        stats
    }

    /// Adds one session's duration to its state's accumulators.
    pub fn record(&mut self, state: ActivityState, duration: i64, start_time: i64) {
        self.totals
            .entry(state)
            .or_default()
            .record(duration, start_time);
        if state == ActivityState::Focus && duration > self.threshold_secs {
            self.focus_session_count += 1;
        }
    }

    /// Totals for one state (all zero when nothing was recorded).
    #[must_use]
    pub fn totals(&self, state: ActivityState) -> StateTotals {
        self.totals.get(&state).copied().unwrap_or_default()
    }

    /// Flattens the statistics into named values for UI binding.
    ///
    /// Keys per state `S`: `SDuration`, `SCount`, `totalSSeconds`,
    /// `maxSSeconds` and `maxSStart` (milliseconds since the epoch, 0 when
    /// there is no session), plus `focusSessionCount`.
    #[must_use]
    pub fn to_flat_map(&self) -> BTreeMap<String, i64> {
        let mut map = BTreeMap::new();
        for state in ActivityState::ALL {
            let totals = self.totals(state);
            map.insert(format!("{state}Duration"), totals.total_seconds);
            map.insert(format!("{state}Count"), i64::from(totals.count));
            map.insert(format!("total{state}Seconds"), totals.total_seconds);
            map.insert(format!("max{state}Seconds"), totals.max_seconds);
            map.insert(
                format!("max{state}Start"),
                totals.max_start.map_or(0, |start| start * 1000),
            );
        }
        map.insert(
            "focusSessionCount".to_string(),
            i64::from(self.focus_session_count),
        );
        map
    }
}

/// Computes the statistics for `date` from the store and the open session.
///
/// A failed query is logged and treated as a day without persisted rows.
pub fn daily_stats<S: IntervalStore>(
    store: &S,
    date: NaiveDate,
    current: Option<&CurrentSession>,
    now: DateTime<Local>,
    threshold_secs: i64,
) -> DailyStats {
    let (start, end) = day_window(date);
    let rows = store
        .intervals_starting_between(start, end)
        .unwrap_or_else(|err| {
            tracing::warn!(%date, error = %err, "daily stats query failed");
            Vec::new()
        });
    DailyStats::from_parts(date, &rows, current, now, threshold_secs)
}
