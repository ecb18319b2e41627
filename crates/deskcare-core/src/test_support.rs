//! In-memory stores for exercising the ledger without SQLite.

use std::convert::Infallible;

use chrono::{DateTime, Local, TimeZone};
use thiserror::Error;

use crate::interval::{Interval, NewInterval};
use crate::state::{ActivityState, WorkType};
use crate::store::IntervalStore;

/// A `Vec`-backed store with the same filtering rules as the SQLite one.
#[derive(Debug, Default)]
pub struct VecStore {
    pub rows: Vec<Interval>,
}

impl VecStore {
    pub fn with_rows(rows: Vec<Interval>) -> Self {
        Self { rows }
    }

    fn sorted(mut rows: Vec<Interval>) -> Vec<Interval> {
        rows.sort_by_key(|row| (row.start_time, row.id));
        rows
    }
}

impl IntervalStore for VecStore {
    type Error = Infallible;

    fn insert_interval(&mut self, interval: &NewInterval) -> Result<i64, Self::Error> {
        let id = i64::try_from(self.rows.len()).unwrap_or(i64::MAX) + 1;
        self.rows.push(Interval {
            id,
            state: interval.state,
            start_time: interval.start_time,
            end_time: interval.end_time,
            duration: interval.duration,
            content: None,
            work_type: WorkType::Formal,
        });
        Ok(id)
    }

    fn intervals_starting_between(
        &self,
        start: i64,
        end: i64,
    ) -> Result<Vec<Interval>, Self::Error> {
        let rows = self
            .rows
            .iter()
            .filter(|row| (start..=end).contains(&row.start_time))
            .cloned()
            .collect();
        Ok(Self::sorted(rows))
    }

    fn annotated_focus_between(
        &self,
        start: i64,
        end: i64,
    ) -> Result<Vec<Interval>, Self::Error> {
        let rows = self
            .rows
            .iter()
            .filter(|row| row.state == ActivityState::Focus && row.content().is_some())
            .filter(|row| (start..=end).contains(&row.start_time))
            .cloned()
            .collect();
        Ok(Self::sorted(rows))
    }

    fn update_interval_content(
        &mut self,
        id: i64,
        content: &str,
        work_type: WorkType,
    ) -> Result<bool, Self::Error> {
        let Some(row) = self.rows.iter_mut().find(|row| row.id == id) else {
            return Ok(false);
        };
        row.content = Some(content.to_string());
        row.work_type = work_type;
        Ok(true)
    }
}

#[derive(Debug, Error)]
#[error("store is offline")]
pub struct StoreOffline;

/// A store whose every call fails.
#[derive(Debug, Default)]
pub struct FailingStore;

impl IntervalStore for FailingStore {
    type Error = StoreOffline;

    fn insert_interval(&mut self, _interval: &NewInterval) -> Result<i64, Self::Error> {
        Err(StoreOffline)
    }

    fn intervals_starting_between(
        &self,
        _start: i64,
        _end: i64,
    ) -> Result<Vec<Interval>, Self::Error> {
        Err(StoreOffline)
    }

    fn annotated_focus_between(
        &self,
        _start: i64,
        _end: i64,
    ) -> Result<Vec<Interval>, Self::Error> {
        Err(StoreOffline)
    }

    fn update_interval_content(
        &mut self,
        _id: i64,
        _content: &str,
        _work_type: WorkType,
    ) -> Result<bool, Self::Error> {
        Err(StoreOffline)
    }
}

/// Local time on 2025-01-29, a Wednesday.
pub fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(2025, 1, 29, h, m, s).unwrap()
}

/// A persisted row for the given state and local start time.
pub fn row(id: i64, state: ActivityState, start: DateTime<Local>, duration: i64) -> Interval {
    Interval {
        id,
        state,
        start_time: start.timestamp(),
        end_time: start.timestamp() + duration,
        duration,
        content: None,
        work_type: WorkType::Formal,
    }
}
