//! The persistence seam between the tracker and a concrete database.

use crate::interval::{Interval, NewInterval};
use crate::state::WorkType;

/// Append-only interval persistence plus point updates of annotation fields.
///
/// Time arguments are whole seconds since the Unix epoch. Range queries filter
/// on the interval's start time only, with both bounds inclusive: a session
/// that begins before `start` is excluded even if it ends inside the window,
/// and one that begins inside the window is returned in full.
pub trait IntervalStore {
    /// The error type returned by the backing store.
    type Error: std::error::Error + 'static;

    /// Writes a new row and returns its id.
    fn insert_interval(&mut self, interval: &NewInterval) -> Result<i64, Self::Error>;

    /// Lists rows whose start time lies in `[start, end]`, oldest first.
    fn intervals_starting_between(
        &self,
        start: i64,
        end: i64,
    ) -> Result<Vec<Interval>, Self::Error>;

    /// Lists Focus rows with non-empty content whose start time lies in
    /// `[start, end]`, oldest first.
    fn annotated_focus_between(
        &self,
        start: i64,
        end: i64,
    ) -> Result<Vec<Interval>, Self::Error>;

    /// Replaces the notes and work type of one row.
    ///
    /// Returns `false` when no row has the given id.
    fn update_interval_content(
        &mut self,
        id: i64,
        content: &str,
        work_type: WorkType,
    ) -> Result<bool, Self::Error>;
}
