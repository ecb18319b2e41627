//! Local calendar boundaries expressed as epoch seconds.

use chrono::{DateTime, Datelike, Duration, Local, LocalResult, NaiveDate, NaiveTime, TimeZone};

/// First instant of a local calendar day.
///
/// Handles DST ambiguity by picking the earlier time.
#[must_use]
pub fn local_midnight(date: NaiveDate) -> DateTime<Local> {
    let midnight = date.and_time(NaiveTime::MIN);
    match Local.from_local_datetime(&midnight) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt,
        LocalResult::None => {
            // Spring-forward gap at midnight; 01:00 local exists.
            let one_am = midnight + Duration::hours(1);
            Local
                .from_local_datetime(&one_am)
                .earliest()
                .unwrap_or_else(|| Local.from_utc_datetime(&midnight))
        }
    }
}

/// Inclusive window `[first 00:00:00, last 23:59:59]` in epoch seconds.
#[must_use]
pub fn days_window(first: NaiveDate, last: NaiveDate) -> (i64, i64) {
    let start = local_midnight(first).timestamp();
    let end = last
        .succ_opt()
        .map_or(i64::MAX, |next| local_midnight(next).timestamp() - 1);
    (start, end)
}

/// Inclusive window covering a single local day.
#[must_use]
pub fn day_window(date: NaiveDate) -> (i64, i64) {
    days_window(date, date)
}

/// The most recent Monday on or before `date`.
#[must_use]
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let days_since_monday = date.weekday().num_days_from_monday();
    date - Duration::days(i64::from(days_since_monday))
}

/// The first day of `date`'s month.
#[must_use]
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}
