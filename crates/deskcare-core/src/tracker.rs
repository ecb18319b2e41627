//! Session tracking: turns state transitions into persisted intervals.
//!
//! [`SessionTracker`] owns the single open [`CurrentSession`]. A transition
//! closes it (writing one row) and opens the next. Manual exercise reports are
//! reconciled against the open session so the exercise appears in the ledger
//! exactly once.
//!
//! The tracker is single-writer and not `Sync`. Store failures are logged and
//! never roll back the in-memory session bookkeeping.

use chrono::{DateTime, Duration, Local, NaiveDate};

use crate::interval::{CurrentSession, NewInterval};
use crate::report::{ReportMode, ReportRange, generate_report};
use crate::state::{ActivityState, WorkType};
use crate::stats::{DailyStats, FOCUS_SESSION_THRESHOLD_SECS, daily_stats};
use crate::store::IntervalStore;
use crate::timeline::{ActivityRecord, daily_activities};

/// Ledger settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Focus sessions longer than this count as meaningful focus blocks.
    pub focus_session_threshold_secs: i64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            focus_session_threshold_secs: FOCUS_SESSION_THRESHOLD_SECS,
        }
    }
}

/// Notifications describing completed ledger mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    /// The open session was closed. `id` is `None` if the write failed.
    SessionClosed {
        interval: NewInterval,
        id: Option<i64>,
    },
    /// The open session ended before it started and was dropped.
    SessionDiscarded {
        state: ActivityState,
        started_at: DateTime<Local>,
        ended_at: DateTime<Local>,
    },
    /// A new open session began.
    SessionStarted(CurrentSession),
    /// A manual exercise was spliced into the timeline as a Rest interval.
    ExerciseSpliced {
        interval: NewInterval,
        id: Option<i64>,
    },
}

/// Tracks the open session and writes closed sessions to the store.
///
/// A `None` store means the store failed to open: every operation then
/// becomes a no-op returning an empty result.
#[derive(Debug)]
pub struct SessionTracker<S> {
    store: Option<S>,
    current: CurrentSession,
    config: LedgerConfig,
    events: Vec<LedgerEvent>,
}

impl<S: IntervalStore> SessionTracker<S> {
    /// Starts tracking in `initial` as of now.
    pub fn new(store: Option<S>, initial: ActivityState) -> Self {
        Self::new_at(store, initial, Local::now())
    }

    /// Starts tracking in `initial` as of `now`.
    pub fn new_at(store: Option<S>, initial: ActivityState, now: DateTime<Local>) -> Self {
        if store.is_none() {
            tracing::warn!("activity store unavailable, sessions will not be recorded");
        }
        Self {
            store,
            current: CurrentSession::new(initial, now),
            config: LedgerConfig::default(),
            events: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: LedgerConfig) -> Self {
        self.config = config;
        self
    }

    /// The open session.
    pub const fn current(&self) -> &CurrentSession {
        &self.current
    }

    /// The backing store, if it opened.
    pub const fn store(&self) -> Option<&S> {
        self.store.as_ref()
    }

    /// Drains queued notifications in the order they occurred.
    pub fn take_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn on_state_changed(&mut self, new_state: ActivityState) {
        self.on_state_changed_at(new_state, Local::now());
    }

    /// Closes the open session and opens one in `new_state`.
    ///
    /// A no-op when `new_state` is already the current state.
    pub fn on_state_changed_at(&mut self, new_state: ActivityState, now: DateTime<Local>) {
        if new_state == self.current.state {
            return;
        }
        self.close_current_session_at(now);
        self.start_new_session_at(new_state, now);
    }

    pub fn close_current_session(&mut self) {
        self.close_current_session_at(Local::now());
    }

    /// Persists the open session as ending at `end`.
    ///
    /// Sessions ending before they started are dropped without a write. The
    /// open session itself is left in place; callers follow up with
    /// [`Self::start_new_session_at`].
    pub fn close_current_session_at(&mut self, end: DateTime<Local>) {
        let Some(store) = self.store.as_mut() else {
            return;
        };
        let CurrentSession { state, started_at } = self.current;

        let Some(interval) = NewInterval::spanning(state, started_at, end) else {
            tracing::debug!(%state, %started_at, %end, "ignoring session that ends before it starts");
            self.events.push(LedgerEvent::SessionDiscarded {
                state,
                started_at,
                ended_at: end,
            });
            return;
        };

        let id = match store.insert_interval(&interval) {
            Ok(id) => {
                tracing::debug!(id, %state, duration = interval.duration, "logged session");
                Some(id)
            }
            Err(err) => {
                tracing::warn!(%state, error = %err, "failed to log session");
                None
            }
        };
        self.events.push(LedgerEvent::SessionClosed { interval, id });
    }

    /// Opens a new session in `state` starting at `now`.
    pub fn start_new_session_at(&mut self, state: ActivityState, now: DateTime<Local>) {
        self.current = CurrentSession::new(state, now);
        self.events.push(LedgerEvent::SessionStarted(self.current));
    }

    pub fn on_manual_exercise_recorded(&mut self, duration_secs: i64) {
        self.on_manual_exercise_recorded_at(duration_secs, Local::now());
    }

    /// Records an exercise of `duration_secs` that just finished at `now`.
    ///
    /// While resting, the exercise is already covered by the open Rest
    /// session and nothing is written. Otherwise the open session is cut short
    /// at the exercise start (never before the session's own start), a Rest
    /// interval `[now - duration, now]` is inserted with the reported duration,
    /// and the interrupted state resumes at `now`.
    pub fn on_manual_exercise_recorded_at(&mut self, duration_secs: i64, now: DateTime<Local>) {
        if self.store.is_none() || duration_secs <= 0 {
            return;
        }
        if self.current.state == ActivityState::Rest {
            tracing::debug!(
                duration_secs,
                "exercise recorded while resting, the open session covers it"
            );
            return;
        }

        let Some(exercise_start) = Duration::try_seconds(duration_secs)
            .and_then(|duration| now.checked_sub_signed(duration))
        else {
            tracing::warn!(duration_secs, "ignoring exercise reaching outside the representable time range");
            return;
        };

        let resume_state = self.current.state;
        let split_at = exercise_start.max(self.current.started_at);

        self.close_current_session_at(split_at);

        let interval = NewInterval {
            state: ActivityState::Rest,
            start_time: exercise_start.timestamp(),
            end_time: now.timestamp(),
            duration: duration_secs,
        };
        let id = self
            .store
            .as_mut()
            .and_then(|store| match store.insert_interval(&interval) {
                Ok(id) => {
                    tracing::info!(id, duration_secs, interrupted = %resume_state, "spliced manual exercise");
                    Some(id)
                }
                Err(err) => {
                    tracing::warn!(duration_secs, error = %err, "failed to insert manual exercise");
                    None
                }
            });
        self.events
            .push(LedgerEvent::ExerciseSpliced { interval, id });

        self.start_new_session_at(resume_state, now);
    }

    pub fn daily_activities(&self, date: NaiveDate) -> Vec<ActivityRecord> {
        self.daily_activities_at(date, Local::now())
    }

    /// The day's intervals plus the open session when it started on `date`.
    pub fn daily_activities_at(&self, date: NaiveDate, now: DateTime<Local>) -> Vec<ActivityRecord> {
        match &self.store {
            Some(store) => daily_activities(store, date, Some(&self.current), now),
            None => Vec::new(),
        }
    }

    pub fn daily_stats(&self, date: NaiveDate) -> DailyStats {
        self.daily_stats_at(date, Local::now())
    }

    /// Statistics for `date`, counting the open session as if it ended at `now`.
    pub fn daily_stats_at(&self, date: NaiveDate, now: DateTime<Local>) -> DailyStats {
        let threshold = self.config.focus_session_threshold_secs;
        match &self.store {
            Some(store) => daily_stats(store, date, Some(&self.current), now, threshold),
            None => DailyStats::new(date, threshold),
        }
    }

    /// Replaces the notes of one interval. Returns whether a row was updated.
    pub fn update_activity_content(&mut self, id: i64, content: &str, work_type: WorkType) -> bool {
        let Some(store) = self.store.as_mut() else {
            return false;
        };
        match store.update_interval_content(id, content, work_type) {
            Ok(updated) => {
                tracing::debug!(id, updated, "updated activity content");
                updated
            }
            Err(err) => {
                tracing::warn!(id, error = %err, "failed to update activity content");
                false
            }
        }
    }

    /// Renders the work report for the range ending on `date`.
    pub fn generate_report(&self, date: NaiveDate, range: ReportRange, mode: ReportMode) -> String {
        match &self.store {
            Some(store) => generate_report(store, date, range, mode),
            None => "Error: Database not initialized.".to_string(),
        }
    }

    pub fn finish(self) -> Option<S> {
        self.finish_at(Local::now())
    }

    /// Closes the open session and hands back the store.
    pub fn finish_at(mut self, now: DateTime<Local>) -> Option<S> {
        self.close_current_session_at(now);
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::interval::Interval;
    use crate::test_support::{FailingStore, VecStore, at};

    fn tracker_at(state: ActivityState, now: DateTime<Local>) -> SessionTracker<VecStore> {
        SessionTracker::new_at(Some(VecStore::default()), state, now)
    }

    fn rows(tracker: &SessionTracker<VecStore>) -> &[Interval] {
        &tracker.store().unwrap().rows
    }

    fn t0() -> DateTime<Local> {
        at(9, 0, 0)
    }

    fn secs(n: i64) -> Duration {
        Duration::seconds(n)
    }

    #[test]
    fn state_change_persists_closed_session() {
        let mut tracker = tracker_at(ActivityState::Focus, t0());

        tracker.on_state_changed_at(ActivityState::Rest, t0() + secs(1500));

        let rows = rows(&tracker);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].state, ActivityState::Focus);
        assert_eq!(rows[0].start_time, t0().timestamp());
        assert_eq!(rows[0].end_time, t0().timestamp() + 1500);
        assert_eq!(rows[0].duration, 1500);
        assert_eq!(
            *tracker.current(),
            CurrentSession::new(ActivityState::Rest, t0() + secs(1500))
        );
    }

    #[test]
    fn same_state_is_a_no_op() {
        let mut tracker = tracker_at(ActivityState::Focus, t0());
        tracker.take_events();

        tracker.on_state_changed_at(ActivityState::Focus, t0() + secs(60));

        assert!(rows(&tracker).is_empty());
        assert_eq!(tracker.current().started_at, t0());
        assert!(tracker.take_events().is_empty());
    }

    #[test]
    fn zero_length_session_is_persisted() {
        let mut tracker = tracker_at(ActivityState::Ready, t0());
        tracker.close_current_session_at(t0());
        assert_eq!(rows(&tracker).len(), 1);
        assert_eq!(rows(&tracker)[0].duration, 0);
    }

    #[test]
    fn session_ending_before_start_is_discarded() {
        let mut tracker = tracker_at(ActivityState::Ready, t0());
        tracker.close_current_session_at(t0() - secs(1));
        assert!(rows(&tracker).is_empty());
        assert!(matches!(
            tracker.take_events().as_slice(),
            [LedgerEvent::SessionDiscarded { .. }]
        ));
    }

    #[test]
    fn transitions_cover_elapsed_time_without_gaps() {
        let start = t0();
        let mut tracker = tracker_at(ActivityState::Offline, start);
        let steps = [
            (ActivityState::Focus, 10),
            (ActivityState::Pause, 1500),
            (ActivityState::Focus, 1620),
            (ActivityState::Rest, 4320),
            (ActivityState::Nap, 4620),
            (ActivityState::Focus, 6420),
        ];
        for (state, offset) in steps {
            tracker.on_state_changed_at(state, start + secs(offset));
        }
        let now = start + secs(7000);

        let rows = rows(&tracker);
        let persisted: i64 = rows.iter().map(|r| r.duration).sum();
        assert_eq!(persisted + tracker.current().elapsed_secs(now), 7000);
        for pair in rows.windows(2) {
            assert_eq!(pair[0].end_time, pair[1].start_time);
        }
    }

    #[test]
    fn exercise_while_paused_splices_rest_interval() {
        let mut tracker = tracker_at(ActivityState::Pause, t0());
        let now = t0() + secs(300);

        tracker.on_manual_exercise_recorded_at(300, now);

        let rows = rows(&tracker);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].state, ActivityState::Pause);
        assert_eq!(rows[0].start_time, t0().timestamp());
        assert_eq!(rows[0].end_time, t0().timestamp());
        assert_eq!(rows[0].duration, 0);
        assert_eq!(rows[1].state, ActivityState::Rest);
        assert_eq!(rows[1].start_time, t0().timestamp());
        assert_eq!(rows[1].end_time, now.timestamp());
        assert_eq!(rows[1].duration, 300);
        assert_eq!(
            *tracker.current(),
            CurrentSession::new(ActivityState::Pause, now)
        );
    }

    #[test]
    fn exercise_while_resting_writes_nothing() {
        let mut tracker = tracker_at(ActivityState::Rest, t0());

        tracker.on_manual_exercise_recorded_at(200, t0() + secs(200));

        assert!(rows(&tracker).is_empty());
        assert_eq!(
            *tracker.current(),
            CurrentSession::new(ActivityState::Rest, t0())
        );
    }

    #[test]
    fn exercise_inside_long_session_cuts_it_at_exercise_start() {
        let mut tracker = tracker_at(ActivityState::Focus, t0());
        let now = t0() + secs(3600);

        tracker.on_manual_exercise_recorded_at(600, now);

        let rows = rows(&tracker);
        assert_eq!(rows[0].state, ActivityState::Focus);
        assert_eq!(rows[0].duration, 3000);
        assert_eq!(rows[0].end_time, rows[1].start_time);
        assert_eq!(rows[1].duration, 600);
        assert_eq!(tracker.current().state, ActivityState::Focus);
    }

    #[test]
    fn exercise_overlap_is_bounded_to_the_spliced_interval() {
        let mut tracker = tracker_at(ActivityState::Focus, t0());
        tracker.on_state_changed_at(ActivityState::Pause, t0() + secs(1000));
        // Exercise reaches back before the Pause session started.
        tracker.on_manual_exercise_recorded_at(900, t0() + secs(1300));
        tracker.on_state_changed_at(ActivityState::Focus, t0() + secs(1500));
        let now = t0() + secs(2000);

        let rows = rows(&tracker).to_vec();
        let rest = rows
            .iter()
            .find(|r| r.state == ActivityState::Rest)
            .unwrap();
        let others: Vec<&Interval> = rows
            .iter()
            .filter(|r| r.state != ActivityState::Rest)
            .collect();

        // The Rest interval only overlaps the Focus session it reaches back into.
        let overlap: i64 = others
            .iter()
            .map(|r| (r.end_time.min(rest.end_time) - r.start_time.max(rest.start_time)).max(0))
            .sum();
        assert_eq!(overlap, 600);
        assert!(overlap <= rest.duration);

        // Rows plus the open session cover the elapsed time exactly once.
        let tracked: i64 = others.iter().map(|r| r.duration).sum();
        let covered = tracked + rest.duration - overlap + tracker.current().elapsed_secs(now);
        assert_eq!(covered, 2000);
    }

    #[test]
    fn out_of_range_exercise_is_ignored() {
        let mut tracker = tracker_at(ActivityState::Pause, t0());
        tracker.take_events();

        tracker.on_manual_exercise_recorded_at(10_000_000_000_000, t0() + secs(300));
        tracker.on_manual_exercise_recorded_at(i64::MAX, t0() + secs(300));

        assert!(rows(&tracker).is_empty());
        assert!(tracker.take_events().is_empty());
        assert_eq!(
            *tracker.current(),
            CurrentSession::new(ActivityState::Pause, t0())
        );

        // The session is still closed normally afterwards.
        let store = tracker.finish_at(t0() + secs(400)).unwrap();
        assert_eq!(store.rows.len(), 1);
        assert_eq!(store.rows[0].duration, 400);
    }

    #[test]
    fn sub_second_reversal_is_discarded() {
        let start = t0() + Duration::milliseconds(900);
        let mut tracker = tracker_at(ActivityState::Focus, start);

        tracker.close_current_session_at(t0() + Duration::milliseconds(100));

        assert!(rows(&tracker).is_empty());
        assert!(matches!(
            tracker.take_events().as_slice(),
            [LedgerEvent::SessionDiscarded { .. }]
        ));
    }

    #[test]
    fn non_positive_exercise_is_ignored() {
        let mut tracker = tracker_at(ActivityState::Pause, t0());
        tracker.on_manual_exercise_recorded_at(0, t0() + secs(10));
        tracker.on_manual_exercise_recorded_at(-30, t0() + secs(10));
        assert!(rows(&tracker).is_empty());
        assert_eq!(tracker.current().started_at, t0());
    }

    #[test]
    fn events_are_queued_after_mutation() {
        let mut tracker = tracker_at(ActivityState::Pause, t0());
        tracker.take_events();

        tracker.on_manual_exercise_recorded_at(60, t0() + secs(120));

        let events = tracker.take_events();
        assert_eq!(events.len(), 3);
        assert!(matches!(
            events[0],
            LedgerEvent::SessionClosed { id: Some(1), .. }
        ));
        assert!(matches!(
            events[1],
            LedgerEvent::ExerciseSpliced { id: Some(2), .. }
        ));
        assert_eq!(
            events[2],
            LedgerEvent::SessionStarted(CurrentSession::new(
                ActivityState::Pause,
                t0() + secs(120)
            ))
        );
    }

    #[test]
    fn daily_stats_include_open_session() {
        let mut tracker = tracker_at(ActivityState::Focus, t0());
        tracker.on_state_changed_at(ActivityState::Rest, t0() + secs(2000));
        tracker.on_state_changed_at(ActivityState::Focus, t0() + secs(2300));

        let stats = tracker.daily_stats_at(t0().date_naive(), t0() + secs(2400));

        let focus = stats.totals(ActivityState::Focus);
        assert_eq!(focus.total_seconds, 2100);
        assert_eq!(focus.max_seconds, 2000);
        assert_eq!(stats.focus_session_count, 1);
        assert_eq!(stats.totals(ActivityState::Rest).total_seconds, 300);
    }

    #[test]
    fn custom_threshold_flows_into_stats() {
        let mut tracker = tracker_at(ActivityState::Focus, t0()).with_config(LedgerConfig {
            focus_session_threshold_secs: 60,
        });
        tracker.on_state_changed_at(ActivityState::Rest, t0() + secs(120));
        let stats = tracker.daily_stats_at(t0().date_naive(), t0() + secs(130));
        assert_eq!(stats.focus_session_count, 1);
    }

    #[test]
    fn update_activity_content_is_idempotent() {
        let mut tracker = tracker_at(ActivityState::Focus, t0());
        tracker.on_state_changed_at(ActivityState::Rest, t0() + secs(60));

        assert!(tracker.update_activity_content(1, "notes", WorkType::Learning));
        let first = rows(&tracker).to_vec();
        assert!(tracker.update_activity_content(1, "notes", WorkType::Learning));
        assert_eq!(rows(&tracker), first.as_slice());
        assert_eq!(first[0].work_type, WorkType::Learning);

        assert!(!tracker.update_activity_content(99, "notes", WorkType::Formal));
    }

    #[test]
    fn activities_include_ongoing_record() {
        let mut tracker = tracker_at(ActivityState::Focus, t0());
        tracker.on_state_changed_at(ActivityState::Pause, t0() + secs(60));

        let records = tracker.daily_activities_at(t0().date_naive(), t0() + secs(90));

        assert_eq!(records.len(), 2);
        assert!(!records[0].is_ongoing);
        assert!(records[1].is_ongoing);
        assert_eq!(records[1].duration, 30);
    }

    #[test]
    fn report_through_tracker() {
        let mut tracker = tracker_at(ActivityState::Focus, t0());
        tracker.on_state_changed_at(ActivityState::Rest, t0() + secs(3000));
        tracker.update_activity_content(
            1,
            r#"{"formal":"Shipped X","learning":"Read Y"}"#,
            WorkType::Formal,
        );

        let report =
            tracker.generate_report(t0().date_naive(), ReportRange::Day, ReportMode::Formal);

        assert!(report.contains("• [01-29 09:00-09:50] (50m) Shipped X"));
        assert!(!report.contains("Read Y"));
    }

    #[test]
    fn unavailable_store_makes_everything_a_no_op() {
        let mut tracker: SessionTracker<VecStore> =
            SessionTracker::new_at(None, ActivityState::Pause, t0());

        tracker.on_manual_exercise_recorded_at(120, t0() + secs(300));
        assert_eq!(tracker.current().started_at, t0());

        tracker.on_state_changed_at(ActivityState::Focus, t0() + secs(400));
        assert_eq!(
            *tracker.current(),
            CurrentSession::new(ActivityState::Focus, t0() + secs(400))
        );

        assert!(tracker.daily_activities_at(t0().date_naive(), t0() + secs(500)).is_empty());
        assert_eq!(
            tracker.daily_stats_at(t0().date_naive(), t0() + secs(500)),
            DailyStats::new(t0().date_naive(), FOCUS_SESSION_THRESHOLD_SECS)
        );
        assert!(!tracker.update_activity_content(1, "x", WorkType::Formal));
        assert_eq!(
            tracker.generate_report(t0().date_naive(), ReportRange::Day, ReportMode::SelfReview),
            "Error: Database not initialized."
        );
    }

    #[test]
    fn write_failures_do_not_disturb_session_bookkeeping() {
        let mut tracker = SessionTracker::new_at(Some(FailingStore), ActivityState::Pause, t0());

        tracker.on_manual_exercise_recorded_at(60, t0() + secs(120));
        assert_eq!(
            *tracker.current(),
            CurrentSession::new(ActivityState::Pause, t0() + secs(120))
        );

        tracker.on_state_changed_at(ActivityState::Focus, t0() + secs(200));
        assert_eq!(tracker.current().state, ActivityState::Focus);

        let events = tracker.take_events();
        assert!(events.iter().all(|event| !matches!(
            event,
            LedgerEvent::SessionClosed { id: Some(_), .. }
                | LedgerEvent::ExerciseSpliced { id: Some(_), .. }
        )));
        assert!(!tracker.update_activity_content(1, "x", WorkType::Formal));
    }

    #[test]
    fn finish_closes_the_open_session() {
        let tracker = tracker_at(ActivityState::Focus, t0());
        let store = tracker.finish_at(t0() + secs(45)).unwrap();
        assert_eq!(store.rows.len(), 1);
        assert_eq!(store.rows[0].duration, 45);
    }
}
