//! Countdown timer that decides which activity state the user is in.
//!
//! The engine is a plain state machine driven by [`TimerEngine::tick`] once
//! per [`TICK_INTERVAL`]. It never calls out: every notification is queued and
//! handed over by [`TimerEngine::take_events`] after the call that produced it
//! has finished mutating the engine.

use std::time::Duration;

use chrono::{DateTime, Local};

use crate::state::ActivityState;

/// Granularity of the countdown.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Default work block length.
pub const DEFAULT_WORK_DURATION_SECS: i64 = 45 * 60;

/// Length of the extra work block granted by snoozing a reminder.
pub const SNOOZE_DURATION_SECS: i64 = 5 * 60;

/// Timer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerConfig {
    pub work_duration_secs: i64,
    pub snooze_secs: i64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            work_duration_secs: DEFAULT_WORK_DURATION_SECS,
            snooze_secs: SNOOZE_DURATION_SECS,
        }
    }
}

/// Notifications emitted by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// The activity state changed. Emitted once per transition.
    StateChanged(ActivityState),
    /// The work countdown reached zero.
    ReminderTriggered,
    /// A break ended when work resumed.
    BreakFinished { duration_secs: i64 },
    /// The user reported finishing an exercise.
    ExerciseRecorded { duration_secs: i64 },
}

#[derive(Debug, Clone)]
pub struct TimerEngine {
    config: TimerConfig,
    state: ActivityState,
    running: bool,
    remaining_secs: i64,
    session_total_secs: i64,
    break_started_at: Option<DateTime<Local>>,
    events: Vec<TimerEvent>,
}

impl TimerEngine {
    /// Creates a stopped engine in the `Ready` state.
    #[must_use]
    pub fn new(config: TimerConfig) -> Self {
        Self {
            config,
            state: ActivityState::Ready,
            running: false,
            remaining_secs: config.work_duration_secs,
            session_total_secs: config.work_duration_secs,
            break_started_at: None,
            events: Vec::new(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> ActivityState {
        self.state
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub const fn remaining_secs(&self) -> i64 {
        self.remaining_secs
    }

    /// Length of the block currently counting down.
    #[must_use]
    pub const fn session_total_secs(&self) -> i64 {
        self.session_total_secs
    }

    #[must_use]
    pub const fn work_duration_minutes(&self) -> i64 {
        self.config.work_duration_secs / 60
    }

    /// Changes the work block length. Takes effect at the next work block.
    pub fn set_work_duration_minutes(&mut self, minutes: i64) {
        self.config.work_duration_secs = minutes.max(1) * 60;
    }

    /// `HH:MM` at which the current countdown ends, or `--:--` when paused.
    #[must_use]
    pub fn estimated_finish(&self, now: DateTime<Local>) -> String {
        if self.state == ActivityState::Pause {
            return "--:--".to_string();
        }
        (now + chrono::Duration::seconds(self.remaining_secs))
            .format("%H:%M")
            .to_string()
    }

    /// Starts a fresh work block, closing any break in progress.
    pub fn start_work(&mut self, now: DateTime<Local>) {
        if let Some(started) = self.break_started_at.take() {
            let duration_secs = (now - started).num_seconds().max(0);
            self.events.push(TimerEvent::BreakFinished { duration_secs });
        }
        self.begin_countdown(self.config.work_duration_secs);
    }

    /// Postpones the break with a short work block.
    pub fn snooze(&mut self) {
        self.begin_countdown(self.config.snooze_secs);
    }

    /// Pauses a running countdown, resumes a paused one, and otherwise starts
    /// a new work block.
    pub fn toggle_pause(&mut self, now: DateTime<Local>) {
        if self.running {
            self.stop(ActivityState::Pause);
        } else if self.state == ActivityState::Pause {
            self.running = true;
            self.set_state(ActivityState::Focus);
        } else {
            self.start_work(now);
        }
    }

    /// Starts a break immediately.
    pub fn rest(&mut self, now: DateTime<Local>) {
        self.stop(ActivityState::Rest);
        self.break_started_at.get_or_insert(now);
    }

    pub fn nap(&mut self) {
        self.stop(ActivityState::Nap);
    }

    pub fn go_offline(&mut self) {
        self.stop(ActivityState::Offline);
    }

    /// Stops the countdown without starting anything else.
    pub fn reset(&mut self) {
        self.remaining_secs = self.config.work_duration_secs;
        self.session_total_secs = self.config.work_duration_secs;
        self.stop(ActivityState::Ready);
    }

    /// Reports a completed exercise. Non-positive durations are ignored.
    pub fn record_exercise(&mut self, duration_secs: i64) {
        if duration_secs > 0 {
            self.events
                .push(TimerEvent::ExerciseRecorded { duration_secs });
        }
    }

    /// Advances the countdown by one tick.
    pub fn tick(&mut self, now: DateTime<Local>) {
        if !self.running {
            return;
        }
        if self.remaining_secs > 0 {
            self.remaining_secs -= 1;
            return;
        }
        self.stop(ActivityState::Rest);
        self.break_started_at = Some(now);
        self.events.push(TimerEvent::ReminderTriggered);
    }

    /// Drains queued notifications in emission order.
    pub fn take_events(&mut self) -> Vec<TimerEvent> {
        std::mem::take(&mut self.events)
    }

    fn begin_countdown(&mut self, secs: i64) {
        self.remaining_secs = secs;
        self.session_total_secs = secs;
        self.running = true;
        self.set_state(ActivityState::Focus);
    }

    fn stop(&mut self, state: ActivityState) {
        self.running = false;
        self.set_state(state);
    }

    fn set_state(&mut self, state: ActivityState) {
        if self.state != state {
            self.state = state;
            self.events.push(TimerEvent::StateChanged(state));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 1, 29, h, m, s).unwrap()
    }

    fn short_timer() -> TimerEngine {
        TimerEngine::new(TimerConfig {
            work_duration_secs: 3,
            snooze_secs: 2,
        })
    }

    #[test]
    fn starts_ready_and_stopped() {
        let engine = TimerEngine::new(TimerConfig::default());
        assert_eq!(engine.state(), ActivityState::Ready);
        assert!(!engine.is_running());
        assert_eq!(engine.remaining_secs(), 45 * 60);
        assert_eq!(engine.work_duration_minutes(), 45);
    }

    #[test]
    fn countdown_triggers_reminder_after_reaching_zero() {
        let mut engine = short_timer();
        engine.start_work(at(9, 0, 0));
        assert_eq!(
            engine.take_events(),
            vec![TimerEvent::StateChanged(ActivityState::Focus)]
        );

        for s in 1..=3 {
            engine.tick(at(9, 0, s));
        }
        assert_eq!(engine.remaining_secs(), 0);
        assert!(engine.take_events().is_empty());

        engine.tick(at(9, 0, 4));
        assert_eq!(engine.state(), ActivityState::Rest);
        assert!(!engine.is_running());
        assert_eq!(
            engine.take_events(),
            vec![
                TimerEvent::StateChanged(ActivityState::Rest),
                TimerEvent::ReminderTriggered,
            ]
        );
    }

    #[test]
    fn resuming_work_reports_break_length() {
        let mut engine = short_timer();
        engine.start_work(at(9, 0, 0));
        for s in 1..=4 {
            engine.tick(at(9, 0, s));
        }
        engine.take_events();

        engine.start_work(at(9, 5, 4));
        assert_eq!(
            engine.take_events(),
            vec![
                TimerEvent::BreakFinished { duration_secs: 300 },
                TimerEvent::StateChanged(ActivityState::Focus),
            ]
        );
        assert_eq!(engine.remaining_secs(), 3);
    }

    #[test]
    fn toggle_pause_stops_and_resumes_keeping_remaining() {
        let mut engine = short_timer();
        engine.start_work(at(9, 0, 0));
        engine.tick(at(9, 0, 1));
        engine.toggle_pause(at(9, 0, 2));
        assert_eq!(engine.state(), ActivityState::Pause);
        assert_eq!(engine.estimated_finish(at(9, 0, 2)), "--:--");

        engine.tick(at(9, 0, 3));
        assert_eq!(engine.remaining_secs(), 2);

        engine.toggle_pause(at(9, 0, 4));
        assert_eq!(engine.state(), ActivityState::Focus);
        assert!(engine.is_running());
        assert_eq!(engine.remaining_secs(), 2);
        assert_eq!(
            engine.take_events(),
            vec![
                TimerEvent::StateChanged(ActivityState::Focus),
                TimerEvent::StateChanged(ActivityState::Pause),
                TimerEvent::StateChanged(ActivityState::Focus),
            ]
        );
    }

    #[test]
    fn toggle_from_ready_starts_work() {
        let mut engine = short_timer();
        engine.toggle_pause(at(9, 0, 0));
        assert_eq!(engine.state(), ActivityState::Focus);
        assert_eq!(engine.remaining_secs(), 3);
    }

    #[test]
    fn snooze_keeps_focus_without_duplicate_state_event() {
        let mut engine = short_timer();
        engine.start_work(at(9, 0, 0));
        engine.take_events();

        engine.snooze();
        assert_eq!(engine.remaining_secs(), 2);
        assert_eq!(engine.session_total_secs(), 2);
        assert!(engine.take_events().is_empty());
    }

    #[test]
    fn exercise_events_require_positive_duration() {
        let mut engine = short_timer();
        engine.record_exercise(0);
        engine.record_exercise(-5);
        engine.record_exercise(120);
        assert_eq!(
            engine.take_events(),
            vec![TimerEvent::ExerciseRecorded { duration_secs: 120 }]
        );
    }

    #[test]
    fn work_duration_is_clamped_and_applies_next_block() {
        let mut engine = short_timer();
        engine.start_work(at(9, 0, 0));
        engine.set_work_duration_minutes(0);
        assert_eq!(engine.remaining_secs(), 3);
        engine.start_work(at(9, 0, 1));
        assert_eq!(engine.remaining_secs(), 60);
    }

    #[test]
    fn estimated_finish_adds_remaining() {
        let mut engine = TimerEngine::new(TimerConfig::default());
        engine.start_work(at(9, 0, 0));
        assert_eq!(engine.estimated_finish(at(9, 0, 0)), "09:45");
    }

    #[test]
    fn manual_rest_then_work_reports_break() {
        let mut engine = short_timer();
        engine.start_work(at(9, 0, 0));
        engine.rest(at(9, 10, 0));
        engine.nap();
        engine.start_work(at(9, 40, 0));
        let events = engine.take_events();
        assert!(events.contains(&TimerEvent::BreakFinished { duration_secs: 1800 }));
        assert_eq!(engine.state(), ActivityState::Focus);
    }
}
