//! Run command: the break timer wired to the activity ledger.
//!
//! All timer and ledger work happens on the calling thread. A helper thread
//! only forwards stdin lines through a channel, so ticks and commands are
//! processed strictly one at a time.

use std::fs::{self, File};
use std::io::{self, BufRead, Write};
use std::str::FromStr;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use deskcare_core::{
    IntervalStore, LedgerEvent, ReportMode, ReportRange, SessionTracker, TimerEngine, TimerEvent,
    WorkNotes, WorkType,
};
use deskcare_db::Database;
use fs2::FileExt;

use crate::Config;
use crate::commands::util::format_duration;
use crate::commands::{stats, timeline};

const HELP: &str = "\
Commands:
  focus | work            start a work block
  rest | nap | offline    stop the timer and switch state
  pause                   pause or resume the work block
  ready                   reset the timer
  snooze                  postpone the break
  exercise <secs>         record an exercise that just finished
  status | stats | timeline
  report [day|week|month] [self|formal]
  note <id> <formal|learning|personal> <text>
  quit";

/// One line of input to the run loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Work,
    Rest,
    Nap,
    Pause,
    Offline,
    Ready,
    Snooze,
    Exercise(i64),
    Status,
    Stats,
    Timeline,
    Report {
        range: ReportRange,
        mode: ReportMode,
    },
    Note {
        id: i64,
        work_type: WorkType,
        text: String,
    },
    Help,
    Quit,
}

impl FromStr for Input {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            anyhow::bail!("empty command");
        };
        let input = match command {
            "focus" | "work" => Self::Work,
            "rest" => Self::Rest,
            "nap" => Self::Nap,
            "pause" => Self::Pause,
            "offline" => Self::Offline,
            "ready" => Self::Ready,
            "snooze" => Self::Snooze,
            "exercise" => {
                let secs: i64 = words
                    .next()
                    .context("usage: exercise <secs>")?
                    .parse()
                    .context("exercise duration must be a number of seconds")?;
                if secs <= 0 {
                    anyhow::bail!("exercise duration must be positive");
                }
                Self::Exercise(secs)
            }
            "status" => Self::Status,
            "stats" => Self::Stats,
            "timeline" => Self::Timeline,
            "report" => {
                let mut range = ReportRange::Day;
                let mut mode = ReportMode::SelfReview;
                for word in words {
                    if let Ok(parsed) = word.parse() {
                        range = parsed;
                    } else {
                        mode = word.parse()?;
                    }
                }
                Self::Report { range, mode }
            }
            "note" => {
                let id: i64 = words
                    .next()
                    .context("usage: note <id> <formal|learning|personal> <text>")?
                    .parse()
                    .context("session id must be a number")?;
                let work_type: WorkType = words
                    .next()
                    .context("usage: note <id> <formal|learning|personal> <text>")?
                    .parse()?;
                let text = words.collect::<Vec<_>>().join(" ");
                Self::Note {
                    id,
                    work_type,
                    text,
                }
            }
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => anyhow::bail!("unknown command: {other} (try 'help')"),
        };
        Ok(input)
    }
}

/// Whether the loop should keep going after an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Timer and ledger for one `run` invocation.
#[derive(Debug)]
pub struct Runtime<S> {
    engine: TimerEngine,
    tracker: SessionTracker<S>,
    threshold_secs: i64,
    snooze_minutes: i64,
}

impl<S: IntervalStore> Runtime<S> {
    /// Builds the timer and opens the first session at `now`.
    pub fn start<W: Write>(
        writer: &mut W,
        store: Option<S>,
        config: &Config,
        now: DateTime<Local>,
    ) -> Result<Self> {
        let mut engine = TimerEngine::new(config.timer_config());
        if config.auto_start_work {
            engine.start_work(now);
            // The tracker starts in the engine's state, so the initial
            // transition needs no session of its own.
            engine.take_events();
        }
        let tracker =
            SessionTracker::new_at(store, engine.state(), now).with_config(config.ledger_config());
        tracing::info!(state = %engine.state(), "timer started");

        let runtime = Self {
            engine,
            tracker,
            threshold_secs: config.focus_session_threshold_secs,
            snooze_minutes: config.timer_config().snooze_secs / 60,
        };
        runtime.write_status(writer, now)?;
        Ok(runtime)
    }

    pub const fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    pub const fn tracker(&self) -> &SessionTracker<S> {
        &self.tracker
    }

    /// Applies one input and forwards the resulting notifications.
    pub fn handle<W: Write>(
        &mut self,
        writer: &mut W,
        input: Input,
        now: DateTime<Local>,
    ) -> Result<Flow> {
        let today = now.date_naive();
        match input {
            Input::Work => self.engine.start_work(now),
            Input::Rest => self.engine.rest(now),
            Input::Nap => self.engine.nap(),
            Input::Pause => self.engine.toggle_pause(now),
            Input::Offline => self.engine.go_offline(),
            Input::Ready => self.engine.reset(),
            Input::Snooze => self.engine.snooze(),
            Input::Exercise(secs) => self.engine.record_exercise(secs),
            Input::Status => self.write_status(writer, now)?,
            Input::Stats => {
                let stats = self.tracker.daily_stats_at(today, now);
                stats::write_table(writer, &stats, self.threshold_secs)?;
            }
            Input::Timeline => {
                let records = self.tracker.daily_activities_at(today, now);
                timeline::write_records(writer, today, &records)?;
            }
            Input::Report { range, mode } => {
                write!(writer, "{}", self.tracker.generate_report(today, range, mode))?;
            }
            Input::Note {
                id,
                work_type,
                text,
            } => {
                let mut notes = WorkNotes::default();
                match work_type {
                    WorkType::Formal => notes.formal = text,
                    WorkType::Learning => notes.learning = text,
                    WorkType::Personal => notes.personal = text,
                }
                if self
                    .tracker
                    .update_activity_content(id, &notes.to_content(), work_type)
                {
                    writeln!(writer, "Updated session #{id} ({work_type})")?;
                } else {
                    writeln!(writer, "Could not update session #{id}")?;
                }
            }
            Input::Help => writeln!(writer, "{HELP}")?,
            Input::Quit => return Ok(Flow::Quit),
        }
        self.dispatch(writer, now)?;
        Ok(Flow::Continue)
    }

    /// Advances the countdown by one tick.
    pub fn tick<W: Write>(&mut self, writer: &mut W, now: DateTime<Local>) -> Result<()> {
        self.engine.tick(now);
        self.dispatch(writer, now)
    }

    /// Closes the open session and hands back the store.
    pub fn finish(self, now: DateTime<Local>) -> Option<S> {
        tracing::info!(state = %self.tracker.current().state, "closing final session");
        self.tracker.finish_at(now)
    }

    /// Delivers timer notifications to the tracker, then reports what the
    /// ledger did.
    fn dispatch<W: Write>(&mut self, writer: &mut W, now: DateTime<Local>) -> Result<()> {
        for event in self.engine.take_events() {
            match event {
                TimerEvent::StateChanged(state) => {
                    self.tracker.on_state_changed_at(state, now);
                    writeln!(writer, "State: {state}")?;
                }
                TimerEvent::ReminderTriggered => {
                    writeln!(
                        writer,
                        "Time for a break! Type 'snooze' for {} more minutes.",
                        self.snooze_minutes
                    )?;
                }
                TimerEvent::BreakFinished { duration_secs } => {
                    writeln!(writer, "Break lasted {}", format_duration(duration_secs))?;
                }
                TimerEvent::ExerciseRecorded { duration_secs } => {
                    self.tracker
                        .on_manual_exercise_recorded_at(duration_secs, now);
                }
            }
        }

        for event in self.tracker.take_events() {
            match event {
                LedgerEvent::ExerciseSpliced {
                    interval,
                    id: Some(id),
                } => writeln!(
                    writer,
                    "Recorded {} exercise as session #{id}",
                    format_duration(interval.duration)
                )?,
                LedgerEvent::SessionClosed { interval, id } => {
                    tracing::debug!(?id, state = %interval.state, duration = interval.duration, "session closed");
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn write_status<W: Write>(&self, writer: &mut W, now: DateTime<Local>) -> Result<()> {
        let remaining = self.engine.remaining_secs().max(0);
        let current = self.tracker.current();
        writeln!(
            writer,
            "State: {} | remaining {:02}:{:02} | finishes {} | since {} ({})",
            self.engine.state(),
            remaining / 60,
            remaining % 60,
            self.engine.estimated_finish(now),
            current.started_at.format("%H:%M"),
            format_duration(current.elapsed_secs(now)),
        )?;
        if self.tracker.store().is_none() {
            writeln!(writer, "Ledger unavailable: sessions are not being recorded.")?;
        }
        Ok(())
    }
}

/// Runs the timer until `quit` or end of input.
pub fn run(config: &Config) -> Result<()> {
    if let Some(parent) = config.database_path.parent() {
        fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    let lock_file = File::create(config.lock_path()).context("failed to create lock file")?;
    lock_file
        .try_lock_exclusive()
        .context("another deskcare run is already using this ledger")?;

    let store = match Database::open(&config.database_path) {
        Ok(db) => Some(db),
        Err(err) => {
            tracing::error!(
                path = %config.database_path.display(),
                error = %err,
                "failed to open activity ledger"
            );
            None
        }
    };

    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut runtime = Runtime::start(&mut writer, store, config, Local::now())?;

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    let tick_interval = config.tick_interval();
    let mut next_tick = Instant::now() + tick_interval;
    loop {
        let timeout = next_tick.saturating_duration_since(Instant::now());
        match rx.recv_timeout(timeout) {
            Ok(line) => {
                let line = line.context("failed to read stdin")?;
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Input>() {
                    Ok(input) => {
                        if runtime.handle(&mut writer, input, Local::now())? == Flow::Quit {
                            break;
                        }
                    }
                    Err(err) => writeln!(writer, "{err:#}")?,
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        while Instant::now() >= next_tick {
            runtime.tick(&mut writer, Local::now())?;
            next_tick += tick_interval;
        }
        writer.flush()?;
    }

    runtime.finish(Local::now());
    writeln!(writer, "Bye.")?;
    fs2::FileExt::unlock(&lock_file).context("failed to release lock")?;
    Ok(())
}
