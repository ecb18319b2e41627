//! Core domain logic for the DeskCare activity ledger.
//!
//! This crate contains the fundamental types and logic for:
//! - Session tracking: persisting one interval per state occupancy
//! - Manual exercise reconciliation: splicing reported exercise into the timeline
//! - Aggregation: per-day timelines and per-state statistics
//! - Reporting: rendering annotated focus sessions as a text report
//! - The countdown timer that drives state changes

pub mod calendar;
mod interval;
pub mod report;
mod state;
pub mod stats;
mod store;
pub mod timeline;
pub mod timer;
mod tracker;

#[cfg(test)]
mod test_support;

pub use interval::{CurrentSession, Interval, NewInterval};
pub use report::{ReportMode, ReportRange, WorkNotes};
pub use state::{ActivityState, ValidationError, WorkType};
pub use stats::{DailyStats, FOCUS_SESSION_THRESHOLD_SECS, StateTotals};
pub use store::IntervalStore;
pub use timeline::ActivityRecord;
pub use timer::{TimerConfig, TimerEngine, TimerEvent};
pub use tracker::{LedgerConfig, LedgerEvent, SessionTracker};
