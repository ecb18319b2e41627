//! Storage layer for the DeskCare activity ledger.
//!
//! Persists closed activity intervals using `rusqlite`.
//!
//! # Thread Safety
//!
//! [`Database`] wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! The ledger has a single writer: the control thread of the `run` loop owns
//! the database through the session tracker.
//!
//! # Schema
//!
//! One table, `activity_log`. Times are whole seconds since the Unix epoch,
//! `state` is the text form of [`ActivityState`] and `work_type` the integer
//! code of [`WorkType`]. Databases created before `content` and `work_type`
//! existed are upgraded in place on open.

use std::path::Path;

use deskcare_core::{ActivityState, Interval, IntervalStore, NewInterval, WorkType};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored row names a state this build does not know.
    #[error("unknown state for interval {id}: {value}")]
    UnknownState { id: i64, value: String },
    /// A stored row has NULL in a column every interval needs.
    #[error("interval {id} has no {column}")]
    MissingColumn { id: i64, column: &'static str },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.conn.path())
            .finish()
    }
}

/// Columns added after the first release, applied to older files on open.
const LATE_COLUMNS: [&str; 2] = [
    "ALTER TABLE activity_log ADD COLUMN content TEXT",
    "ALTER TABLE activity_log ADD COLUMN work_type INTEGER DEFAULT 0",
];

const SELECT_COLUMNS: &str =
    "SELECT id, state, start_time, end_time, duration, content, work_type FROM activity_log";

/// A row as stored, before nullability and the state text are validated.
struct RawInterval {
    id: i64,
    state: Option<String>,
    start_time: Option<i64>,
    end_time: Option<i64>,
    duration: Option<i64>,
    content: Option<String>,
    work_type: Option<i64>,
}

impl RawInterval {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            state: row.get(1)?,
            start_time: row.get(2)?,
            end_time: row.get(3)?,
            duration: row.get(4)?,
            content: row.get(5)?,
            work_type: row.get(6)?,
        })
    }

    fn into_interval(self) -> Result<Interval, DbError> {
        let id = self.id;
        let missing = |column| DbError::MissingColumn { id, column };
        let raw_state = self.state.ok_or_else(|| missing("state"))?;
        let start_time = self.start_time.ok_or_else(|| missing("start_time"))?;
        let end_time = self.end_time.ok_or_else(|| missing("end_time"))?;
        let state: ActivityState = raw_state
            .parse()
            .map_err(|_| DbError::UnknownState { id, value: raw_state.clone() })?;
        Ok(Interval {
            id,
            state,
            start_time,
            end_time,
            duration: self.duration.unwrap_or(end_time - start_time),
            content: self.content,
            work_type: WorkType::from_code(self.work_type.unwrap_or_default()),
        })
    }
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The schema is created or upgraded on every open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the schema. Idempotent.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- One row per closed session.
            -- start_time / end_time: seconds since the Unix epoch
            -- state: Focus, Rest, Nap, Pause, Offline or Ready
            -- work_type: 0 formal, 1 learning, 2 personal
            CREATE TABLE IF NOT EXISTS activity_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                state TEXT,
                start_time INTEGER,
                end_time INTEGER,
                duration INTEGER,
                content TEXT,
                work_type INTEGER DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_activity_log_start ON activity_log(start_time);
            ",
        )?;

        for statement in LATE_COLUMNS {
            // Fails with "duplicate column name" once the column exists.
            if let Err(err) = self.conn.execute(statement, []) {
                tracing::trace!(statement, error = %err, "skipping schema upgrade");
            }
        }
        Ok(())
    }

    /// Number of stored intervals.
    pub fn interval_count(&self) -> Result<i64, DbError> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM activity_log", [], |row| row.get(0))?;
        Ok(count)
    }

    /// The interval with the latest start time, if any.
    pub fn latest_interval(&self) -> Result<Option<Interval>, DbError> {
        let raw = self
            .conn
            .query_row(
                &format!("{SELECT_COLUMNS} ORDER BY start_time DESC, id DESC LIMIT 1"),
                [],
                RawInterval::from_row,
            )
            .optional()?;
        raw.map(RawInterval::into_interval).transpose()
    }

    /// Fetches one interval by id.
    pub fn get_interval(&self, id: i64) -> Result<Option<Interval>, DbError> {
        let raw = self
            .conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?"),
                [id],
                RawInterval::from_row,
            )
            .optional()?;
        raw.map(RawInterval::into_interval).transpose()
    }

    fn query_intervals(
        &self,
        filter: &str,
        start: i64,
        end: i64,
    ) -> Result<Vec<Interval>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "{SELECT_COLUMNS} WHERE {filter} ORDER BY start_time ASC, id ASC"
        ))?;
        let rows = stmt.query_map(params![start, end], RawInterval::from_row)?;
        let mut intervals = Vec::new();
        for row in rows {
            match row?.into_interval() {
                Ok(interval) => intervals.push(interval),
                Err(err) => tracing::warn!(error = %err, "skipping unreadable interval"),
            }
        }
        Ok(intervals)
    }
}

impl IntervalStore for Database {
    type Error = DbError;

    fn insert_interval(&mut self, interval: &NewInterval) -> Result<i64, DbError> {
        self.conn.execute(
            "INSERT INTO activity_log (state, start_time, end_time, duration) VALUES (?, ?, ?, ?)",
            params![
                interval.state.as_str(),
                interval.start_time,
                interval.end_time,
                interval.duration,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn intervals_starting_between(&self, start: i64, end: i64) -> Result<Vec<Interval>, DbError> {
        self.query_intervals("start_time >= ?1 AND start_time <= ?2", start, end)
    }

    fn annotated_focus_between(&self, start: i64, end: i64) -> Result<Vec<Interval>, DbError> {
        self.query_intervals(
            "state = 'Focus' AND content IS NOT NULL AND content != '' \
             AND start_time >= ?1 AND start_time <= ?2",
            start,
            end,
        )
    }

    fn update_interval_content(
        &mut self,
        id: i64,
        content: &str,
        work_type: WorkType,
    ) -> Result<bool, DbError> {
        let updated = self.conn.execute(
            "UPDATE activity_log SET content = ?, work_type = ? WHERE id = ?",
            params![content, work_type.code(), id],
        )?;
        Ok(updated > 0)
    }
}
