//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use deskcare_core::timer::{DEFAULT_WORK_DURATION_SECS, SNOOZE_DURATION_SECS, TICK_INTERVAL};
use deskcare_core::{FOCUS_SESSION_THRESHOLD_SECS, LedgerConfig, TimerConfig};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the activity ledger.
    pub database_path: PathBuf,
    /// Length of a work block.
    pub work_duration_minutes: i64,
    /// Length of the extra block granted by snoozing.
    pub snooze_minutes: i64,
    /// Focus sessions longer than this count towards `focusSessionCount`.
    pub focus_session_threshold_secs: i64,
    pub tick_interval_ms: u64,
    /// Start a work block as soon as `run` starts.
    pub auto_start_work: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("work_duration_minutes", &self.work_duration_minutes)
            .field("snooze_minutes", &self.snooze_minutes)
            .field(
                "focus_session_threshold_secs",
                &self.focus_session_threshold_secs,
            )
            .field("tick_interval_ms", &self.tick_interval_ms)
            .field("auto_start_work", &self.auto_start_work)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("activity_log.db"),
            work_duration_minutes: DEFAULT_WORK_DURATION_SECS / 60,
            snooze_minutes: SNOOZE_DURATION_SECS / 60,
            focus_session_threshold_secs: FOCUS_SESSION_THRESHOLD_SECS,
            tick_interval_ms: u64::try_from(TICK_INTERVAL.as_millis()).unwrap_or(1000),
            auto_start_work: true,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // DESKCARE_DATABASE_PATH, DESKCARE_WORK_DURATION_MINUTES, ...
        figment = figment.merge(Env::prefixed("DESKCARE_"));

        figment.extract()
    }

    /// Timer settings. Work blocks are at least one minute long.
    #[must_use]
    pub fn timer_config(&self) -> TimerConfig {
        TimerConfig {
            work_duration_secs: self.work_duration_minutes.max(1) * 60,
            snooze_secs: self.snooze_minutes.max(1) * 60,
        }
    }

    #[must_use]
    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            focus_session_threshold_secs: self.focus_session_threshold_secs,
        }
    }

    /// Time between timer ticks, never zero.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    /// Lock file guarding single-writer access to the ledger.
    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        let mut name = self
            .database_path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        self.database_path.with_file_name(name)
    }
}

/// Returns the platform-specific config directory for deskcare.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("deskcare"))
}

/// Returns the platform-specific data directory for deskcare.
///
/// On Linux: `~/.local/share/deskcare`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("deskcare"))
}
