//! Activity states and work-type tags as the single source of truth for their
//! persisted representations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The text does not name a known activity state.
    #[error("unknown activity state: {0}")]
    UnknownState(String),

    /// The text does not name a known work type.
    #[error("unknown work type: {0}")]
    UnknownWorkType(String),

    /// The text does not name a known report range.
    #[error("unknown report range: {0}")]
    UnknownRange(String),

    /// The text does not name a known report mode.
    #[error("unknown report mode: {0}")]
    UnknownMode(String),
}

/// What the user is doing, as reported by the timer.
///
/// The text form is stored in the `state` column of every historical row, so
/// the strings returned by [`ActivityState::as_str`] must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActivityState {
    Focus,
    Rest,
    Nap,
    Pause,
    Offline,
    Ready,
}

impl ActivityState {
    /// All states, in display order.
    pub const ALL: [Self; 6] = [
        Self::Focus,
        Self::Rest,
        Self::Nap,
        Self::Pause,
        Self::Offline,
        Self::Ready,
    ];

    /// String representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Focus => "Focus",
            Self::Rest => "Rest",
            Self::Nap => "Nap",
            Self::Pause => "Pause",
            Self::Offline => "Offline",
            Self::Ready => "Ready",
        }
    }

    /// Colour bucket used by timeline views.
    ///
    /// Offline and Ready share the "other" bucket.
    #[must_use]
    pub const fn color_code(&self) -> u8 {
        match self {
            Self::Focus => 0,
            Self::Rest => 1,
            Self::Nap => 2,
            Self::Pause => 3,
            Self::Offline | Self::Ready => 4,
        }
    }
}

impl fmt::Display for ActivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ActivityState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Focus" => Ok(Self::Focus),
            "Rest" => Ok(Self::Rest),
            "Nap" => Ok(Self::Nap),
            "Pause" => Ok(Self::Pause),
            "Offline" => Ok(Self::Offline),
            "Ready" => Ok(Self::Ready),
            _ => Err(ValidationError::UnknownState(s.to_string())),
        }
    }
}

impl Serialize for ActivityState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ActivityState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Category a focus block's notes belong to.
///
/// Persisted as an integer in the `work_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkType {
    #[default]
    Formal,
    Learning,
    Personal,
}

impl WorkType {
    /// Integer code for database storage.
    #[must_use]
    pub const fn code(&self) -> i64 {
        match self {
            Self::Formal => 0,
            Self::Learning => 1,
            Self::Personal => 2,
        }
    }

    /// Reads a stored code. Anything unrecognised is treated as formal work.
    #[must_use]
    pub const fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Learning,
            2 => Self::Personal,
            _ => Self::Formal,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Formal => "formal",
            Self::Learning => "learning",
            Self::Personal => "personal",
        }
    }
}

impl fmt::Display for WorkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WorkType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "formal" => Ok(Self::Formal),
            "learning" => Ok(Self::Learning),
            "personal" => Ok(Self::Personal),
            _ => Err(ValidationError::UnknownWorkType(s.to_string())),
        }
    }
}
