//! Core capability errors (plan parsing, date validation, plan building).
//!
//! These are bounded and stable: every core error is a refusal raised before the
//! repository is touched.

use std::path::PathBuf;

use thiserror::Error;
use time::{Date, Weekday};

use super::wire::PlanParseError;
use crate::error::{Effect, Transience};

/// Generic range violation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{field} value {value} out of range {min}..={max}")]
pub struct RangeError {
    pub field: &'static str,
    pub value: u32,
    pub min: u32,
    pub max: u32,
}

/// Input was rejected before any side effect.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ValidationError {
    #[error(transparent)]
    Records(#[from] PlanParseError),

    #[error("failed to read plan {path}: {source}")]
    ReadPlan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("anchor date `{raw}` is invalid (expected YYYY-MM-DD or DD/MM/YYYY)")]
    InvalidAnchor { raw: String },

    #[error("anchor date {anchor} is a {found}, but calendar weeks start on {expected}")]
    AnchorWeekday {
        anchor: Date,
        found: Weekday,
        expected: Weekday,
    },

    #[error("line {line}: {date} falls before the anchor date {anchor}")]
    BeforeAnchor { line: usize, date: Date, anchor: Date },

    #[error("line {line}: week offset {week} is outside the calendar ({max} weeks)")]
    WeekOutOfRange { line: usize, week: u32, max: u32 },

    #[error(
        "line {line}: {date} is in the future (today is {today}); enable calendar.allow_future_dates to keep it"
    )]
    FutureDate { line: usize, date: Date, today: Date },

    #[error("line {line}: {date} is already planned on line {first_line}")]
    DuplicateDate {
        line: usize,
        date: Date,
        first_line: usize,
    },

    #[error("line {line}: date arithmetic overflowed")]
    DateOverflow { line: usize },

    #[error("plan produces no commits")]
    NothingToCommit,
}

impl ValidationError {
    pub fn transience(&self) -> Transience {
        Transience::Permanent
    }

    pub fn effect(&self) -> Effect {
        Effect::None
    }
}

/// The dated intensities could not be turned into a commit plan.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BuildError {
    #[error("invalid intensity scale {scale:?}: {reason}")]
    InvalidScale { scale: [u32; 5], reason: String },

    #[error("utc offset `{raw}` is invalid (expected +HH:MM, -HH:MM or Z)")]
    InvalidOffset { raw: String },

    #[error("dated intensities are not strictly ascending at {date}")]
    Unordered { date: Date },

    #[error("timestamp for {date} is out of range")]
    TimestampOverflow { date: Date },
}

impl BuildError {
    pub fn transience(&self) -> Transience {
        Transience::Permanent
    }

    pub fn effect(&self) -> Effect {
        Effect::None
    }
}
