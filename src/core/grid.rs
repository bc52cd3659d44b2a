//! Grid design model: the editor's matrix of intensity cells.
//!
//! Cells are addressed by (week offset, weekday offset). Weekday 0 is the calendar's
//! week-start day, so a column of the contribution calendar is one week.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::RangeError;

pub const DAYS_PER_WEEK: u8 = 7;

/// How dark a calendar cell should render, `0..=4`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Intensity(u8);

impl Intensity {
    pub const MIN: u8 = 0;
    pub const MAX: u8 = 4;
    pub const LEVELS: usize = (Self::MAX as usize) + 1;

    pub const ZERO: Intensity = Intensity(0);

    pub fn new(level: u8) -> Result<Self, RangeError> {
        if level > Self::MAX {
            return Err(RangeError {
                field: "intensity",
                value: u32::from(level),
                min: u32::from(Self::MIN),
                max: u32::from(Self::MAX),
            });
        }
        Ok(Self(level))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub(crate) fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl TryFrom<u8> for Intensity {
    type Error = RangeError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level)
    }
}

impl<'de> Deserialize<'de> for Intensity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let level = u8::deserialize(deserializer)?;
        Intensity::new(level).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One cell of the design.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridCell {
    pub week: u32,
    pub weekday: u8,
    pub intensity: Intensity,
}

impl GridCell {
    pub fn new(week: u32, weekday: u8, intensity: Intensity) -> Result<Self, RangeError> {
        check_weekday(weekday)?;
        Ok(Self {
            week,
            weekday,
            intensity,
        })
    }

    /// Days from the anchor to this cell.
    pub fn day_offset(&self) -> i64 {
        i64::from(self.week) * i64::from(DAYS_PER_WEEK) + i64::from(self.weekday)
    }
}

pub(crate) fn check_weekday(weekday: u8) -> Result<(), RangeError> {
    if weekday >= DAYS_PER_WEEK {
        return Err(RangeError {
            field: "weekday",
            value: u32::from(weekday),
            min: 0,
            max: u32::from(DAYS_PER_WEEK - 1),
        });
    }
    Ok(())
}

/// Immutable design matrix, stored week-major.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GridDesign {
    weeks: Vec<[Intensity; DAYS_PER_WEEK as usize]>,
}

impl GridDesign {
    /// Build a design from raw levels, one `[u8; 7]` per week.
    pub fn from_levels(weeks: &[[u8; DAYS_PER_WEEK as usize]]) -> Result<Self, RangeError> {
        let mut out = Vec::with_capacity(weeks.len());
        for week in weeks {
            let mut row = [Intensity::ZERO; DAYS_PER_WEEK as usize];
            for (slot, level) in row.iter_mut().zip(week.iter()) {
                *slot = Intensity::new(*level)?;
            }
            out.push(row);
        }
        Ok(Self { weeks: out })
    }

    pub fn get(&self, week: u32, weekday: u8) -> Option<Intensity> {
        self.weeks
            .get(week as usize)
            .and_then(|row| row.get(usize::from(weekday)))
            .copied()
    }

    /// Cells in traversal order: week-major, then weekday.
    pub fn cells(&self) -> impl Iterator<Item = GridCell> + '_ {
        self.weeks.iter().enumerate().flat_map(|(week, row)| {
            row.iter()
                .enumerate()
                .map(move |(weekday, intensity)| GridCell {
                    week: week as u32,
                    weekday: weekday as u8,
                    intensity: *intensity,
                })
        })
    }

    /// Cells that produce commits.
    pub fn lit_cells(&self) -> impl Iterator<Item = GridCell> + '_ {
        self.cells().filter(|cell| !cell.intensity.is_zero())
    }
}
