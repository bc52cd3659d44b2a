//! Date mapper: anchors the grid on a calendar date and resolves every record to
//! an absolute day.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use time::{Date, Duration, Weekday};

use super::error::ValidationError;
use super::grid::{DAYS_PER_WEEK, Intensity};
use super::wire::{PlanRecord, RecordKey, parse_date};

/// First row of the calendar grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl WeekStart {
    pub fn weekday(self) -> Weekday {
        match self {
            WeekStart::Sunday => Weekday::Sunday,
            WeekStart::Monday => Weekday::Monday,
            WeekStart::Tuesday => Weekday::Tuesday,
            WeekStart::Wednesday => Weekday::Wednesday,
            WeekStart::Thursday => Weekday::Thursday,
            WeekStart::Friday => Weekday::Friday,
            WeekStart::Saturday => Weekday::Saturday,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sunday" | "sun" => Some(WeekStart::Sunday),
            "monday" | "mon" => Some(WeekStart::Monday),
            "tuesday" | "tue" => Some(WeekStart::Tuesday),
            "wednesday" | "wed" => Some(WeekStart::Wednesday),
            "thursday" | "thu" => Some(WeekStart::Thursday),
            "friday" | "fri" => Some(WeekStart::Friday),
            "saturday" | "sat" => Some(WeekStart::Saturday),
            _ => None,
        }
    }
}

impl fmt::Display for WeekStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.weekday())
    }
}

/// A date verified to fall on the week-start weekday.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnchorDate(Date);

impl AnchorDate {
    pub fn new(date: Date, week_start: WeekStart) -> Result<Self, ValidationError> {
        let expected = week_start.weekday();
        if date.weekday() != expected {
            return Err(ValidationError::AnchorWeekday {
                anchor: date,
                found: date.weekday(),
                expected,
            });
        }
        Ok(Self(date))
    }

    pub fn parse(raw: &str, week_start: WeekStart) -> Result<Self, ValidationError> {
        let date = parse_date(raw).ok_or_else(|| ValidationError::InvalidAnchor {
            raw: raw.to_string(),
        })?;
        Self::new(date, week_start)
    }

    pub fn date(self) -> Date {
        self.0
    }

    /// `anchor + 7 * week + weekday` days.
    pub fn resolve(self, week: u32, weekday: u8) -> Option<Date> {
        let days = i64::from(week) * i64::from(DAYS_PER_WEEK) + i64::from(weekday);
        self.0.checked_add(Duration::days(days))
    }

    /// Week column a date falls in; `None` before the anchor.
    pub fn week_of(self, date: Date) -> Option<u32> {
        let days = (date - self.0).whole_days();
        if days < 0 {
            return None;
        }
        u32::try_from(days / i64::from(DAYS_PER_WEEK)).ok()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct DateMapperOptions {
    pub allow_future_dates: bool,
    /// Calendar width in weeks; `None` disables the check.
    pub max_weeks: Option<u32>,
    /// Reference day for the future-date check.
    pub today: Date,
}

/// A resolved calendar day and how dark it should be.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DatedIntensity {
    pub date: Date,
    pub intensity: Intensity,
    /// Plan line the record came from.
    pub line: usize,
}

pub struct DateMapper {
    anchor: AnchorDate,
    options: DateMapperOptions,
}

impl DateMapper {
    pub fn new(anchor: AnchorDate, options: DateMapperOptions) -> Self {
        Self { anchor, options }
    }

    /// Resolve records into dated intensities sorted ascending by date.
    pub fn resolve(&self, records: &[PlanRecord]) -> Result<Vec<DatedIntensity>, ValidationError> {
        let mut seen: HashMap<Date, usize> = HashMap::with_capacity(records.len());
        let mut out = Vec::with_capacity(records.len());

        for record in records {
            let date = match record.key {
                RecordKey::Date(date) => date,
                RecordKey::Cell { week, weekday } => self
                    .anchor
                    .resolve(week, weekday)
                    .ok_or(ValidationError::DateOverflow { line: record.line })?,
            };
            self.check_range(record.line, date, record.intensity)?;
            if let Some(first_line) = seen.insert(date, record.line) {
                return Err(ValidationError::DuplicateDate {
                    line: record.line,
                    date,
                    first_line,
                });
            }
            out.push(DatedIntensity {
                date,
                intensity: record.intensity,
                line: record.line,
            });
        }

        out.sort_by_key(|dated| dated.date);
        Ok(out)
    }

    /// Empty cells only need to sit on or after the anchor; they never produce commits.
    fn check_range(
        &self,
        line: usize,
        date: Date,
        intensity: Intensity,
    ) -> Result<(), ValidationError> {
        let anchor = self.anchor.date();
        let Some(week) = self.anchor.week_of(date) else {
            return Err(ValidationError::BeforeAnchor { line, date, anchor });
        };
        if intensity.is_zero() {
            return Ok(());
        }
        if let Some(max) = self.options.max_weeks
            && week >= max
        {
            return Err(ValidationError::WeekOutOfRange { line, week, max });
        }
        if !self.options.allow_future_dates && date > self.options.today {
            return Err(ValidationError::FutureDate {
                line,
                date,
                today: self.options.today,
            });
        }
        Ok(())
    }
}
