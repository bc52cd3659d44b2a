//! Commit plan builder.
//!
//! Expands dated intensities into individual commit directives. Each day's commits are
//! spread evenly over that day in the configured UTC offset, so every timestamp stays
//! inside its own calendar day and the whole plan is strictly increasing.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use super::date::DatedIntensity;
use super::error::BuildError;
use super::grid::Intensity;
use super::wire::format_date;

pub const SECONDS_PER_DAY: u32 = 86_400;

/// Commits created per intensity level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "[u32; 5]", into = "[u32; 5]")]
pub struct IntensityScale([u32; Intensity::LEVELS]);

impl IntensityScale {
    pub const DEFAULT: [u32; Intensity::LEVELS] = [0, 1, 3, 6, 10];

    pub fn new(counts: [u32; Intensity::LEVELS]) -> Result<Self, BuildError> {
        let invalid = |reason: &str| BuildError::InvalidScale {
            scale: counts,
            reason: reason.to_string(),
        };
        if counts[0] != 0 {
            return Err(invalid("intensity 0 must map to 0 commits"));
        }
        if counts.windows(2).any(|pair| pair[1] < pair[0]) {
            return Err(invalid("counts must be non-decreasing"));
        }
        if counts[Intensity::LEVELS - 1] > SECONDS_PER_DAY {
            return Err(invalid("more than one commit per second of a day"));
        }
        Ok(Self(counts))
    }

    pub fn commits_for(&self, intensity: Intensity) -> u32 {
        self.0[intensity.index()]
    }

    pub fn counts(&self) -> [u32; Intensity::LEVELS] {
        self.0
    }
}

impl Default for IntensityScale {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl TryFrom<[u32; 5]> for IntensityScale {
    type Error = BuildError;

    fn try_from(counts: [u32; 5]) -> Result<Self, Self::Error> {
        Self::new(counts)
    }
}

impl From<IntensityScale> for [u32; 5] {
    fn from(scale: IntensityScale) -> Self {
        scale.0
    }
}

/// Parse `+HH:MM`, `-HH:MM`, `Z` or `UTC`.
pub fn parse_utc_offset(raw: &str) -> Result<UtcOffset, BuildError> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return Ok(UtcOffset::UTC);
    }
    UtcOffset::parse(
        trimmed,
        format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
    )
    .map_err(|_| BuildError::InvalidOffset {
        raw: raw.to_string(),
    })
}

/// Opaque per-commit value that makes every commit change the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentToken(u64);

impl ContentToken {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContentToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cadence-{:06}", self.0)
    }
}

/// One commit to create.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitDirective {
    /// Index in the plan; also the commit's position in the parent chain.
    pub position: usize,
    pub date: Date,
    /// 1-based index among this date's commits.
    pub ordinal: u32,
    /// Commits planned for this date.
    pub per_day: u32,
    /// Forged author and committer time.
    pub timestamp: OffsetDateTime,
    pub token: ContentToken,
}

impl CommitDirective {
    pub fn unix_seconds(&self) -> i64 {
        self.timestamp.unix_timestamp()
    }

    pub fn offset_minutes(&self) -> i32 {
        i32::from(self.timestamp.offset().whole_minutes())
    }

    /// Line appended to the content file.
    pub fn content_line(&self) -> String {
        let when = self
            .timestamp
            .format(&Rfc3339)
            .unwrap_or_else(|_| self.unix_seconds().to_string());
        format!("{} {when}", self.token)
    }

    pub fn message(&self, prefix: &str) -> String {
        format!(
            "{prefix}: {} ({}/{})\n\n{}",
            format_date(self.date),
            self.ordinal,
            self.per_day,
            self.token
        )
    }
}

/// The ordered, immutable set of commits for one run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitPlan {
    directives: Vec<CommitDirective>,
    offset: UtcOffset,
}

impl CommitPlan {
    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&CommitDirective> {
        self.directives.get(position)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CommitDirective> {
        self.directives.iter()
    }

    pub fn directives(&self) -> &[CommitDirective] {
        &self.directives
    }

    pub fn offset(&self) -> UtcOffset {
        self.offset
    }

    /// Distinct dates that receive at least one commit, ascending.
    pub fn dates(&self) -> Vec<Date> {
        let mut dates: Vec<Date> = Vec::new();
        for directive in &self.directives {
            if dates.last() != Some(&directive.date) {
                dates.push(directive.date);
            }
        }
        dates
    }

    pub fn summary(&self) -> PlanSummary {
        let mut days: Vec<DaySummary> = Vec::new();
        for directive in &self.directives {
            match days.last_mut() {
                Some(day) if day.date == format_date(directive.date) => day.commits += 1,
                _ => days.push(DaySummary {
                    date: format_date(directive.date),
                    commits: 1,
                }),
            }
        }
        PlanSummary {
            total_commits: self.directives.len(),
            committed_dates: days.len(),
            first_date: days.first().map(|day| day.date.clone()),
            last_date: days.last().map(|day| day.date.clone()),
            days,
        }
    }
}

impl<'a> IntoIterator for &'a CommitPlan {
    type Item = &'a CommitDirective;
    type IntoIter = std::slice::Iter<'a, CommitDirective>;

    fn into_iter(self) -> Self::IntoIter {
        self.directives.iter()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DaySummary {
    pub date: String,
    pub commits: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub total_commits: usize,
    pub committed_dates: usize,
    pub first_date: Option<String>,
    pub last_date: Option<String>,
    pub days: Vec<DaySummary>,
}

/// Pure function of (dated intensities, scale, offset).
#[derive(Clone, Copy, Debug)]
pub struct PlanBuilder {
    scale: IntensityScale,
    offset: UtcOffset,
}

impl PlanBuilder {
    pub fn new(scale: IntensityScale, offset: UtcOffset) -> Self {
        Self { scale, offset }
    }

    /// Expand dated intensities (strictly ascending by date) into a plan.
    pub fn build(&self, dated: &[DatedIntensity]) -> Result<CommitPlan, BuildError> {
        let mut directives = Vec::new();
        let mut previous: Option<Date> = None;

        for day in dated {
            if let Some(prev) = previous
                && day.date <= prev
            {
                return Err(BuildError::Unordered { date: day.date });
            }
            previous = Some(day.date);

            let per_day = self.scale.commits_for(day.intensity);
            if per_day == 0 {
                continue;
            }
            let spacing = i64::from(SECONDS_PER_DAY / per_day);
            let midnight = PrimitiveDateTime::new(day.date, Time::MIDNIGHT).assume_offset(self.offset);
            for i in 0..per_day {
                let timestamp = midnight
                    .checked_add(Duration::seconds(i64::from(i) * spacing))
                    .ok_or(BuildError::TimestampOverflow { date: day.date })?;
                let position = directives.len();
                directives.push(CommitDirective {
                    position,
                    date: day.date,
                    ordinal: i + 1,
                    per_day,
                    timestamp,
                    token: ContentToken::new(position as u64 + 1),
                });
            }
        }

        Ok(CommitPlan {
            directives,
            offset: self.offset,
        })
    }
}
