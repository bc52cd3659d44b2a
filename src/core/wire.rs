//! Plan file format.
//!
//! One record per line: `<when> <intensity>`, fields separated by whitespace or a
//! comma. `<when>` is an explicit date (`YYYY-MM-DD` or `DD/MM/YYYY`) or a grid
//! coordinate `W:D` relative to the anchor. Blank lines and `#` comments are ignored.
//!
//! Parsing fails closed and reports every bad record, not just the first.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;
use time::macros::format_description;
use time::{Date, Month};

use super::grid::{Intensity, check_weekday};

/// What a record is keyed by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordKey {
    Date(Date),
    Cell { week: u32, weekday: u8 },
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Date(date) => write!(f, "{}", format_date(*date)),
            RecordKey::Cell { week, weekday } => write!(f, "{week}:{weekday}"),
        }
    }
}

/// A validated plan line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlanRecord {
    /// 1-based line number in the plan file.
    pub line: usize,
    pub key: RecordKey,
    pub intensity: Intensity,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordErrorKind {
    Malformed { reason: String },
    BadDate { raw: String },
    BadCell { raw: String, reason: String },
    IntensityOutOfRange { raw: String },
    Duplicate { first_line: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordError {
    pub line: usize,
    pub kind: RecordErrorKind,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: ", self.line)?;
        match &self.kind {
            RecordErrorKind::Malformed { reason } => write!(f, "{reason}"),
            RecordErrorKind::BadDate { raw } => write!(f, "`{raw}` is not a valid date"),
            RecordErrorKind::BadCell { raw, reason } => {
                write!(f, "`{raw}` is not a valid grid cell: {reason}")
            }
            RecordErrorKind::IntensityOutOfRange { raw } => write!(
                f,
                "intensity `{raw}` is outside {}..={}",
                Intensity::MIN,
                Intensity::MAX
            ),
            RecordErrorKind::Duplicate { first_line } => {
                write!(f, "duplicates the record on line {first_line}")
            }
        }
    }
}

/// Every invalid record found in a plan.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("plan has {} invalid record(s): {}", .errors.len(), join_errors(.errors))]
pub struct PlanParseError {
    pub errors: Vec<RecordError>,
}

impl PlanParseError {
    pub fn lines(&self) -> Vec<usize> {
        self.errors.iter().map(|err| err.line).collect()
    }
}

fn join_errors(errors: &[RecordError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Parse a whole plan file.
pub fn parse_plan(text: &str) -> Result<Vec<PlanRecord>, PlanParseError> {
    let mut records = Vec::new();
    let mut errors = Vec::new();
    let mut seen: HashMap<RecordKey, usize> = HashMap::new();

    for (idx, raw_line) in text.lines().enumerate() {
        let line = idx + 1;
        let content = strip_comment(raw_line).trim();
        if content.is_empty() {
            continue;
        }
        match parse_record(line, content) {
            Ok(record) => {
                if let Some(first_line) = seen.get(&record.key) {
                    errors.push(RecordError {
                        line,
                        kind: RecordErrorKind::Duplicate {
                            first_line: *first_line,
                        },
                    });
                    continue;
                }
                seen.insert(record.key, line);
                records.push(record);
            }
            Err(kind) => errors.push(RecordError { line, kind }),
        }
    }

    if errors.is_empty() {
        Ok(records)
    } else {
        Err(PlanParseError { errors })
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn parse_record(line: usize, content: &str) -> Result<PlanRecord, RecordErrorKind> {
    let fields: Vec<&str> = content
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|field| !field.is_empty())
        .collect();
    let [when, level] = fields.as_slice() else {
        return Err(RecordErrorKind::Malformed {
            reason: format!(
                "expected `<date> <intensity>`, found {} field(s)",
                fields.len()
            ),
        });
    };

    let key = parse_key(when)?;
    let intensity = level
        .parse::<u8>()
        .ok()
        .and_then(|value| Intensity::new(value).ok())
        .ok_or_else(|| RecordErrorKind::IntensityOutOfRange {
            raw: (*level).to_string(),
        })?;

    Ok(PlanRecord {
        line,
        key,
        intensity,
    })
}

fn parse_key(raw: &str) -> Result<RecordKey, RecordErrorKind> {
    if let Some((week, weekday)) = raw.split_once(':') {
        let week = week.parse::<u32>().map_err(|_| RecordErrorKind::BadCell {
            raw: raw.to_string(),
            reason: format!("week offset `{week}` is not a non-negative integer"),
        })?;
        let weekday = weekday.parse::<u8>().map_err(|_| RecordErrorKind::BadCell {
            raw: raw.to_string(),
            reason: format!("weekday offset `{weekday}` is not an integer"),
        })?;
        check_weekday(weekday).map_err(|err| RecordErrorKind::BadCell {
            raw: raw.to_string(),
            reason: err.to_string(),
        })?;
        return Ok(RecordKey::Cell { week, weekday });
    }

    parse_date(raw)
        .map(RecordKey::Date)
        .ok_or_else(|| RecordErrorKind::BadDate {
            raw: raw.to_string(),
        })
}

/// Parse `YYYY-MM-DD` or the editor's `DD/MM/YYYY`.
pub fn parse_date(raw: &str) -> Option<Date> {
    let raw = raw.trim();
    if raw.contains('/') {
        let mut parts = raw.split('/');
        let day = parts.next()?.parse::<u8>().ok()?;
        let month = parts.next()?.parse::<u8>().ok()?;
        let year = parts.next()?.parse::<i32>().ok()?;
        if parts.next().is_some() {
            return None;
        }
        let month = Month::try_from(month).ok()?;
        return Date::from_calendar_date(year, month, day).ok();
    }
    Date::parse(raw, format_description!("[year]-[month]-[day]")).ok()
}

/// Render a date the way plan files store it.
pub fn format_date(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| date.to_string())
}

/// Serialize records into plan file text (the editor's side of the contract).
pub fn write_plan<I>(records: I) -> String
where
    I: IntoIterator<Item = (RecordKey, Intensity)>,
{
    let mut out = String::new();
    for (key, intensity) in records {
        out.push_str(&format!("{key} {intensity}\n"));
    }
    out
}
