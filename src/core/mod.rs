//! Core domain types for cadence, leaves first:
//! - grid: intensity cells addressed by (week, weekday)
//! - wire: the plan file format
//! - date: anchor verification and cell-to-date resolution
//! - plan: commit directives with forged timestamps
//!
//! Nothing in here touches a repository.

pub mod date;
pub mod error;
pub mod grid;
pub mod plan;
pub mod wire;

pub use date::{AnchorDate, DateMapper, DateMapperOptions, DatedIntensity, WeekStart};
pub use error::{BuildError, RangeError, ValidationError};
pub use grid::{GridCell, GridDesign, Intensity};
pub use plan::{
    CommitDirective, CommitPlan, ContentToken, DaySummary, IntensityScale, PlanBuilder,
    PlanSummary, parse_utc_offset,
};
pub use wire::{PlanParseError, PlanRecord, RecordError, RecordErrorKind, RecordKey, parse_plan};
