#![forbid(unsafe_code)]

//! Paint a contribution calendar by synthesizing backdated commits.
//!
//! A plan (intensity per calendar cell) is validated and resolved against an anchor
//! date, expanded into commit directives with forged timestamps, applied to a local
//! repository, and pushed. Progress lives in the repository log, so an interrupted
//! run resumes where it stopped.

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod git;
pub mod paths;
pub mod pipeline;
pub mod telemetry;

pub use error::{Effect, Error, Stage, Transience};
pub type Result<T> = std::result::Result<T, Error>;

pub use crate::core::{
    AnchorDate, CommitDirective, CommitPlan, GridDesign, Intensity, IntensityScale, PlanSummary,
    WeekStart,
};
pub use crate::pipeline::{PlanSettings, RunOutcome, RunSettings, StatusReport, Synthesizer};
