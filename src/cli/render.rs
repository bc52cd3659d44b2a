//! Human renderer for CLI outputs.
//!
//! Pure formatting; handlers gather the data.

use std::fmt::Write;
use std::path::Path;

use crate::core::PlanSummary;
use crate::git::PublishReport;
use crate::pipeline::{RunOutcome, StatusReport};

const BAR_WIDTH: u32 = 40;

pub fn render_summary(summary: &PlanSummary) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "{} commits on {} dates",
        summary.total_commits, summary.committed_dates
    );
    if let (Some(first), Some(last)) = (&summary.first_date, &summary.last_date) {
        let _ = write!(out, " ({first} .. {last})");
    }
    let widest = summary.days.iter().map(|day| day.commits).max().unwrap_or(1);
    for day in &summary.days {
        let bar = (day.commits * BAR_WIDTH).div_ceil(widest.max(BAR_WIDTH)).max(1);
        let _ = write!(
            out,
            "\n  {}  {:>3}  {}",
            day.date,
            day.commits,
            "#".repeat(bar as usize)
        );
    }
    out
}

pub fn render_outcome(repo: &Path, outcome: &RunOutcome) -> String {
    let execution = &outcome.execution;
    let mut out = render_summary(&outcome.summary);
    let _ = write!(out, "\n\nrepository: {}", repo.display());
    if execution.skipped > 0 {
        let _ = write!(
            out,
            "\nresumed: {} commits already present",
            execution.skipped
        );
    }
    let _ = write!(out, "\ncommitted: {}", execution.applied.len());
    match &outcome.publish {
        Some(report) => {
            let _ = write!(out, "\n{}", render_published(report));
        }
        None => out.push_str("\nnot pushed (push disabled)"),
    }
    out
}

pub fn render_status(status: &StatusReport) -> String {
    let mut out = format!("repository: {}", status.repo_path.display());
    if !status.repo_exists {
        out.push_str(" (not created yet)");
    }
    let _ = write!(out, "\napplied: {} / {}", status.applied, status.planned);
    if let Some(date) = &status.last_applied_date {
        let _ = write!(out, "\nlast applied date: {date}");
    }
    match &status.next_date {
        Some(date) => {
            let _ = write!(out, "\nnext: #{} on {date}", status.applied);
        }
        None if status.complete => out.push_str("\ncomplete; ready to publish"),
        None => {}
    }
    out
}

pub fn render_published(report: &PublishReport) -> String {
    match report.attempts {
        1 => format!("pushed to {}", report.remote),
        n => format!("pushed to {} after {n} attempts", report.remote),
    }
}
