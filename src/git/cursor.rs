//! Execution cursor, derived from the repository's own history.
//!
//! The log is the only record of progress: commit `j` on HEAD (oldest first) must be
//! plan directive `j`, matched by its forged author and committer time.

use git2::{ErrorCode, Oid, Repository, Sort};
use time::Date;

use super::error::ConsistencyError;
use crate::core::CommitPlan;

/// One commit on HEAD, oldest first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    pub oid: Oid,
    pub parents: usize,
    pub author_time: i64,
    pub committer_time: i64,
}

/// How far the plan has been applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecutionCursor {
    /// Number of plan directives already committed; the next one to apply.
    pub position: usize,
    pub head: Option<Oid>,
    /// Date of the last committed directive.
    pub last_applied: Option<Date>,
}

impl ExecutionCursor {
    pub fn is_complete(&self, plan: &CommitPlan) -> bool {
        self.position == plan.len()
    }
}

/// HEAD's first-parent history, oldest first. Empty for an unborn branch.
pub fn read_history(repo: &Repository) -> Result<Vec<HistoryEntry>, ConsistencyError> {
    let head = match repo.head() {
        Ok(head) => head,
        Err(err) if err.code() == ErrorCode::UnbornBranch || err.code() == ErrorCode::NotFound => {
            return Ok(Vec::new());
        }
        Err(err) => return Err(ConsistencyError::ReadLog(err)),
    };
    let Some(tip) = head.target() else {
        return Ok(Vec::new());
    };

    let mut walk = repo.revwalk().map_err(ConsistencyError::ReadLog)?;
    walk.set_sorting(Sort::TOPOLOGICAL | Sort::REVERSE)
        .map_err(ConsistencyError::ReadLog)?;
    walk.simplify_first_parent()
        .map_err(ConsistencyError::ReadLog)?;
    walk.push(tip).map_err(ConsistencyError::ReadLog)?;

    let mut entries = Vec::new();
    for oid in walk {
        let oid = oid.map_err(ConsistencyError::ReadLog)?;
        let commit = repo.find_commit(oid).map_err(ConsistencyError::ReadLog)?;
        entries.push(HistoryEntry {
            oid,
            parents: commit.parent_count(),
            author_time: commit.author().when().seconds(),
            committer_time: commit.committer().when().seconds(),
        });
    }
    Ok(entries)
}

/// Match the history against the plan and find where to resume.
pub fn derive_cursor(
    repo: &Repository,
    plan: &CommitPlan,
) -> Result<ExecutionCursor, ConsistencyError> {
    let history = read_history(repo)?;
    match_history(&history, plan)
}

pub(crate) fn match_history(
    history: &[HistoryEntry],
    plan: &CommitPlan,
) -> Result<ExecutionCursor, ConsistencyError> {
    if history.len() > plan.len() {
        return Err(ConsistencyError::ExtraCommits {
            found: history.len(),
            planned: plan.len(),
        });
    }

    for (position, (entry, directive)) in history.iter().zip(plan.iter()).enumerate() {
        if entry.parents > 1 {
            return Err(ConsistencyError::MergeCommit {
                position,
                oid: entry.oid,
            });
        }
        if entry.author_time != entry.committer_time {
            return Err(ConsistencyError::SplitTimestamps {
                position,
                oid: entry.oid,
                author: entry.author_time,
                committer: entry.committer_time,
            });
        }
        let expected = directive.unix_seconds();
        if entry.author_time != expected {
            return Err(ConsistencyError::TimestampMismatch {
                position,
                oid: entry.oid,
                found: entry.author_time,
                expected,
            });
        }
    }

    let position = history.len();
    Ok(ExecutionCursor {
        position,
        head: history.last().map(|entry| entry.oid),
        last_applied: position
            .checked_sub(1)
            .and_then(|last| plan.get(last))
            .map(|directive| directive.date),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DatedIntensity, Intensity, IntensityScale, PlanBuilder};
    use time::UtcOffset;
    use time::macros::date;

    fn plan() -> CommitPlan {
        PlanBuilder::new(IntensityScale::default(), UtcOffset::UTC)
            .build(&[
                DatedIntensity {
                    date: date!(2024 - 03 - 04),
                    intensity: Intensity::new(1).unwrap(),
                    line: 1,
                },
                DatedIntensity {
                    date: date!(2024 - 03 - 05),
                    intensity: Intensity::new(2).unwrap(),
                    line: 2,
                },
            ])
            .expect("build")
    }

    fn entry(seed: u8, seconds: i64) -> HistoryEntry {
        HistoryEntry {
            oid: Oid::from_bytes(&[seed; 20]).expect("oid"),
            parents: usize::from(seed > 0),
            author_time: seconds,
            committer_time: seconds,
        }
    }

    #[test]
    fn empty_history_starts_at_zero() {
        let cursor = match_history(&[], &plan()).expect("cursor");
        assert_eq!(cursor.position, 0);
        assert_eq!(cursor.head, None);
        assert_eq!(cursor.last_applied, None);
    }

    #[test]
    fn prefix_history_resumes_after_last_match() {
        let plan = plan();
        let history: Vec<_> = plan
            .iter()
            .take(2)
            .enumerate()
            .map(|(idx, d)| entry(idx as u8, d.unix_seconds()))
            .collect();
        let cursor = match_history(&history, &plan).expect("cursor");
        assert_eq!(cursor.position, 2);
        assert_eq!(cursor.last_applied, Some(date!(2024 - 03 - 05)));
        assert!(!cursor.is_complete(&plan));
    }

    #[test]
    fn foreign_timestamp_is_inconsistent() {
        let plan = plan();
        let first = plan.get(0).expect("first").unix_seconds();
        let history = vec![entry(0, first), entry(1, 42)];
        let err = match_history(&history, &plan).unwrap_err();
        assert!(matches!(
            err,
            ConsistencyError::TimestampMismatch {
                position: 1,
                found: 42,
                ..
            }
        ));
    }

    #[test]
    fn longer_history_is_inconsistent() {
        let plan = plan();
        let mut history: Vec<_> = plan
            .iter()
            .enumerate()
            .map(|(idx, d)| entry(idx as u8, d.unix_seconds()))
            .collect();
        history.push(entry(9, i64::MAX));
        assert!(matches!(
            match_history(&history, &plan),
            Err(ConsistencyError::ExtraCommits {
                found: 5,
                planned: 4
            })
        ));
    }

    #[test]
    fn split_author_and_committer_time_is_inconsistent() {
        let plan = plan();
        let mut first = entry(0, plan.get(0).expect("first").unix_seconds());
        first.committer_time += 1;
        assert!(matches!(
            match_history(&[first], &plan),
            Err(ConsistencyError::SplitTimestamps { position: 0, .. })
        ));
    }
}
