//! Git execution and publish error types.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use time::Date;

use crate::error::{Effect, Transience};

fn fmt_last_applied(date: &Option<Date>) -> String {
    match date {
        Some(date) => date.to_string(),
        None => "none".to_string(),
    }
}

/// A directive could not be applied. Commits made before it are kept.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ExecutionError {
    #[error("failed to open repository at {0}: {1}")]
    OpenRepo(PathBuf, #[source] git2::Error),

    #[error("failed to initialize repository at {0}: {1}")]
    InitRepo(PathBuf, #[source] git2::Error),

    #[error("{0} exists and is not a git working tree")]
    NotARepository(PathBuf),

    #[error("repository HEAD is on {found}, expected {expected}")]
    BranchMismatch { expected: String, found: String },

    #[error("failed to read {path} from HEAD: {source}")]
    ReadContent {
        path: String,
        #[source]
        source: git2::Error,
    },

    #[error(
        "failed to write content for directive #{position} ({date}): {source}; resume at #{position}, last applied date {}",
        fmt_last_applied(.last_applied)
    )]
    Workdir {
        position: usize,
        date: Date,
        last_applied: Option<Date>,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "failed to commit directive #{position} ({date}): {source}; resume at #{position}, last applied date {}",
        fmt_last_applied(.last_applied)
    )]
    Commit {
        position: usize,
        date: Date,
        last_applied: Option<Date>,
        #[source]
        source: git2::Error,
    },

    #[error(
        "interrupted before directive #{resume_at}; last applied date {}",
        fmt_last_applied(.last_applied)
    )]
    Interrupted {
        resume_at: usize,
        last_applied: Option<Date>,
    },
}

impl ExecutionError {
    /// Plan position a re-run will start from, when known.
    pub fn resume_at(&self) -> Option<usize> {
        match self {
            ExecutionError::Workdir { position, .. } | ExecutionError::Commit { position, .. } => {
                Some(*position)
            }
            ExecutionError::Interrupted { resume_at, .. } => Some(*resume_at),
            _ => None,
        }
    }

    pub fn transience(&self) -> Transience {
        match self {
            ExecutionError::Interrupted { .. } => Transience::Retryable,
            ExecutionError::NotARepository(_) | ExecutionError::BranchMismatch { .. } => {
                Transience::Permanent
            }
            _ => Transience::Unknown,
        }
    }

    pub fn effect(&self) -> Effect {
        match self {
            ExecutionError::Workdir { last_applied, .. }
            | ExecutionError::Commit { last_applied, .. }
            | ExecutionError::Interrupted { last_applied, .. } => {
                if last_applied.is_some() {
                    Effect::Some
                } else {
                    Effect::Unknown
                }
            }
            ExecutionError::InitRepo(_, _) => Effect::Unknown,
            _ => Effect::None,
        }
    }
}

/// Repository history disagrees with the plan. Never resolved automatically.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConsistencyError {
    #[error("failed to read repository history: {0}")]
    ReadLog(#[source] git2::Error),

    #[error(
        "commit {oid} at position #{position} is dated {found} but the plan expects {expected}"
    )]
    TimestampMismatch {
        position: usize,
        oid: git2::Oid,
        found: i64,
        expected: i64,
    },

    #[error("commit {oid} at position #{position} has author time {author} but committer time {committer}")]
    SplitTimestamps {
        position: usize,
        oid: git2::Oid,
        author: i64,
        committer: i64,
    },

    #[error("repository has {found} commits but the plan only has {planned}")]
    ExtraCommits { found: usize, planned: usize },

    #[error("commit {oid} at position #{position} is a merge commit")]
    MergeCommit { position: usize, oid: git2::Oid },
}

impl ConsistencyError {
    pub fn transience(&self) -> Transience {
        match self {
            ConsistencyError::ReadLog(_) => Transience::Unknown,
            _ => Transience::Permanent,
        }
    }

    pub fn effect(&self) -> Effect {
        Effect::None
    }
}

/// One push attempt failed.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PushFailure {
    #[error("network error: {0}")]
    Network(#[source] git2::Error),

    #[error("push timed out after {0:?}")]
    Timeout(Duration),

    #[error("authentication failed: {0}")]
    Auth(#[source] git2::Error),

    #[error("certificate check failed: {0}")]
    Certificate(#[source] git2::Error),

    #[error("push rejected (non-fast-forward)")]
    NonFastForward,

    #[error("push rejected: {message}")]
    Rejected { message: String },

    #[error("git operation failed: {0}")]
    Git(#[source] git2::Error),
}

impl PushFailure {
    /// Classify a libgit2 push error.
    pub fn from_git(err: git2::Error) -> Self {
        use git2::{ErrorClass, ErrorCode};

        let msg = err.message();
        if err.code() == ErrorCode::NotFastForward
            || msg.contains("non-fast-forward")
            || msg.contains("fetch first")
        {
            return PushFailure::NonFastForward;
        }
        match (err.code(), err.class()) {
            (ErrorCode::Auth, _) => PushFailure::Auth(err),
            (ErrorCode::Certificate, _) => PushFailure::Certificate(err),
            (_, ErrorClass::Http) if msg.contains("401") || msg.contains("403") => {
                PushFailure::Auth(err)
            }
            (_, ErrorClass::Net | ErrorClass::Os | ErrorClass::Http | ErrorClass::Ssh) => {
                PushFailure::Network(err)
            }
            _ => PushFailure::Git(err),
        }
    }

    pub fn transience(&self) -> Transience {
        match self {
            PushFailure::Network(_) | PushFailure::Timeout(_) => Transience::Retryable,
            PushFailure::Auth(_)
            | PushFailure::Certificate(_)
            | PushFailure::NonFastForward
            | PushFailure::Rejected { .. } => Transience::Permanent,
            PushFailure::Git(_) => Transience::Unknown,
        }
    }
}

/// Local history could not be published. Local commits are never discarded.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PublishError {
    #[error("local history is incomplete: {applied} of {planned} commits applied")]
    Incomplete { applied: usize, planned: usize },

    #[error("no remote `{0}` configured; set repository.remote_url or pass --remote")]
    NoRemote(String),

    #[error("failed to configure remote `{name}`: {source}")]
    Remote {
        name: String,
        #[source]
        source: git2::Error,
    },

    #[error("push to `{remote}` failed: {source}")]
    Permanent {
        remote: String,
        #[source]
        source: PushFailure,
    },

    #[error("push to `{remote}` failed after {attempts} attempt(s): {source}")]
    Exhausted {
        remote: String,
        attempts: u32,
        #[source]
        source: PushFailure,
    },

    #[error("push to `{remote}` interrupted after {attempts} attempt(s); local history is kept")]
    Interrupted { remote: String, attempts: u32 },
}

impl PublishError {
    pub fn transience(&self) -> Transience {
        match self {
            PublishError::Exhausted { .. } | PublishError::Interrupted { .. } => {
                Transience::Retryable
            }
            PublishError::Permanent { source, .. } => source.transience(),
            PublishError::Remote { .. } => Transience::Unknown,
            PublishError::Incomplete { .. } | PublishError::NoRemote(_) => Transience::Permanent,
        }
    }

    pub fn effect(&self) -> Effect {
        match self {
            PublishError::Incomplete { .. } | PublishError::NoRemote(_) => Effect::None,
            PublishError::Interrupted { attempts: 0, .. } => Effect::None,
            _ => Effect::Unknown,
        }
    }
}
