//! Git integration.
//!
//! Provides:
//! - Executor: applies a commit plan to a local repository with forged timestamps
//! - Execution cursor: resume point derived from the repository log
//! - Publisher: pushes the branch with bounded retry

pub mod cursor;
pub mod error;
pub mod executor;
pub mod publish;

pub use cursor::{ExecutionCursor, HistoryEntry, derive_cursor, read_history};
pub use error::{ConsistencyError, ExecutionError, PublishError, PushFailure};
pub use executor::{AppliedCommit, ExecutionReport, Executor, ExecutorSettings, Identity};
pub use publish::{
    BackoffPolicy, Git2Transport, PublishReport, PublishSettings, Publisher, PushTransport,
    ensure_remote,
};
