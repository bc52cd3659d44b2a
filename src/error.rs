use std::fmt;

use thiserror::Error;

use crate::config::ConfigError;
use crate::core::{BuildError, ValidationError};
use crate::git::{ConsistencyError, ExecutionError, PublishError};

/// Whether retrying this operation may succeed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Transience {
    /// Retry will never help without changing inputs/state.
    Permanent,
    /// Retry may help (transient contention/outage).
    Retryable,
    /// Unknown if retry will help.
    Unknown,
}

impl Transience {
    pub fn is_retryable(self) -> bool {
        matches!(self, Transience::Retryable)
    }
}

/// What we know about side effects when an error is returned.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Effect {
    /// Definitely no side effects occurred.
    None,
    /// Side effects definitely occurred (locally or remotely).
    Some,
    /// We don't know if side effects occurred.
    Unknown,
}

impl Effect {
    pub fn as_str(self) -> &'static str {
        match self {
            Effect::None => "none",
            Effect::Some => "some",
            Effect::Unknown => "unknown",
        }
    }
}

/// Pipeline stage an error came from.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Stage {
    Config,
    Validate,
    Build,
    Execute,
    Publish,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Config => "config",
            Stage::Validate => "validate",
            Stage::Build => "build",
            Stage::Execute => "execute",
            Stage::Publish => "publish",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Crate-level convenience error.
///
/// Not a "god error": it is a thin wrapper over the per-stage errors.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Consistency(#[from] ConsistencyError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl Error {
    pub fn stage(&self) -> Stage {
        match self {
            Error::Config(_) => Stage::Config,
            Error::Validation(_) => Stage::Validate,
            Error::Build(_) => Stage::Build,
            Error::Execution(_) | Error::Consistency(_) => Stage::Execute,
            Error::Publish(_) => Stage::Publish,
        }
    }

    pub fn transience(&self) -> Transience {
        match self {
            Error::Config(e) => e.transience(),
            Error::Validation(e) => e.transience(),
            Error::Build(e) => e.transience(),
            Error::Execution(e) => e.transience(),
            Error::Consistency(e) => e.transience(),
            Error::Publish(e) => e.transience(),
        }
    }

    pub fn effect(&self) -> Effect {
        match self {
            Error::Config(e) => e.effect(),
            Error::Validation(e) => e.effect(),
            Error::Build(e) => e.effect(),
            Error::Execution(e) => e.effect(),
            Error::Consistency(e) => e.effect(),
            Error::Publish(e) => e.effect(),
        }
    }

    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) | Error::Validation(_) | Error::Build(_) => 1,
            Error::Execution(ExecutionError::Interrupted { .. })
            | Error::Publish(PublishError::Interrupted { .. }) => 130,
            Error::Execution(_) => 2,
            Error::Consistency(_) => 3,
            Error::Publish(_) => 4,
        }
    }
}
