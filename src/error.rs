//! Sorting errors.

use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::io;

/// Pipeline component an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Config,
    Loader,
    Sampler,
    Planner,
    Splitter,
    Merger,
    Driver,
}

impl Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Component::Config => "config",
            Component::Loader => "loader",
            Component::Sampler => "sampler",
            Component::Planner => "planner",
            Component::Splitter => "splitter",
            Component::Merger => "merger",
            Component::Driver => "driver",
        };
        f.write_str(name)
    }
}

/// Executor failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorErrorKind {
    /// Task panicked while running.
    TaskPanicked,
    /// Handle does not refer to any object in the store.
    MissingObject,
    /// Stored object has a different type than the handle expects.
    TypeMismatch,
    /// Task failure was already reported to another caller.
    AlreadyReported,
}

/// Failure reported by the task executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorError {
    /// Failure kind.
    pub kind: ExecutorErrorKind,
    /// Name of the task (or object) the failure relates to.
    pub task: String,
    /// Human readable details.
    pub reason: String,
}

impl ExecutorError {
    pub fn new(kind: ExecutorErrorKind, task: impl Into<String>, reason: impl Into<String>) -> Self {
        ExecutorError {
            kind,
            task: task.into(),
            reason: reason.into(),
        }
    }
}

impl Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task '{}' failed ({:?}): {}", self.task, self.kind, self.reason)
    }
}

impl Error for ExecutorError {}

/// Sorting error.
#[derive(Debug)]
pub enum SortError {
    /// Input source of a partition could not be read.
    IO {
        partition: usize,
        source_name: String,
        err: io::Error,
    },
    /// Malformed sizes, empty partitions or samples, non-monotonic split points.
    InvalidArgument { component: Component, reason: String },
    /// Task executor failure not recovered by the executor itself.
    ExecutorFailure(ExecutorError),
    /// Workers thread pool initialization error.
    ThreadPoolBuildError(rayon::ThreadPoolBuildError),
}

impl SortError {
    pub fn invalid_argument(component: Component, reason: impl Into<String>) -> Self {
        SortError::InvalidArgument {
            component,
            reason: reason.into(),
        }
    }

    /// Returns `true` if the error is an [`SortError::InvalidArgument`] raised by `component`.
    pub fn is_invalid_argument_of(&self, component: Component) -> bool {
        matches!(self, SortError::InvalidArgument { component: c, .. } if *c == component)
    }
}

impl Error for SortError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self {
            SortError::IO { err, .. } => Some(err),
            SortError::InvalidArgument { .. } => None,
            SortError::ExecutorFailure(err) => Some(err),
            SortError::ThreadPoolBuildError(err) => Some(err),
        }
    }
}

impl Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            SortError::IO {
                partition,
                source_name,
                err,
            } => write!(f, "partition {} source '{}' not readable: {}", partition, source_name, err),
            SortError::InvalidArgument { component, reason } => write!(f, "{}: invalid argument: {}", component, reason),
            SortError::ExecutorFailure(err) => write!(f, "executor failure: {}", err),
            SortError::ThreadPoolBuildError(err) => write!(f, "thread pool initialization failed: {}", err),
        }
    }
}

impl From<ExecutorError> for SortError {
    fn from(err: ExecutorError) -> Self {
        SortError::ExecutorFailure(err)
    }
}
