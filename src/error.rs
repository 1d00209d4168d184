//! Error taxonomy for query execution.
//!
//! Synchronous entry points (`SolutionIterator`, `GoalTask`) return these
//! directly. `AsyncQueryHandle` records them on the diagnostic channel and
//! hands waiters an empty result instead.

use thiserror::Error;

use crate::diagnostics::FaultKind;

#[derive(Debug, Error)]
pub enum QueryError {
    /// The cursor was advanced past its last solution.
    #[error("no more solutions")]
    Exhausted,

    /// The engine raised an error while opening or solving the query.
    #[error("engine fault: {0:#}")]
    Engine(anyhow::Error),

    /// The task was cancelled before it finished draining the engine.
    #[error("query cancelled")]
    Cancelled,

    /// A goal task was built with no goal terms.
    #[error("goal must contain at least one term")]
    EmptyGoal,

    /// The query produced more solutions than the configured limit.
    #[error("solution limit of {0} exceeded")]
    LimitExceeded(usize),
}

impl QueryError {
    /// Diagnostic category for this error.
    pub fn kind(&self) -> FaultKind {
        match self {
            QueryError::Exhausted => FaultKind::Exhausted,
            QueryError::Engine(_) => FaultKind::Engine,
            QueryError::Cancelled => FaultKind::Cancelled,
            QueryError::EmptyGoal => FaultKind::Goal,
            QueryError::LimitExceeded(_) => FaultKind::Limit,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, QueryError::Cancelled)
    }
}

impl From<anyhow::Error> for QueryError {
    fn from(err: anyhow::Error) -> Self {
        QueryError::Engine(err)
    }
}
