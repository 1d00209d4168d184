//! Single-shot exhaustive solver
//!
//! A `GoalTask` pairs a goal with the provider that will mint its engine.
//! Running it consumes the task: one fresh engine, one query, drained to
//! exhaustion. Faults are returned to the caller as-is.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use facade_term::{Provider, Term};

use crate::error::QueryError;
use crate::solutions::SolutionIterator;

/// Every solution of a goal, each as its bound values in variable order
pub type Solutions = Vec<Vec<Term>>;

/// Shared cancellation flag, checked at solution boundaries
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// A goal waiting to be solved on its own engine
pub struct GoalTask {
    provider: Arc<dyn Provider>,
    goals: Vec<Term>,
    solution_limit: Option<usize>,
}

impl GoalTask {
    /// Create a task for the conjunction of `goals`.
    pub fn new(provider: Arc<dyn Provider>, goals: Vec<Term>) -> Result<Self, QueryError> {
        if goals.is_empty() {
            return Err(QueryError::EmptyGoal);
        }
        Ok(Self {
            provider,
            goals,
            solution_limit: None,
        })
    }

    /// Abort with `LimitExceeded` once more than `limit` solutions turn up.
    ///
    /// An engine fault in place of the extra solution is reported as the fault.
    pub fn with_solution_limit(mut self, limit: usize) -> Self {
        self.solution_limit = Some(limit);
        self
    }

    pub fn goals(&self) -> &[Term] {
        &self.goals
    }

    pub fn solution_limit(&self) -> Option<usize> {
        self.solution_limit
    }

    /// Solve the goal to exhaustion on a fresh engine.
    pub fn run(self) -> Result<Solutions, QueryError> {
        self.run_until(&CancelToken::new())
    }

    /// Like [`GoalTask::run`], stopping with `Cancelled` once `token` fires.
    ///
    /// The token is checked before the engine is created and before each
    /// solution. A query whose last solution has already been collected
    /// completes normally.
    pub fn run_until(self, token: &CancelToken) -> Result<Solutions, QueryError> {
        if token.is_cancelled() {
            return Err(QueryError::Cancelled);
        }

        let mut engine = self.provider.new_engine()?;
        tracing::debug!(goals = self.goals.len(), "engine created");

        let query = engine.query(&self.goals)?;
        let mut solutions = SolutionIterator::new(query);
        let mut buffer = Solutions::new();

        while solutions.has_next() {
            if token.is_cancelled() {
                tracing::debug!(collected = buffer.len(), "drain interrupted");
                return Err(QueryError::Cancelled);
            }
            let solution = solutions.next_solution()?;
            if let Some(limit) = self.solution_limit {
                if buffer.len() == limit {
                    return Err(QueryError::LimitExceeded(limit));
                }
            }
            buffer.push(solution);
        }

        tracing::debug!(solutions = buffer.len(), "query exhausted");
        Ok(buffer)
    }
}

impl fmt::Debug for GoalTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoalTask")
            .field("goals", &self.goals)
            .field("solution_limit", &self.solution_limit)
            .finish_non_exhaustive()
    }
}
