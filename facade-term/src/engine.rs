//! Collaborator traits implemented by logic engines.
//!
//! The facade drives engines only through these three capabilities:
//! a provider that mints isolated engines, an engine that opens queries,
//! and a query cursor that walks solutions.

use anyhow::Result;

use crate::{Bindings, Term};

/// Stateful cursor over the solutions of one goal.
///
/// Not re-entrant: a query has exactly one owner at a time.
pub trait Query {
    /// Whether at least one more solution (or a pending fault) is ahead.
    ///
    /// Must not move the cursor.
    fn has_more_solutions(&self) -> bool;

    /// Advance one solution, discarding its bindings.
    fn next_solution(&mut self) -> Result<()>;

    /// Advance one solution, returning its bindings.
    fn next_variables_solution(&mut self) -> Result<Bindings>;

    /// Whether advancing an exhausted query is a harmless no-op.
    ///
    /// Engines that fault on overrun keep the default.
    fn tolerates_overrun(&self) -> bool {
        false
    }
}

impl<Q: Query + ?Sized> Query for Box<Q> {
    fn has_more_solutions(&self) -> bool {
        (**self).has_more_solutions()
    }

    fn next_solution(&mut self) -> Result<()> {
        (**self).next_solution()
    }

    fn next_variables_solution(&mut self) -> Result<Bindings> {
        (**self).next_variables_solution()
    }

    fn tolerates_overrun(&self) -> bool {
        (**self).tolerates_overrun()
    }
}

/// One engine instance. Never shared between tasks.
pub trait Engine {
    /// Open a query for the conjunction of `goals`.
    fn query(&mut self, goals: &[Term]) -> Result<Box<dyn Query + '_>>;
}

/// Factory for fresh, mutually isolated engines.
///
/// Shared across worker threads and called concurrently.
pub trait Provider: Send + Sync {
    fn new_engine(&self) -> Result<Box<dyn Engine>>;
}

impl<F> Provider for F
where
    F: Fn() -> Result<Box<dyn Engine>> + Send + Sync,
{
    fn new_engine(&self) -> Result<Box<dyn Engine>> {
        self()
    }
}
