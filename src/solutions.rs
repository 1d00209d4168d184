//! Pull-based iteration over a query's solutions
//!
//! `SolutionIterator` is a thin adapter: every call goes straight to the
//! wrapped query, nothing is buffered, and an exhausted iterator cannot be
//! restarted. Open a new query to enumerate again.

use facade_term::{Bindings, Query, Term};

use crate::error::QueryError;

/// External iterator over the binding sets of one query
pub struct SolutionIterator<Q: Query> {
    query: Q,
    faulted: bool,
}

impl<Q: Query> SolutionIterator<Q> {
    pub fn new(query: Q) -> Self {
        Self {
            query,
            faulted: false,
        }
    }

    /// Whether another solution is available. Does not advance.
    pub fn has_next(&self) -> bool {
        self.query.has_more_solutions()
    }

    /// Advance one solution and return its bound values in variable order.
    pub fn next_solution(&mut self) -> Result<Vec<Term>, QueryError> {
        self.next_bindings().map(Bindings::into_values)
    }

    /// Advance one solution and return its bindings with variable names.
    pub fn next_bindings(&mut self) -> Result<Bindings, QueryError> {
        if !self.has_next() {
            return Err(QueryError::Exhausted);
        }
        self.query.next_variables_solution().map_err(|e| {
            self.faulted = true;
            QueryError::Engine(e)
        })
    }

    /// Advance one solution without materializing its bindings.
    ///
    /// Past exhaustion this is a no-op only for queries that tolerate
    /// overrun; otherwise it fails with `Exhausted`.
    pub fn skip_solution(&mut self) -> Result<(), QueryError> {
        if !self.has_next() && !self.query.tolerates_overrun() {
            return Err(QueryError::Exhausted);
        }
        self.query.next_solution().map_err(|e| {
            self.faulted = true;
            QueryError::Engine(e)
        })
    }

    /// Give the query back to the caller.
    pub fn into_inner(self) -> Q {
        self.query
    }
}

impl<Q: Query> Iterator for SolutionIterator<Q> {
    type Item = Result<Vec<Term>, QueryError>;

    /// Yields `None` once the query is exhausted, and after the first fault.
    fn next(&mut self) -> Option<Self::Item> {
        if self.faulted || !self.has_next() {
            return None;
        }
        Some(self.next_solution())
    }
}
