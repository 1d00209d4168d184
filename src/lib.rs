//! Engine-agnostic facade for running Prolog queries.
//!
//! Two ways to consume a goal:
//! - lazily, pulling one solution at a time with [`SolutionIterator`]
//! - eagerly, draining every solution with [`GoalTask`], either inline or
//!   on a worker through [`AsyncQueryHandle`]
//!
//! Engines plug in through the `facade-term` traits ([`Provider`],
//! [`Engine`], [`Query`]). [`ScryerProvider`] embeds Scryer Prolog and is
//! what the `plq` binary runs goals on.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod executor;
pub mod handle;
pub mod scryer;
pub mod solutions;
pub mod task;

// Re-export commonly used types
pub use diagnostics::{DiagnosticLog, FaultKind, FaultRecord};
pub use error::QueryError;
pub use executor::{Executor, ExecutorBuilder};
pub use facade_term::{goal_variables, Bindings, Engine, Indicator, Provider, Query, Term};
pub use handle::{AsyncQueryHandle, Outcome, QueryState};
pub use scryer::{KnowledgeBase, ScryerProvider};
pub use solutions::SolutionIterator;
pub use task::{CancelToken, GoalTask, Solutions};
