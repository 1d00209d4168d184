//! Term model and collaborator interfaces for logic engines.
//!
//! Engines plug into `prolog-facade` by implementing [`Provider`],
//! [`Engine`] and [`Query`]; terms and bindings cross the boundary as
//! [`Term`] and [`Bindings`].

mod bindings;
mod engine;
mod term;

pub use bindings::Bindings;
pub use engine::{Engine, Provider, Query};
pub use term::{goal_variables, Indicator, Term};
