//! The execution engine.
//!
//! - `condition` -- predicates gating an operation
//! - `context` -- the mutable state threaded through a run
//! - `executor` -- walks an operation list
//! - `runner` -- runs a whole command document

pub mod condition;
pub mod context;
pub mod executor;
pub mod runner;

pub use condition::{Conditions, Predicate};
pub use context::{ExecutionContext, RunStats};
pub use executor::execute_operations;
pub use runner::{CommandDocument, RunReport, run_command};
