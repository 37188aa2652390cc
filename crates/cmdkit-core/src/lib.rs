//! Command engine core for cmdkit.
//!
//! This crate owns the semantics: the layered variable store and its
//! resolver/writer, operations and their parameters, the operation factory,
//! and the execution engine. Storage is reached only through the
//! [`repository::VariableRepository`] port; no filesystem or network IO
//! happens here.

pub mod command;
pub mod operation;
pub mod operations;
pub mod repository;
pub mod variables;
