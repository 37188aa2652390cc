//! Shared domain types for cmdkit.
//!
//! This crate contains the types every other cmdkit crate speaks:
//! the variant [`value::Value`], the addressing syntax in [`path`],
//! scoped [`variable::Variable`]s, the error types and configuration.
//!
//! Zero infrastructure dependencies -- only serde, chrono, indexmap, thiserror.

pub mod codec;
pub mod config;
pub mod error;
pub mod path;
pub mod value;
pub mod variable;
