//! Layered variable storage and `{{ }}` resolution.
//!
//! - `store` -- the four scope layers and single-value lookup
//! - `resolver` -- recursive template resolution over value trees
//! - `writer` -- scoped writes with cascade invalidation and keyed-list upserts

pub mod resolver;
pub mod store;
pub mod writer;

pub use resolver::Resolver;
pub use store::VariableStore;
