//! Infrastructure layer for cmdkit.
//!
//! Contains the filesystem implementation of the `VariableRepository` port
//! defined in `cmdkit-core`, command document loading, and the
//! `config.toml` loader.

pub mod config;
pub mod document;
pub mod filesystem;
pub mod storage;
