//! Built-in operations.
//!
//! - `Block` -- runs a nested list once
//! - `ForEach` -- runs a nested list once per element
//! - `SetVariable` -- writes a variable
//! - `Log` -- emits a diagnostic message

pub mod block;
pub mod for_each;
pub mod log;
pub mod set_variable;

use std::str::FromStr;

use cmdkit_types::error::CommandError;
use cmdkit_types::variable::Scope;

use crate::operation::{OperationCatalogue, Parameters};

pub use block::Block;
pub use for_each::ForEach;
pub use log::Log;
pub use set_variable::SetVariable;

/// Register every built-in operation.
pub fn register_builtins(catalogue: &mut OperationCatalogue) {
    catalogue.register(Block::NAME, Block::boxed);
    catalogue.register(ForEach::NAME, ForEach::boxed);
    catalogue.register(SetVariable::NAME, SetVariable::boxed);
    catalogue.register(Log::NAME, Log::boxed);
}

/// Scopes an operation may write to.
pub(crate) const WRITABLE_SCOPES: [&str; 3] = ["Command", "Session", "Application"];

/// Read a prepared `scope` parameter.
pub(crate) fn scope_parameter(parameters: &Parameters, name: &str) -> Result<Scope, CommandError> {
    let text = parameters.text(name).unwrap_or("Command");
    Scope::from_str(text).map_err(CommandError::validation)
}
