//! The operation contract.
//!
//! An operation is one executable step of a command. Concrete operations
//! declare their parameters when constructed; the factory fills in the
//! rest of [`OperationState`] from a document, and the engine prepares the
//! parameters and calls [`Operation::run`].
//!
//! - `parameter` -- parameter declaration, binding, and validation
//! - `catalogue` -- name → constructor registry
//! - `factory` -- builds operations from documents

pub mod catalogue;
pub mod factory;
pub mod parameter;

use std::fmt;

use cmdkit_types::error::CommandError;
use cmdkit_types::value::Value;
use futures_util::future::BoxFuture;

use crate::command::condition::Conditions;
use crate::command::context::ExecutionContext;

pub use catalogue::OperationCatalogue;
pub use factory::OperationFactory;
pub use parameter::{Parameter, ParameterSpec, Parameters};

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// An executable step.
///
/// `run` returns a boxed future so aggregate operations can re-enter the
/// engine with their nested list.
pub trait Operation: Send {
    fn state(&self) -> &OperationState;

    fn state_mut(&mut self) -> &mut OperationState;

    /// Whether the operation owns a nested operation list.
    fn is_aggregate(&self) -> bool {
        false
    }

    /// Do the work. Parameters have already been prepared.
    fn run<'a>(
        &'a mut self,
        ctx: &'a mut ExecutionContext,
    ) -> BoxFuture<'a, Result<(), CommandError>>;

    fn name(&self) -> &str {
        &self.state().name
    }

    fn parameters(&self) -> &Parameters {
        &self.state().parameters
    }
}

/// Type-erased operation, as produced by the catalogue.
pub type BoxOperation = Box<dyn Operation>;

impl fmt::Debug for dyn Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name())
            .field("aggregate", &self.is_aggregate())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// OperationState
// ---------------------------------------------------------------------------

/// The document-driven state every operation carries.
#[derive(Debug, Default)]
pub struct OperationState {
    /// Declared operation name, as registered in the catalogue.
    pub name: String,
    /// Unresolved `enabled` flag; `None` means enabled.
    pub enabled: Option<Value>,
    pub comment: Option<String>,
    pub conditions: Conditions,
    pub parameters: Parameters,
    /// Nested list, for aggregates.
    pub nested: NestedOperations,
}

impl OperationState {
    pub fn new(name: impl Into<String>, parameters: Parameters) -> Self {
        Self {
            name: name.into(),
            parameters,
            ..Self::default()
        }
    }
}

/// An aggregate's nested operation documents.
///
/// The factory checks the literal documents up front so malformed ones fail
/// before anything runs. References (`"{{ steps }}"`) are followed on every
/// pass, so they may name variables written earlier in the run or by the
/// enclosing loop. Each pass builds a fresh list; no operation state leaks
/// between loop iterations.
#[derive(Default)]
pub struct NestedOperations {
    documents: Vec<Value>,
}

impl NestedOperations {
    pub fn new(documents: Vec<Value>) -> Self {
        Self { documents }
    }

    pub fn documents(&self) -> &[Value] {
        &self.documents
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// The operations for the next pass, built against the current variables.
    pub fn build(&self, factory: &OperationFactory<'_>) -> Result<Vec<BoxOperation>, CommandError> {
        factory.build_list(&self.documents)
    }
}

impl fmt::Debug for NestedOperations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NestedOperations")
            .field("documents", &self.documents.len())
            .finish()
    }
}
