//! `SetVariable`: write a value through the scoped writer.

use cmdkit_types::error::CommandError;
use cmdkit_types::value::{Value, ValueType};
use futures_util::future::BoxFuture;

use super::{WRITABLE_SCOPES, scope_parameter};
use crate::command::context::ExecutionContext;
use crate::operation::{BoxOperation, Operation, OperationState, ParameterSpec, Parameters};

/// Writes `value` to the variable at `name`.
///
/// `name` may be a bare name or `name[key]` for one element of a keyed list.
/// With `literal`, the value is stored unresolved and marked no-resolve, so
/// later reads return its `{{ }}` markers as written.
#[derive(Debug)]
pub struct SetVariable {
    state: OperationState,
}

impl SetVariable {
    pub const NAME: &'static str = "SetVariable";

    pub fn new() -> Self {
        let parameters = Parameters::new([
            ParameterSpec::new("name")
                .description("Variable path: 'name' or 'name[key]'")
                .kind(ValueType::Text)
                .required(),
            ParameterSpec::new("value")
                .description("Value to store")
                .verbatim(),
            ParameterSpec::new("scope")
                .description("Scope to write to")
                .enum_values(WRITABLE_SCOPES)
                .default_value("Command"),
            ParameterSpec::new("source")
                .description("Owning source id; defaults to the current owner")
                .kind(ValueType::Text),
            ParameterSpec::new("literal")
                .description("Store the value without resolving it")
                .kind(ValueType::Bool)
                .default_value(false),
        ]);
        Self {
            state: OperationState::new(Self::NAME, parameters),
        }
    }

    pub fn boxed() -> BoxOperation {
        Box::new(Self::new())
    }
}

impl Default for SetVariable {
    fn default() -> Self {
        Self::new()
    }
}

impl Operation for SetVariable {
    fn state(&self) -> &OperationState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut OperationState {
        &mut self.state
    }

    fn run<'a>(
        &'a mut self,
        ctx: &'a mut ExecutionContext,
    ) -> BoxFuture<'a, Result<(), CommandError>> {
        Box::pin(async move {
            let parameters = &self.state.parameters;
            let name = parameters.text("name").unwrap_or_default();
            let scope = scope_parameter(parameters, "scope")?;
            let source = parameters.text("source").map(str::to_string);
            let raw = parameters.value("value");

            let value = if parameters.value("literal").as_bool().unwrap_or(false) {
                Value::verbatim(raw.clone())
            } else {
                ctx.resolve(raw, false)?
            };

            ctx.write(scope, name, value, source)
        })
    }
}
