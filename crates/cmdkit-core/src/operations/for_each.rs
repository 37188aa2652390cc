//! `ForEach`: run a nested operation list once per element.

use cmdkit_types::error::CommandError;
use cmdkit_types::value::ValueType;
use futures_util::future::BoxFuture;

use super::{WRITABLE_SCOPES, scope_parameter};
use crate::command::context::ExecutionContext;
use crate::command::executor::execute_operations;
use crate::operation::{BoxOperation, Operation, OperationState, ParameterSpec, Parameters};

/// Binds `variable` to each element of `list` and runs the nested list.
///
/// A `list` that resolves to anything other than a list is treated as a
/// single element. Every iteration gets freshly built operations.
#[derive(Debug)]
pub struct ForEach {
    state: OperationState,
}

impl ForEach {
    pub const NAME: &'static str = "ForEach";

    pub fn new() -> Self {
        let parameters = Parameters::new([
            ParameterSpec::new("list")
                .description("Elements to iterate over")
                .required(),
            ParameterSpec::new("variable")
                .description("Variable bound to the current element")
                .kind(ValueType::Text)
                .default_value("item"),
            ParameterSpec::new("scope")
                .description("Scope the element variable is written to")
                .enum_values(WRITABLE_SCOPES)
                .default_value("Command"),
        ]);
        Self {
            state: OperationState::new(Self::NAME, parameters),
        }
    }

    pub fn boxed() -> BoxOperation {
        Box::new(Self::new())
    }
}

impl Default for ForEach {
    fn default() -> Self {
        Self::new()
    }
}

impl Operation for ForEach {
    fn state(&self) -> &OperationState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut OperationState {
        &mut self.state
    }

    fn is_aggregate(&self) -> bool {
        true
    }

    fn run<'a>(
        &'a mut self,
        ctx: &'a mut ExecutionContext,
    ) -> BoxFuture<'a, Result<(), CommandError>> {
        Box::pin(async move {
            let parameters = &self.state.parameters;
            let list = parameters.value("list");
            let elements = match list.as_list() {
                Some(items) => items.to_vec(),
                None => vec![list.clone()],
            };
            let variable = parameters.text("variable").unwrap_or("item").to_string();
            let scope = scope_parameter(parameters, "scope")?;

            for (index, element) in elements.into_iter().enumerate() {
                if ctx.is_cancelled() {
                    ctx.stats_mut().cancelled = true;
                    break;
                }
                tracing::debug!(%variable, index, "loop iteration");
                ctx.write(scope, &variable, element, None)?;
                let operations = self.state.nested.build(&ctx.factory())?;
                execute_operations(operations, ctx).await?;
            }
            Ok(())
        })
    }
}
