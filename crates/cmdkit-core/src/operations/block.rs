//! `Block`: run a nested operation list once.

use cmdkit_types::error::CommandError;
use futures_util::future::BoxFuture;

use crate::command::context::ExecutionContext;
use crate::command::executor::execute_operations;
use crate::operation::{BoxOperation, Operation, OperationState, Parameters};

/// Groups operations so they share one `enabled` flag and one set of
/// conditions.
#[derive(Debug)]
pub struct Block {
    state: OperationState,
}

impl Block {
    pub const NAME: &'static str = "Block";

    pub fn new() -> Self {
        Self {
            state: OperationState::new(Self::NAME, Parameters::default()),
        }
    }

    pub fn boxed() -> BoxOperation {
        Box::new(Self::new())
    }
}

impl Default for Block {
    fn default() -> Self {
        Self::new()
    }
}

impl Operation for Block {
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
            let operations = self.state.nested.build(&ctx.factory())?;
            execute_operations(operations, ctx).await
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::operation::OperationCatalogue;
    use crate::variables::VariableStore;
    use cmdkit_types::codec::from_yaml_str;
    use cmdkit_types::config::EngineConfig;
    use cmdkit_types::value::Value;

    #[tokio::test]
    async fn test_block_runs_nested_list() {
        let mut ctx = ExecutionContext::new(
            VariableStore::new(),
            Arc::new(OperationCatalogue::with_builtins()),
            EngineConfig::default(),
        );
        let doc = from_yaml_str(
            r#"
- operation: Block
  operations:
    - operation: SetVariable
      name: a
      value: 1
    - operation: Block
      operations:
        - operation: SetVariable
          name: b
          value: "{{ a }}"
"#,
        )
        .unwrap();
        let operations = ctx.factory().build_list(doc.as_list().unwrap()).unwrap();
        execute_operations(operations, &mut ctx).await.unwrap();

        assert_eq!(ctx.store().lookup("b").unwrap(), Value::Integer(1));
        // Two blocks plus two writes.
        assert_eq!(ctx.stats().executed, 4);
    }

    #[tokio::test]
    async fn test_disabled_block_skips_children() {
        let mut ctx = ExecutionContext::new(
            VariableStore::new(),
            Arc::new(OperationCatalogue::with_builtins()),
            EngineConfig::default(),
        );
        let doc = from_yaml_str(
            r#"
- operation: Block
  enabled: "no"
  operations:
    - operation: SetVariable
      name: a
      value: 1
"#,
        )
        .unwrap();
        let operations = ctx.factory().build_list(doc.as_list().unwrap()).unwrap();
        execute_operations(operations, &mut ctx).await.unwrap();

        assert!(ctx.store().lookup("a").unwrap().is_absent());
        assert_eq!(ctx.stats().skipped, 1);
    }
}
