//! Sequential execution of an operation list.
//!
//! For each operation, in order: stop if cancellation was requested, skip it
//! if `enabled` resolves false-ish or a condition fails, otherwise prepare
//! its parameters and await its run. The first error ends the list; writes
//! made before it stay in the store.

use cmdkit_types::error::CommandError;

use super::context::ExecutionContext;
use crate::operation::{BoxOperation, Operation};

/// Why an operation did not run.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Skip {
    Disabled,
    Condition(String),
}

/// Run `operations` in order against `ctx`.
///
/// Aggregate operations call back into this function with their nested list.
pub async fn execute_operations(
    operations: Vec<BoxOperation>,
    ctx: &mut ExecutionContext,
) -> Result<(), CommandError> {
    for mut operation in operations {
        if ctx.is_cancelled() {
            if !ctx.stats().cancelled {
                tracing::info!(operation = %operation.name(), "cancellation requested, stopping");
            }
            ctx.stats_mut().cancelled = true;
            return Ok(());
        }

        if let Some(skip) = gate(operation.as_ref(), ctx)? {
            match &skip {
                Skip::Disabled => {
                    tracing::debug!(operation = %operation.name(), "operation disabled, skipping");
                }
                Skip::Condition(predicate) => {
                    tracing::debug!(
                        operation = %operation.name(),
                        %predicate,
                        "condition not met, skipping"
                    );
                }
            }
            ctx.stats_mut().skipped += 1;
            continue;
        }

        let name = operation.name().to_string();
        {
            let resolver = ctx.resolver();
            operation
                .state_mut()
                .parameters
                .prepare(&name, &resolver)?;
        }

        tracing::debug!(
            operation = %name,
            comment = operation.state().comment.as_deref().unwrap_or_default(),
            "running operation"
        );
        operation.run(ctx).await.inspect_err(|err| {
            tracing::debug!(operation = %name, error = %err, "operation failed");
        })?;
        ctx.stats_mut().executed += 1;
    }
    Ok(())
}

/// Decide whether an operation is skipped.
fn gate(operation: &dyn Operation, ctx: &ExecutionContext) -> Result<Option<Skip>, CommandError> {
    let state = operation.state();
    let resolver = ctx.resolver();

    if let Some(enabled) = &state.enabled {
        if resolver.resolve(enabled, false)?.is_falsy() {
            return Ok(Some(Skip::Disabled));
        }
    }

    Ok(state
        .conditions
        .first_failing(&resolver)?
        .map(|predicate| Skip::Condition(predicate.to_string())))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::operation::OperationCatalogue;
    use crate::variables::VariableStore;
    use cmdkit_types::codec::from_yaml_str;
    use cmdkit_types::config::EngineConfig;
    use cmdkit_types::value::Value;
    use cmdkit_types::variable::Scope;

    fn context() -> ExecutionContext {
        ExecutionContext::new(
            VariableStore::new(),
            Arc::new(OperationCatalogue::with_builtins()),
            EngineConfig::default(),
        )
    }

    async fn run(ctx: &mut ExecutionContext, yaml: &str) -> Result<(), CommandError> {
        let documents = from_yaml_str(yaml).unwrap();
        let operations = ctx
            .factory()
            .build_list(documents.as_list().unwrap())?;
        execute_operations(operations, ctx).await
    }

    #[tokio::test]
    async fn test_operations_run_in_order() {
        let mut ctx = context();
        run(
            &mut ctx,
            r#"
- operation: SetVariable
  name: a
  value: first
- operation: SetVariable
  name: b
  value: "{{ a }} then second"
"#,
        )
        .await
        .unwrap();

        assert_eq!(ctx.store().lookup("b").unwrap(), Value::text("first then second"));
        assert_eq!(ctx.stats().executed, 2);
    }

    #[tokio::test]
    async fn test_disabled_operation_is_skipped() {
        let mut ctx = context();
        ctx.write(Scope::Command, "flag", Value::text("off"), None).unwrap();
        run(
            &mut ctx,
            r#"
- operation: SetVariable
  enabled: false
  name: a
  value: 1
- operation: SetVariable
  enabled: "{{ flag }}"
  name: b
  value: 2
"#,
        )
        .await
        .unwrap();

        assert!(ctx.store().lookup("a").unwrap().is_absent());
        assert!(ctx.store().lookup("b").unwrap().is_absent());
        assert_eq!(ctx.stats().skipped, 2);
        assert_eq!(ctx.stats().executed, 0);
    }

    #[tokio::test]
    async fn test_failing_condition_skips_without_validating() {
        let mut ctx = context();
        // `name` is required but unset; a skipped operation is never prepared.
        run(
            &mut ctx,
            r#"
- operation: SetVariable
  conditions:
    IsNotNull: "{{ token }}"
  value: 1
"#,
        )
        .await
        .unwrap();
        assert_eq!(ctx.stats().skipped, 1);
    }

    #[tokio::test]
    async fn test_first_error_stops_the_list() {
        let mut ctx = context();
        let err = run(
            &mut ctx,
            r#"
- operation: SetVariable
  name: before
  value: 1
- operation: SetVariable
  value: missing name
- operation: SetVariable
  name: after
  value: 3
"#,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CommandError::Validation(_)), "got: {err:?}");
        // Writes made before the failure stay.
        assert_eq!(ctx.store().lookup("before").unwrap(), Value::Integer(1));
        assert!(ctx.store().lookup("after").unwrap().is_absent());
    }

    #[tokio::test]
    async fn test_cancellation_stops_before_next_operation() {
        let mut ctx = context();
        ctx.cancel_token().cancel();
        run(
            &mut ctx,
            r#"
- operation: SetVariable
  name: a
  value: 1
"#,
        )
        .await
        .unwrap();

        assert!(ctx.store().lookup("a").unwrap().is_absent());
        assert!(ctx.stats().cancelled);
        assert_eq!(ctx.stats().executed, 0);
    }
}
