//! `Log`: emit a message to the diagnostics sink.

use cmdkit_types::error::CommandError;
use futures_util::future::BoxFuture;

use crate::command::context::ExecutionContext;
use crate::operation::{BoxOperation, Operation, OperationState, ParameterSpec, Parameters};

#[derive(Debug)]
pub struct Log {
    state: OperationState,
}

impl Log {
    pub const NAME: &'static str = "Log";

    pub fn new() -> Self {
        let parameters = Parameters::new([
            ParameterSpec::new("message")
                .description("Text to log; non-text values are rendered as JSON")
                .required(),
            ParameterSpec::new("level")
                .description("Log level")
                .enum_values(["trace", "debug", "info", "warn", "error"])
                .default_value("info"),
        ]);
        Self {
            state: OperationState::new(Self::NAME, parameters),
        }
    }

    pub fn boxed() -> BoxOperation {
        Box::new(Self::new())
    }
}

impl Default for Log {
    fn default() -> Self {
        Self::new()
    }
}

impl Operation for Log {
    fn state(&self) -> &OperationState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut OperationState {
        &mut self.state
    }

    fn run<'a>(
        &'a mut self,
        _ctx: &'a mut ExecutionContext,
    ) -> BoxFuture<'a, Result<(), CommandError>> {
        Box::pin(async move {
            let message = self.state.parameters.value("message").to_string();
            match self.state.parameters.text("level").unwrap_or("info") {
                "trace" => tracing::trace!(target: "cmdkit::log", "{message}"),
                "debug" => tracing::debug!(target: "cmdkit::log", "{message}"),
                "warn" => tracing::warn!(target: "cmdkit::log", "{message}"),
                "error" => tracing::error!(target: "cmdkit::log", "{message}"),
                _ => tracing::info!(target: "cmdkit::log", "{message}"),
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::command::executor::execute_operations;
    use crate::operation::OperationCatalogue;
    use crate::variables::VariableStore;
    use cmdkit_types::codec::from_yaml_str;
    use cmdkit_types::config::EngineConfig;

    async fn run(yaml: &str) -> Result<(), CommandError> {
        let mut ctx = ExecutionContext::new(
            VariableStore::new(),
            Arc::new(OperationCatalogue::with_builtins()),
            EngineConfig::default(),
        );
        let doc = from_yaml_str(yaml).unwrap();
        let operations = ctx.factory().build_list(doc.as_list().unwrap())?;
        execute_operations(operations, &mut ctx).await
    }

    #[tokio::test]
    async fn test_log_levels() {
        run("- operation: Log\n  message: hello\n  level: WARN\n").await.unwrap();
        run("- operation: Log\n  message: [1, 2]\n").await.unwrap();
    }

    #[tokio::test]
    async fn test_log_rejects_unknown_level() {
        let err = run("- operation: Log\n  message: hello\n  level: loud\n")
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Validation(_)));
    }

    #[tokio::test]
    async fn test_log_requires_message() {
        let err = run("- operation: Log\n").await.unwrap_err();
        assert!(matches!(err, CommandError::Validation(_)));
    }
}
