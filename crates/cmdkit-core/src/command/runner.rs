//! Running a whole command document.
//!
//! A command document names its operations and, optionally, argument
//! defaults:
//!
//! ```yaml
//! name: deploy
//! description: Push the current build
//! arguments:
//!   target: staging
//! operations:
//!   - operation: Log
//!     message: "deploying to {{ target }}"
//! ```
//!
//! A bare list of operations is accepted as well. Arguments live in the
//! Command layer, which is emptied before and after every run.

use std::time::Instant;

use chrono::{DateTime, Utc};
use cmdkit_types::error::CommandError;
use cmdkit_types::value::{Map, Value};
use cmdkit_types::variable::Scope;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use super::context::{ExecutionContext, RunStats};
use super::executor::execute_operations;

// ---------------------------------------------------------------------------
// CommandDocument
// ---------------------------------------------------------------------------

/// A parsed command document.
#[derive(Debug, Clone, Default)]
pub struct CommandDocument {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Default argument values, written to the Command layer before the run.
    pub arguments: Map,
    /// Operation documents, built when the run starts.
    pub operations: Vec<Value>,
}

impl CommandDocument {
    pub fn from_value(value: &Value) -> Result<Self, CommandError> {
        if let Some(items) = value.as_list() {
            return Ok(Self {
                operations: items.to_vec(),
                ..Self::default()
            });
        }

        let Some(map) = value.as_object() else {
            return Err(CommandError::structural(format!(
                "a command document must be an object or a list of operations, got {}",
                value.value_type()
            )));
        };

        let mut document = Self::default();
        let mut has_operations = false;
        for (key, item) in map.iter() {
            match key.to_ascii_lowercase().as_str() {
                "name" => document.name = item.as_str().map(str::to_string),
                "description" => document.description = item.as_str().map(str::to_string),
                "arguments" => match item.peel() {
                    Value::Object(arguments) => document.arguments = (**arguments).clone(),
                    Value::Absent => {}
                    other => {
                        return Err(CommandError::structural(format!(
                            "'arguments' must be an object, got {}",
                            other.value_type()
                        )));
                    }
                },
                "operations" => {
                    let Some(items) = item.as_list() else {
                        return Err(CommandError::structural(format!(
                            "'operations' must be a list, got {}",
                            item.value_type()
                        )));
                    };
                    document.operations = items.to_vec();
                    has_operations = true;
                }
                _ => {
                    return Err(CommandError::structural(format!(
                        "unknown command property '{key}'"
                    )));
                }
            }
        }

        if !has_operations {
            return Err(CommandError::structural(
                "command document has no 'operations' list",
            ));
        }
        Ok(document)
    }
}

// ---------------------------------------------------------------------------
// RunReport
// ---------------------------------------------------------------------------

/// Outcome of a completed (or cancelled) command run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub command: Option<String>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub executed: usize,
    pub skipped: usize,
    pub cancelled: bool,
}

// ---------------------------------------------------------------------------
// run_command
// ---------------------------------------------------------------------------

/// Run a command document.
///
/// Argument defaults from the document are written first, then `arguments`
/// from the caller, all at Command scope. The Command layer is cleared
/// again when the run ends, whether it succeeded or not.
pub async fn run_command(
    document: &CommandDocument,
    arguments: IndexMap<String, Value>,
    ctx: &mut ExecutionContext,
) -> Result<RunReport, CommandError> {
    let run_id = Uuid::now_v7();
    let started_at = Utc::now();
    let timer = Instant::now();
    let span = tracing::info_span!(
        "command",
        %run_id,
        command = document.name.as_deref().unwrap_or("<unnamed>"),
    );

    ctx.store_mut().clear(Scope::Command);
    *ctx.stats_mut() = RunStats::default();

    let result = run_inner(document, arguments, ctx).instrument(span.clone()).await;
    ctx.store_mut().clear(Scope::Command);
    result?;

    let stats = ctx.stats();
    let report = RunReport {
        run_id,
        command: document.name.clone(),
        started_at,
        duration_ms: timer.elapsed().as_millis() as u64,
        executed: stats.executed,
        skipped: stats.skipped,
        cancelled: stats.cancelled,
    };
    span.in_scope(|| {
        tracing::info!(
            executed = report.executed,
            skipped = report.skipped,
            cancelled = report.cancelled,
            duration_ms = report.duration_ms,
            "command finished"
        );
    });
    Ok(report)
}

async fn run_inner(
    document: &CommandDocument,
    arguments: IndexMap<String, Value>,
    ctx: &mut ExecutionContext,
) -> Result<(), CommandError> {
    tracing::info!(operations = document.operations.len(), "command started");

    for (key, value) in document.arguments.iter() {
        ctx.write(Scope::Command, key, value.clone(), None)?;
    }
    for (key, value) in arguments {
        ctx.write(Scope::Command, &key, value, None)?;
    }

    let operations = ctx.factory().build_list(&document.operations)?;
    execute_operations(operations, ctx).await
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

    fn context() -> ExecutionContext {
        ExecutionContext::new(
            VariableStore::new(),
            Arc::new(OperationCatalogue::with_builtins()),
            EngineConfig::default(),
        )
    }

    fn document(yaml: &str) -> CommandDocument {
        CommandDocument::from_value(&from_yaml_str(yaml).unwrap()).unwrap()
    }

    #[test]
    fn test_document_forms() {
        let doc = document(
            "name: deploy\ndescription: d\narguments:\n  target: staging\noperations:\n  - operation: Block\n",
        );
        assert_eq!(doc.name.as_deref(), Some("deploy"));
        assert_eq!(doc.arguments.get("target"), Some(&Value::text("staging")));
        assert_eq!(doc.operations.len(), 1);

        let bare = document("- operation: Block\n- operation: Block\n");
        assert_eq!(bare.operations.len(), 2);
        assert!(bare.name.is_none());
    }

    #[test]
    fn test_document_errors() {
        for yaml in ["name: x\n", "operations: 3\n", "operations: []\nextra: 1\n", "42\n"] {
            let err = CommandDocument::from_value(&from_yaml_str(yaml).unwrap()).unwrap_err();
            assert!(matches!(err, CommandError::Structural(_)), "{yaml}: {err:?}");
        }
    }

    #[tokio::test]
    async fn test_arguments_override_defaults_and_are_cleared() {
        let mut ctx = context();
        let doc = document(
            r#"
arguments:
  target: staging
  region: eu
operations:
  - operation: SetVariable
    name: summary
    scope: session
    value: "{{ target }}/{{ region }}"
"#,
        );
        let mut args = IndexMap::new();
        args.insert("target".to_string(), Value::text("prod"));

        let report = run_command(&doc, args, &mut ctx).await.unwrap();

        assert_eq!(report.executed, 1);
        assert!(!report.cancelled);
        assert_eq!(ctx.store().lookup("summary").unwrap(), Value::text("prod/eu"));
        assert_eq!(ctx.store().len(Scope::Command), 0);
    }

    #[tokio::test]
    async fn test_command_layer_cleared_on_failure() {
        let mut ctx = context();
        let doc = document(
            r#"
operations:
  - operation: SetVariable
    name: temp
    value: 1
  - operation: SetVariable
    value: no name
"#,
        );
        let err = run_command(&doc, IndexMap::new(), &mut ctx).await.unwrap_err();
        assert!(matches!(err, CommandError::Validation(_)));
        assert_eq!(ctx.store().len(Scope::Command), 0);
    }

    #[tokio::test]
    async fn test_stats_reset_between_runs() {
        let mut ctx = context();
        let doc = document("- operation: Log\n  message: hi\n");
        run_command(&doc, IndexMap::new(), &mut ctx).await.unwrap();
        let second = run_command(&doc, IndexMap::new(), &mut ctx).await.unwrap();
        assert_eq!(second.executed, 1);
        assert_ne!(second.run_id, Uuid::nil());
    }
}
