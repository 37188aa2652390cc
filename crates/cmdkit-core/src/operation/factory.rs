//! Builds operations from documents.
//!
//! A document is an object with an `operation` name plus properties. It may
//! also be a reference (`"{{ steps.deploy }}"`) to such an object, possibly
//! through several hops, and a list entry may be a reference to a whole list
//! of documents, which is spliced in place.
//!
//! Reserved properties:
//! - `operation` -- catalogue name (required)
//! - `conditions` -- see [`Conditions`]
//! - `comment`, `enabled` -- copied as written
//! - `operations` -- nested list, aggregates only
//!
//! Every other property must name a declared parameter.

use cmdkit_types::error::CommandError;
use cmdkit_types::value::{Map, Value};

use super::catalogue::OperationCatalogue;
use super::{BoxOperation, NestedOperations};
use crate::command::condition::Conditions;
use crate::variables::Resolver;

const OPERATION: &str = "operation";
const CONDITIONS: &str = "conditions";
const COMMENT: &str = "comment";
const ENABLED: &str = "enabled";
const OPERATIONS: &str = "operations";

/// Instantiates operations against a catalogue and the current variables.
#[derive(Clone, Copy)]
pub struct OperationFactory<'a> {
    catalogue: &'a OperationCatalogue,
    resolver: Resolver<'a>,
}

impl<'a> OperationFactory<'a> {
    pub fn new(catalogue: &'a OperationCatalogue, resolver: Resolver<'a>) -> Self {
        Self {
            catalogue,
            resolver,
        }
    }

    /// Build one operation from a document.
    pub fn build(&self, document: &Value) -> Result<BoxOperation, CommandError> {
        let document = self.materialize(document)?;
        match document.as_object() {
            Some(map) => self.build_object(map),
            None => Err(CommandError::structural(format!(
                "an operation document must be an object, got {}",
                document.value_type()
            ))),
        }
    }

    /// Build an ordered list of operations. Entries that dereference to a
    /// list are flattened into the result.
    pub fn build_list(&self, documents: &[Value]) -> Result<Vec<BoxOperation>, CommandError> {
        let mut operations = Vec::with_capacity(documents.len());
        self.build_into(documents, &mut operations, 0)?;
        Ok(operations)
    }

    fn build_into(
        &self,
        documents: &[Value],
        operations: &mut Vec<BoxOperation>,
        depth: u32,
    ) -> Result<(), CommandError> {
        if depth > self.resolver.max_depth() {
            return Err(CommandError::CircularReference {
                path: "operations".to_string(),
                max_depth: self.resolver.max_depth(),
                unresolved: Value::list(documents.iter().cloned()),
            });
        }

        for document in documents {
            let document = self.materialize(document)?;
            match &document {
                Value::List(items) => self.build_into(items, operations, depth + 1)?,
                Value::Object(map) => operations.push(self.build_object(map)?),
                other => {
                    return Err(CommandError::structural(format!(
                        "an operation document must be an object, got {}",
                        other.value_type()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Check the shape of nested documents written in place. Reference
    /// entries are left alone: they are followed on each pass, when the
    /// variables they name (a loop item, say) exist.
    fn check_literal(&self, documents: &[Value]) -> Result<(), CommandError> {
        for document in documents {
            match document.peel() {
                Value::Text(_) | Value::LazyText(_) => {}
                Value::List(items) => self.check_literal(items)?,
                Value::Object(map) => {
                    self.build_object(map)?;
                }
                other => {
                    return Err(CommandError::structural(format!(
                        "an operation document must be an object, got {}",
                        other.value_type()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Follow reference indirection until the document is no longer text.
    fn materialize(&self, document: &Value) -> Result<Value, CommandError> {
        let mut current = document.peel().clone();
        let mut hops = 0;
        while let Some(text) = current.as_str() {
            hops += 1;
            if hops > self.resolver.max_depth() {
                return Err(CommandError::CircularReference {
                    path: text.to_string(),
                    max_depth: self.resolver.max_depth(),
                    unresolved: current.clone(),
                });
            }

            let next = match self.resolver.dereference(text)? {
                Some(value) if value.is_absent() => {
                    return Err(CommandError::structural(format!(
                        "operation reference '{text}' resolves to nothing"
                    )));
                }
                Some(value) => value.into_peeled(),
                None => {
                    return Err(CommandError::structural(format!(
                        "an operation document must be an object, got text '{text}'"
                    )));
                }
            };
            tracing::trace!(reference = text, "operation document dereferenced");
            current = next;
        }
        Ok(current)
    }

    fn build_object(&self, map: &Map) -> Result<BoxOperation, CommandError> {
        let name_value = map
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(OPERATION))
            .map(|(_, value)| value)
            .ok_or_else(|| {
                CommandError::structural("operation document has no 'operation' property")
            })?;
        let name = self.resolver.resolve(name_value, false)?;
        let Some(name) = name.as_str() else {
            return Err(CommandError::structural(format!(
                "'operation' must be text, got {}",
                name.value_type()
            )));
        };

        let mut operation = self.catalogue.create(name).ok_or_else(|| {
            CommandError::structural(format!("unknown operation '{name}'"))
        })?;
        let declared = operation.name().to_string();

        for (key, value) in map.iter() {
            match key.to_ascii_lowercase().as_str() {
                OPERATION => {}
                CONDITIONS => {
                    operation.state_mut().conditions = Conditions::from_document(value)?;
                }
                COMMENT => {
                    operation.state_mut().comment = Some(value.to_string());
                }
                ENABLED => {
                    operation.state_mut().enabled = Some(value.clone());
                }
                OPERATIONS => {
                    if !operation.is_aggregate() {
                        return Err(CommandError::structural(format!(
                            "operation '{declared}' does not take nested 'operations'"
                        )));
                    }
                    let Some(documents) = value.as_list() else {
                        return Err(CommandError::structural(format!(
                            "'operations' of '{declared}' must be a list, got {}",
                            value.value_type()
                        )));
                    };
                    self.check_literal(documents)?;
                    operation.state_mut().nested = NestedOperations::new(documents.to_vec());
                }
                _ => {
                    if !operation.state_mut().parameters.bind(key, value.clone()) {
                        return Err(CommandError::structural(format!(
                            "unknown property '{key}' on operation '{declared}'"
                        )));
                    }
                }
            }
        }

        tracing::trace!(operation = %declared, "operation built");
        Ok(operation)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::VariableStore;
    use cmdkit_types::codec::from_yaml_str;
    use cmdkit_types::variable::{Scope, Variable};

    fn doc(yaml: &str) -> Value {
        from_yaml_str(yaml).unwrap()
    }

    fn build(store: &VariableStore, document: &Value) -> Result<BoxOperation, CommandError> {
        let catalogue = OperationCatalogue::with_builtins();
        OperationFactory::new(&catalogue, Resolver::new(store)).build(document)
    }

    #[test]
    fn test_build_binds_parameters_unresolved() {
        let store = VariableStore::new();
        let op = build(
            &store,
            &doc("operation: log\nmessage: \"hi {{ who }}\"\ncomment: greet\nenabled: false\n"),
        )
        .unwrap();

        assert_eq!(op.name(), "Log");
        let state = op.state();
        assert_eq!(state.comment.as_deref(), Some("greet"));
        assert_eq!(state.enabled, Some(Value::Bool(false)));
        assert_eq!(
            state.parameters.get("message").unwrap().original,
            Some(Value::text("hi {{ who }}"))
        );
    }

    #[test]
    fn test_build_parses_conditions() {
        let store = VariableStore::new();
        let op = build(
            &store,
            &doc("operation: Log\nmessage: x\nconditions:\n  IsNotNull: \"{{ token }}\"\n"),
        )
        .unwrap();
        assert_eq!(op.state().conditions.predicates().len(), 1);
    }

    #[test]
    fn test_structural_errors() {
        let store = VariableStore::new();
        let cases = [
            "operation: Nope\n",
            "message: no name\n",
            "operation: Log\nbogus: 1\n",
            "operation: Log\noperations: []\n",
            "operation: Block\noperations: notalist\n",
            "operation: Block\noperations:\n  - operation: Missing\n",
        ];
        for case in cases {
            let err = build(&store, &doc(case)).unwrap_err();
            assert!(matches!(err, CommandError::Structural(_)), "{case}: {err:?}");
        }
    }

    #[test]
    fn test_aggregate_builds_nested_list() {
        let store = VariableStore::new();
        let op = build(
            &store,
            &doc("operation: Block\noperations:\n  - operation: Log\n    message: a\n  - operation: Log\n    message: b\n"),
        )
        .unwrap();
        assert_eq!(op.state().nested.documents().len(), 2);

        let catalogue = OperationCatalogue::with_builtins();
        let factory = OperationFactory::new(&catalogue, Resolver::new(&store));
        let first = op.state().nested.build(&factory).unwrap();
        let second = op.state().nested.build(&factory).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);
    }

    #[test]
    fn test_document_indirection() {
        let mut store = VariableStore::new();
        store.load_layer(
            Scope::Session,
            [
                Variable::new("greet", doc("operation: Log\nmessage: \"{{ who }}\"\n")),
                Variable::new("alias", Value::text("{{ greet }}")),
                Variable::new("which", Value::text("greet")),
            ],
        );

        let op = build(&store, &Value::text("{{ alias }}")).unwrap();
        assert_eq!(op.name(), "Log");
        // The target's own templates are left for prepare.
        assert_eq!(
            op.parameters().get("message").unwrap().original,
            Some(Value::text("{{ who }}"))
        );

        let op = build(&store, &Value::text("{{ {{ which }} }}")).unwrap();
        assert_eq!(op.name(), "Log");
    }

    #[test]
    fn test_list_indirection_is_flattened() {
        let mut store = VariableStore::new();
        store.load_layer(
            Scope::Session,
            [Variable::new(
                "steps",
                doc("- operation: Log\n  message: a\n- operation: Log\n  message: b\n"),
            )],
        );
        let catalogue = OperationCatalogue::with_builtins();
        let factory = OperationFactory::new(&catalogue, Resolver::new(&store));
        let ops = factory
            .build_list(&[
                Value::text("{{ steps }}"),
                doc("operation: Block\n"),
            ])
            .unwrap();
        let names: Vec<&str> = ops.iter().map(|op| op.name()).collect();
        assert_eq!(names, vec!["Log", "Log", "Block"]);
    }

    #[test]
    fn test_dangling_and_circular_indirection() {
        let mut store = VariableStore::new();
        store.load_layer(
            Scope::Session,
            [Variable::new("selfref", Value::text("{{ selfref }}"))],
        );
        let dangling = build(&store, &Value::text("{{ nothing }}")).unwrap_err();
        assert!(matches!(dangling, CommandError::Structural(_)));

        let circular = build(&store, &Value::text("{{ selfref }}")).unwrap_err();
        assert!(matches!(circular, CommandError::CircularReference { .. }), "got: {circular:?}");
    }
}
