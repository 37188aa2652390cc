//! The four-layer variable store and path lookup.
//!
//! `VariableStore` holds one map per [`Scope`]. Reads consult the layers in
//! precedence order (Command, Session, Application, BuiltIn); keyed lists are
//! the exception and are merged across layers.

use std::collections::HashSet;

use cmdkit_types::error::CommandError;
use cmdkit_types::path::{PathShape, Segment, ValuePath};
use cmdkit_types::value::Value;
use cmdkit_types::variable::{Scope, Variable};
use indexmap::IndexMap;

/// Source id given to application-scope variables that have no owner yet.
pub const APPLICATION_SOURCE: &str = "application";

/// Source id given to builtin variables that have no owner yet.
pub const BUILTIN_SOURCE: &str = "builtin";

// ---------------------------------------------------------------------------
// VariableStore
// ---------------------------------------------------------------------------

/// Variables for one engine instance, split by scope.
///
/// Each layer holds at most one variable per key. The store does no locking:
/// a host running commands concurrently gives each run its own store.
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    layers: [IndexMap<String, Variable>; 4],
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, scope: Scope, key: &str) -> Option<&Variable> {
        self.layers[scope.index()].get(key)
    }

    pub(crate) fn get_mut(&mut self, scope: Scope, key: &str) -> Option<&mut Variable> {
        self.layers[scope.index()].get_mut(key)
    }

    /// Insert a variable, replacing any same-keyed variable in that layer.
    pub(crate) fn insert(&mut self, scope: Scope, variable: Variable) {
        self.layers[scope.index()].insert(variable.key.clone(), variable);
    }

    pub fn remove(&mut self, scope: Scope, key: &str) -> Option<Variable> {
        self.layers[scope.index()].shift_remove(key)
    }

    /// Bulk-load a layer, e.g. from persistence. Later entries win on key clashes.
    pub fn load_layer(&mut self, scope: Scope, variables: impl IntoIterator<Item = Variable>) {
        let layer = &mut self.layers[scope.index()];
        for variable in variables {
            layer.insert(variable.key.clone(), variable);
        }
    }

    pub fn clear(&mut self, scope: Scope) {
        self.layers[scope.index()].clear();
    }

    pub fn variables(&self, scope: Scope) -> impl Iterator<Item = &Variable> {
        self.layers[scope.index()].values()
    }

    pub fn len(&self, scope: Scope) -> usize {
        self.layers[scope.index()].len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.iter().all(|layer| layer.is_empty())
    }

    /// Group a layer by owning source id, for saving each source back.
    ///
    /// Variables without a source are attributed to `default_source`.
    pub fn variables_by_source(
        &self,
        scope: Scope,
        default_source: &str,
    ) -> IndexMap<String, Vec<Variable>> {
        let mut grouped: IndexMap<String, Vec<Variable>> = IndexMap::new();
        for variable in self.variables(scope) {
            let source = variable.source.as_deref().unwrap_or(default_source);
            grouped
                .entry(source.to_string())
                .or_default()
                .push(variable.clone());
        }
        grouped
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// Look up a path across all layers.
    ///
    /// For a bare name where at least one layer holds a list, the result is
    /// the union of every layer's elements, de-duplicated by their `key`
    /// property with Command > Session > Application > BuiltIn precedence.
    /// Otherwise the first non-absent layer result wins. A path that walks
    /// off the tree yields `Absent`; a malformed path is an error.
    pub fn lookup(&self, path: &str) -> Result<Value, CommandError> {
        let path = ValuePath::parse(path)?;
        let mut per_layer = Vec::with_capacity(Scope::PRECEDENCE.len());
        for scope in Scope::PRECEDENCE {
            per_layer.push(self.lookup_in(scope, &path));
        }

        if path.shape() == PathShape::TopLevel && per_layer.iter().any(|v| v.as_list().is_some())
        {
            return Ok(merge_keyed_lists(&per_layer));
        }

        Ok(per_layer
            .into_iter()
            .find(|v| !v.is_absent())
            .unwrap_or_default())
    }

    /// Walk a parsed path inside a single layer.
    pub fn lookup_in(&self, scope: Scope, path: &ValuePath) -> Value {
        let Some(variable) = self.get(scope, path.root()) else {
            return Value::Absent;
        };

        let mut current = &variable.value;
        for segment in path.rest() {
            let next = match segment {
                Segment::Name(name) => current.property(name),
                Segment::Key(key) => current.find_keyed(key),
            };
            match next {
                Some(value) => current = value,
                None => return Value::Absent,
            }
        }
        current.clone()
    }
}

/// Union of list elements across layers, first occurrence of each key wins.
/// Elements without a key are always kept.
fn merge_keyed_lists(per_layer: &[Value]) -> Value {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for items in per_layer.iter().filter_map(|v| v.as_list()) {
        for item in items {
            match item.element_key() {
                Some(key) => {
                    if seen.insert(key) {
                        merged.push(item.clone());
                    }
                }
                None => merged.push(item.clone()),
            }
        }
    }
    Value::from(merged)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed(key: &str, data: &str) -> Value {
        Value::object([("key", Value::text(key)), ("data", Value::text(data))])
    }

    fn store_with(scope: Scope, key: &str, value: Value) -> VariableStore {
        let mut store = VariableStore::new();
        store.insert(scope, Variable::new(key, value));
        store
    }

    #[test]
    fn test_lookup_precedence() {
        let mut store = VariableStore::new();
        for (scope, text) in [
            (Scope::BuiltIn, "builtin"),
            (Scope::Application, "app"),
            (Scope::Session, "session"),
            (Scope::Command, "command"),
        ] {
            store.insert(scope, Variable::new("K", Value::text(text)));
        }

        assert_eq!(store.lookup("K").unwrap(), Value::text("command"));
        store.remove(Scope::Command, "K");
        assert_eq!(store.lookup("K").unwrap(), Value::text("session"));
        store.remove(Scope::Session, "K");
        assert_eq!(store.lookup("K").unwrap(), Value::text("app"));
        store.remove(Scope::Application, "K");
        assert_eq!(store.lookup("K").unwrap(), Value::text("builtin"));
        store.remove(Scope::BuiltIn, "K");
        assert_eq!(store.lookup("K").unwrap(), Value::Absent);
    }

    #[test]
    fn test_lookup_nested_property_and_key() {
        let store = store_with(
            Scope::Session,
            "api",
            Value::object([(
                "hosts",
                Value::list([keyed("prod", "p.example.com"), keyed("dev", "d.example.com")]),
            )]),
        );

        assert_eq!(store.lookup("api.hosts[dev].data").unwrap(), Value::text("d.example.com"));
        assert_eq!(store.lookup("api.hosts[qa].data").unwrap(), Value::Absent);
        assert_eq!(store.lookup("api.missing").unwrap(), Value::Absent);
        assert_eq!(store.lookup("nothing.here").unwrap(), Value::Absent);
    }

    #[test]
    fn test_lookup_property_of_scalar_is_absent() {
        let store = store_with(Scope::Command, "n", Value::Integer(1));
        assert_eq!(store.lookup("n.x").unwrap(), Value::Absent);
    }

    #[test]
    fn test_lookup_rejects_leading_index() {
        let store = VariableStore::new();
        assert!(store.lookup("[x].y").is_err());
    }

    #[test]
    fn test_list_union_across_layers() {
        let mut store = VariableStore::new();
        store.insert(Scope::BuiltIn, Variable::new("K", Value::list([keyed("x", "builtin")])));
        store.insert(Scope::Session, Variable::new("K", Value::list([keyed("y", "session")])));

        let merged = store.lookup("K").unwrap();
        let items = merged.as_list().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], keyed("y", "session"));
        assert_eq!(items[1], keyed("x", "builtin"));
    }

    #[test]
    fn test_list_union_prefers_narrower_scope() {
        let mut store = VariableStore::new();
        store.insert(Scope::BuiltIn, Variable::new("K", Value::list([keyed("x", "builtin")])));
        store.insert(Scope::Session, Variable::new("K", Value::list([keyed("x", "session")])));

        let merged = store.lookup("K").unwrap();
        assert_eq!(merged, Value::list([keyed("x", "session")]));
    }

    #[test]
    fn test_list_element_lookup_does_not_merge() {
        let mut store = VariableStore::new();
        store.insert(Scope::BuiltIn, Variable::new("K", Value::list([keyed("x", "builtin")])));
        store.insert(Scope::Session, Variable::new("K", Value::list([keyed("y", "session")])));

        // Element lookups walk each layer and take the first hit.
        assert_eq!(store.lookup("K[x].data").unwrap(), Value::text("builtin"));
        assert_eq!(store.lookup("K[y].data").unwrap(), Value::text("session"));
    }

    #[test]
    fn test_variables_by_source() {
        let mut store = VariableStore::new();
        store.load_layer(
            Scope::Session,
            [
                Variable::new("a", Value::Integer(1)).with_source("dev"),
                Variable::new("b", Value::Integer(2)),
                Variable::new("c", Value::Integer(3)).with_source("dev"),
            ],
        );

        let grouped = store.variables_by_source(Scope::Session, "default");
        assert_eq!(grouped["dev"].len(), 2);
        assert_eq!(grouped["default"].len(), 1);
    }
}
