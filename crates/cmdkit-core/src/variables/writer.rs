//! Scoped writes.
//!
//! A write replaces the target key at the target scope and removes the same
//! key from every narrower layer, so a read immediately after always sees the
//! value just written. Writing `name[key]` upserts one element of a keyed
//! list instead of replacing the whole list.

use cmdkit_types::error::CommandError;
use cmdkit_types::path::{PathShape, ValuePath};
use cmdkit_types::value::Value;
use cmdkit_types::variable::{Scope, Variable};

use super::store::{APPLICATION_SOURCE, VariableStore};

impl VariableStore {
    /// Write `value` at `path` in `scope`.
    ///
    /// `session` names the active session and is the default source id for
    /// new session variables. An explicit `source` overrides the owner of the
    /// written variable; otherwise an existing owner is kept.
    pub fn write(
        &mut self,
        scope: Scope,
        session: &str,
        path: &str,
        value: Value,
        source: Option<String>,
    ) -> Result<(), CommandError> {
        if scope == Scope::BuiltIn {
            return Err(CommandError::structural(format!(
                "cannot write '{path}': the builtin scope is read-only"
            )));
        }

        let path = ValuePath::parse(path)?;
        match path.shape() {
            PathShape::TopLevel => {
                self.write_top_level(scope, session, path.root(), value, source);
                Ok(())
            }
            PathShape::TopLevelListElement => {
                let key = path.list_key().unwrap_or_default();
                self.write_list_element(scope, session, path.root(), key, value, source)
            }
            PathShape::Nested => Err(CommandError::structural(format!(
                "unsupported write target '{path}': only 'name' and 'name[key]' can be written"
            ))),
        }
    }

    fn write_top_level(
        &mut self,
        scope: Scope,
        session: &str,
        name: &str,
        value: Value,
        source: Option<String>,
    ) {
        let source = source.or_else(|| self.inherited_source(scope, session, name));
        self.cascade_clear(scope, name);

        let mut variable = Variable::new(name, value);
        variable.source = source;
        tracing::debug!(%scope, name, "variable written");
        self.insert(scope, variable);
    }

    fn write_list_element(
        &mut self,
        scope: Scope,
        session: &str,
        name: &str,
        key: &str,
        value: Value,
        source: Option<String>,
    ) -> Result<(), CommandError> {
        if value.as_object().is_none() {
            return Err(CommandError::validation(format!(
                "'{name}[{key}]' must be written with an object, got {}",
                value.value_type()
            )));
        }
        match value.element_key() {
            Some(element_key) if element_key == key => {}
            Some(element_key) => {
                return Err(CommandError::validation(format!(
                    "'{name}[{key}]' cannot be written with an element keyed '{element_key}'"
                )));
            }
            None => {
                return Err(CommandError::validation(format!(
                    "'{name}[{key}]' must be written with an object that has a 'key' property"
                )));
            }
        }

        if let Some(existing) = self.get_mut(scope, name) {
            existing.value = existing.value.with_upserted_element(value);
            if source.is_some() {
                existing.source = source;
            }
            tracing::debug!(%scope, name, key, "list element upserted");
            return Ok(());
        }

        let source = source.or_else(|| self.inherited_source(scope, session, name));
        self.cascade_clear(scope, name);

        let mut variable = Variable::new(name, Value::list([value]));
        variable.source = source;
        tracing::debug!(%scope, name, key, "list created");
        self.insert(scope, variable);
        Ok(())
    }

    /// Owner for a written variable: the owner of the entry it replaces in
    /// the same layer, or the layer's default owner. Owners from other layers
    /// name sources of those layers and are never carried across.
    fn inherited_source(&self, scope: Scope, session: &str, name: &str) -> Option<String> {
        if let Some(source) = self.get(scope, name).and_then(|v| v.source.clone()) {
            return Some(source);
        }
        match scope {
            Scope::Session => Some(session.to_string()),
            Scope::Application => Some(APPLICATION_SOURCE.to_string()),
            Scope::Command | Scope::BuiltIn => None,
        }
    }

    /// Remove `name` from `scope` and every narrower writable layer.
    fn cascade_clear(&mut self, scope: Scope, name: &str) {
        for layer in [Scope::Command, Scope::Session, Scope::Application] {
            if layer <= scope && self.remove(layer, name).is_some() {
                tracing::trace!(scope = %layer, name, "shadowing variable removed");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
