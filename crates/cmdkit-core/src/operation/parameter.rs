//! Declared operation parameters: binding, resolution, and validation.
//!
//! An operation declares its parameters up front as [`ParameterSpec`]s. The
//! factory binds each document property to the matching parameter's
//! *original* value; [`Parameters::prepare`] later resolves every original
//! against the live variable store and validates the result. Prepare runs
//! once per invocation, immediately before the operation runs.

use std::fmt;

use cmdkit_types::error::CommandError;
use cmdkit_types::value::{Value, ValueType};
use indexmap::IndexMap;

use crate::variables::Resolver;

// ---------------------------------------------------------------------------
// ParameterSpec
// ---------------------------------------------------------------------------

/// Declaration of one parameter: its name, type, and validation rules.
#[derive(Debug, Clone, Default)]
pub struct ParameterSpec {
    pub name: String,
    pub description: String,
    /// Required value type; `None` accepts any kind.
    pub kind: Option<ValueType>,
    pub required: bool,
    /// Used when the document does not set the parameter, or when its
    /// reference resolves to nothing.
    pub default: Option<Value>,
    /// Exact values the parameter may take. Empty means unrestricted.
    pub allowed: Vec<Value>,
    /// Case-insensitive text choices, normalised to the declared spelling.
    pub enum_values: Vec<String>,
    /// Read a text value as a variable path rather than a template.
    pub as_variable: bool,
    /// Keep the original value unresolved; the operation resolves it itself.
    pub verbatim: bool,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn kind(mut self, kind: ValueType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn allowed(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.allowed = values.into_iter().collect();
        self
    }

    pub fn enum_values<S: Into<String>>(mut self, values: impl IntoIterator<Item = S>) -> Self {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn as_variable(mut self) -> Self {
        self.as_variable = true;
        self
    }

    pub fn verbatim(mut self) -> Self {
        self.verbatim = true;
        self
    }

    /// Short type label for listings: `text`, `enum(a|b)`, `any`.
    pub fn type_label(&self) -> String {
        if !self.enum_values.is_empty() {
            return format!("enum({})", self.enum_values.join("|"));
        }
        match self.kind {
            Some(kind) => kind.to_string(),
            None => "any".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parameter
// ---------------------------------------------------------------------------

/// A declared parameter together with its bound and resolved values.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub spec: ParameterSpec,
    /// The value as written in the document, before resolution.
    pub original: Option<Value>,
    /// The value after the last prepare; `Absent` until then.
    pub value: Value,
}

impl Parameter {
    pub fn new(spec: ParameterSpec) -> Self {
        Self {
            spec,
            original: None,
            value: Value::Absent,
        }
    }

    fn prepare(&mut self, operation: &str, resolver: &Resolver<'_>) -> Result<(), CommandError> {
        let raw = self
            .original
            .clone()
            .or_else(|| self.spec.default.clone())
            .unwrap_or_default();

        if self.spec.verbatim {
            self.value = raw;
            return self.check_required(operation);
        }

        let mut value = resolver.resolve(&raw, self.spec.as_variable)?;
        if value.is_absent() && self.original.is_some() {
            if let Some(default) = &self.spec.default {
                tracing::debug!(
                    operation,
                    parameter = %self.spec.name,
                    "parameter resolved to nothing, using default"
                );
                value = resolver.resolve(default, false)?;
            }
        }
        self.value = value;

        self.check_required(operation)?;
        if self.value.is_absent() {
            return Ok(());
        }
        self.coerce(operation)?;
        self.normalise_enum(operation)?;
        self.check_allowed(operation)
    }

    fn check_required(&self, operation: &str) -> Result<(), CommandError> {
        if self.spec.required && self.value.is_absent() {
            return Err(CommandError::validation(format!(
                "operation '{operation}' is missing required parameter '{}'",
                self.spec.name
            )));
        }
        Ok(())
    }

    /// Bring the value to the declared kind, parsing text where that is
    /// unambiguous.
    fn coerce(&mut self, operation: &str) -> Result<(), CommandError> {
        let Some(kind) = self.spec.kind else {
            return Ok(());
        };
        let actual = self.value.value_type();
        if actual == kind {
            return Ok(());
        }

        let coerced = match (kind, &self.value) {
            (ValueType::Float, v) if actual == ValueType::Integer => v.as_f64().map(Value::Float),
            (ValueType::Integer, v) if actual == ValueType::Text => v
                .as_str()
                .and_then(|s| s.trim().parse::<i64>().ok())
                .map(Value::Integer),
            (ValueType::Float, v) if actual == ValueType::Text => v
                .as_str()
                .and_then(|s| s.trim().parse::<f64>().ok())
                .map(Value::Float),
            (ValueType::Bool, v) if actual == ValueType::Text => {
                v.as_str().and_then(|s| match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "yes" | "on" => Some(Value::Bool(true)),
                    "false" | "no" | "off" => Some(Value::Bool(false)),
                    _ => None,
                })
            }
            (ValueType::Text, v) if matches!(actual, ValueType::Integer | ValueType::Float | ValueType::Bool) => {
                Some(Value::text(v.to_string()))
            }
            _ => None,
        };

        match coerced {
            Some(value) => {
                self.value = value;
                Ok(())
            }
            None => Err(CommandError::validation(format!(
                "parameter '{}' of operation '{operation}' expects {kind}, got {actual}",
                self.spec.name
            ))),
        }
    }

    fn normalise_enum(&mut self, operation: &str) -> Result<(), CommandError> {
        if self.spec.enum_values.is_empty() {
            return Ok(());
        }
        let declared = self.value.as_str().and_then(|text| {
            let text = text.trim();
            self.spec
                .enum_values
                .iter()
                .find(|choice| choice.eq_ignore_ascii_case(text))
        });
        match declared {
            Some(choice) => {
                self.value = Value::text(choice.clone());
                Ok(())
            }
            None => Err(CommandError::validation(format!(
                "parameter '{}' of operation '{operation}' must be one of [{}], got '{}'",
                self.spec.name,
                self.spec.enum_values.join(", "),
                self.value
            ))),
        }
    }

    fn check_allowed(&self, operation: &str) -> Result<(), CommandError> {
        if self.spec.allowed.is_empty() || self.spec.allowed.contains(&self.value) {
            return Ok(());
        }
        Err(CommandError::validation(format!(
            "parameter '{}' of operation '{operation}' does not allow the value '{}'",
            self.spec.name, self.value
        )))
    }
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// An operation's ordered parameter map. Names match case-insensitively.
#[derive(Clone, Default)]
pub struct Parameters {
    items: IndexMap<String, Parameter>,
}

impl Parameters {
    pub fn new(specs: impl IntoIterator<Item = ParameterSpec>) -> Self {
        let mut parameters = Self::default();
        for spec in specs {
            parameters.declare(spec);
        }
        parameters
    }

    /// Declare a parameter, replacing any earlier one of the same name.
    pub fn declare(&mut self, spec: ParameterSpec) {
        self.items
            .insert(spec.name.to_ascii_lowercase(), Parameter::new(spec));
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.items.get(&name.to_ascii_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Bind the unresolved document value of a parameter.
    ///
    /// Returns `false` when no parameter of that name is declared.
    pub fn bind(&mut self, name: &str, original: Value) -> bool {
        match self.items.get_mut(&name.to_ascii_lowercase()) {
            Some(parameter) => {
                parameter.original = Some(original);
                true
            }
            None => false,
        }
    }

    /// The prepared value of a parameter; `Absent` when unset or undeclared.
    pub fn value(&self, name: &str) -> &Value {
        static ABSENT: Value = Value::Absent;
        self.get(name).map(|p| &p.value).unwrap_or(&ABSENT)
    }

    /// The prepared value as text, if it is text.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.value(name).as_str()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Resolve and validate every parameter. Stops at the first violation.
    pub fn prepare(&mut self, operation: &str, resolver: &Resolver<'_>) -> Result<(), CommandError> {
        for parameter in self.items.values_mut() {
            parameter.prepare(operation, resolver)?;
            tracing::trace!(
                operation,
                parameter = %parameter.spec.name,
                value = %parameter.value,
                "parameter prepared"
            );
        }
        Ok(())
    }
}

impl fmt::Debug for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.items.values().map(|p| (&p.spec.name, &p.value)))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::VariableStore;
    use cmdkit_types::variable::{Scope, Variable};

    fn prepared(spec: ParameterSpec, original: Option<Value>, store: &VariableStore) -> Result<Value, CommandError> {
        let name = spec.name.clone();
        let mut params = Parameters::new([spec]);
        if let Some(original) = original {
            assert!(params.bind(&name, original));
        }
        params.prepare("Test", &Resolver::new(store))?;
        Ok(params.value(&name).clone())
    }

    #[test]
    fn test_bind_is_case_insensitive() {
        let mut params = Parameters::new([ParameterSpec::new("Message")]);
        assert!(params.bind("message", Value::text("x")));
        assert!(params.bind("MESSAGE", Value::text("y")));
        assert!(!params.bind("other", Value::text("z")));
        assert_eq!(params.get("message").unwrap().original, Some(Value::text("y")));
    }

    #[test]
    fn test_prepare_resolves_templates() {
        let mut store = VariableStore::new();
        store.load_layer(Scope::Command, [Variable::new("who", Value::text("world"))]);
        let value = prepared(
            ParameterSpec::new("message"),
            Some(Value::text("hello {{ who }}")),
            &store,
        )
        .unwrap();
        assert_eq!(value, Value::text("hello world"));
    }

    #[test]
    fn test_prepare_as_variable() {
        let mut store = VariableStore::new();
        store.load_layer(Scope::Command, [Variable::new("items", Value::list([Value::Integer(1)]))]);
        let value = prepared(
            ParameterSpec::new("list").as_variable(),
            Some(Value::text("items")),
            &store,
        )
        .unwrap();
        assert_eq!(value, Value::list([Value::Integer(1)]));
    }

    #[test]
    fn test_missing_required_is_validation_error() {
        let store = VariableStore::new();
        let err = prepared(ParameterSpec::new("name").required(), None, &store).unwrap_err();
        assert!(matches!(err, CommandError::Validation(_)), "got: {err:?}");
        assert!(err.to_string().contains("'name'"));

        // A reference to nothing is also missing.
        let err = prepared(
            ParameterSpec::new("name").required(),
            Some(Value::text("{{ nope }}")),
            &store,
        )
        .unwrap_err();
        assert!(matches!(err, CommandError::Validation(_)));
    }

    #[test]
    fn test_default_applies_when_unset_or_absent() {
        let store = VariableStore::new();
        let spec = ParameterSpec::new("variable").default_value("item");
        assert_eq!(prepared(spec.clone(), None, &store).unwrap(), Value::text("item"));
        assert_eq!(
            prepared(spec, Some(Value::text("{{ unset }}")), &store).unwrap(),
            Value::text("item")
        );
    }

    #[test]
    fn test_text_coerces_to_declared_kind() {
        let store = VariableStore::new();
        assert_eq!(
            prepared(ParameterSpec::new("n").kind(ValueType::Integer), Some(Value::text(" 42 ")), &store).unwrap(),
            Value::Integer(42)
        );
        assert_eq!(
            prepared(ParameterSpec::new("f").kind(ValueType::Float), Some(Value::Integer(2)), &store).unwrap(),
            Value::Float(2.0)
        );
        assert_eq!(
            prepared(ParameterSpec::new("b").kind(ValueType::Bool), Some(Value::text("Yes")), &store).unwrap(),
            Value::Bool(true)
        );

        let err = prepared(
            ParameterSpec::new("n").kind(ValueType::Integer),
            Some(Value::text("forty")),
            &store,
        )
        .unwrap_err();
        assert!(matches!(err, CommandError::Validation(_)));
        assert!(err.to_string().contains("expects integer, got text"), "got: {err}");
    }

    #[test]
    fn test_enum_is_normalised() {
        let store = VariableStore::new();
        let spec = ParameterSpec::new("scope").enum_values(["Command", "Session"]);
        assert_eq!(
            prepared(spec.clone(), Some(Value::text("session")), &store).unwrap(),
            Value::text("Session")
        );
        let err = prepared(spec, Some(Value::text("global")), &store).unwrap_err();
        assert!(matches!(err, CommandError::Validation(_)));
        assert!(err.to_string().contains("Command, Session"));
    }

    #[test]
    fn test_allowed_values() {
        let store = VariableStore::new();
        let spec = ParameterSpec::new("retries").allowed([Value::Integer(1), Value::Integer(3)]);
        assert_eq!(prepared(spec.clone(), Some(Value::Integer(3)), &store).unwrap(), Value::Integer(3));
        assert!(prepared(spec, Some(Value::Integer(2)), &store).is_err());
    }

    #[test]
    fn test_verbatim_keeps_original() {
        let store = VariableStore::new();
        let value = prepared(
            ParameterSpec::new("value").verbatim(),
            Some(Value::text("{{ later }}")),
            &store,
        )
        .unwrap();
        assert_eq!(value, Value::text("{{ later }}"));
    }

    #[test]
    fn test_type_label() {
        assert_eq!(ParameterSpec::new("a").type_label(), "any");
        assert_eq!(ParameterSpec::new("a").kind(ValueType::List).type_label(), "list");
        assert_eq!(
            ParameterSpec::new("a").enum_values(["x", "y"]).type_label(),
            "enum(x|y)"
        );
    }
}
