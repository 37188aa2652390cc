//! The variant value model.
//!
//! `Value` is the single data type that flows through cmdkit: variables,
//! operation parameters and command documents are all `Value` trees.
//! Object and list payloads sit behind `Arc` and are never mutated in place;
//! every `with_*` helper returns a new value.

use std::fmt;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;

/// Property map of an object value. Insertion order is preserved.
pub type Map = IndexMap<String, Value>;

/// Name of the object property that identifies an element inside a keyed list.
pub const KEY_PROPERTY: &str = "key";

// ---------------------------------------------------------------------------
// Lazy payloads
// ---------------------------------------------------------------------------

/// A payload computed on first access and cached afterwards.
///
/// Clones share the cache, so a lazily loaded file body is read at most once
/// no matter how many variables hold it.
pub struct Lazy<T> {
    cell: Arc<OnceLock<T>>,
    loader: Arc<dyn Fn() -> T + Send + Sync>,
}

impl<T> Lazy<T> {
    /// Defer computation until the payload is first read.
    pub fn new(loader: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self {
            cell: Arc::new(OnceLock::new()),
            loader: Arc::new(loader),
        }
    }

    /// Return the payload, computing it if necessary.
    pub fn get(&self) -> &T {
        self.cell.get_or_init(|| (self.loader)())
    }

    /// Whether the payload has already been computed.
    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T: Clone + Send + Sync + 'static> Lazy<T> {
    /// Wrap an already-known payload.
    pub fn ready(value: T) -> Self {
        let fallback = value.clone();
        Self {
            cell: Arc::new(OnceLock::from(value)),
            loader: Arc::new(move || fallback.clone()),
        }
    }
}

impl<T> Clone for Lazy<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
            loader: Arc::clone(&self.loader),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Lazy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.get() {
            Some(value) => f.debug_tuple("Lazy").field(value).finish(),
            None => write!(f, "Lazy(<pending>)"),
        }
    }
}

// ---------------------------------------------------------------------------
// ValueType
// ---------------------------------------------------------------------------

/// The kind of a [`Value`], used for parameter type checks and diagnostics.
///
/// Lazy text reports as `Text`; lazy binary reports as `Binary`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Absent,
    Text,
    DateTime,
    Bool,
    Integer,
    Float,
    Object,
    List,
    Binary,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Absent => "absent",
            ValueType::Text => "text",
            ValueType::DateTime => "datetime",
            ValueType::Bool => "bool",
            ValueType::Integer => "integer",
            ValueType::Float => "float",
            ValueType::Object => "object",
            ValueType::List => "list",
            ValueType::Binary => "binary",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A tagged variant value. Exactly one payload is populated; `Absent` means none.
///
/// `Verbatim` marks its inner value as no-resolve: template interpolation stops
/// there, which keeps literal embedded documents (for example a payload that
/// itself contains `{{ }}` markers) intact. Accessors look through the marker.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Absent,
    Text(String),
    DateTime(DateTime<Utc>),
    Bool(bool),
    Integer(i64),
    Float(f64),
    Object(Arc<Map>),
    List(Arc<Vec<Value>>),
    LazyText(Lazy<String>),
    LazyBinary(Lazy<Vec<u8>>),
    Verbatim(Box<Value>),
}

impl Value {
    pub fn text(text: impl Into<String>) -> Self {
        Value::Text(text.into())
    }

    /// Build an object from `(key, value)` pairs, keeping their order.
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Object(Arc::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(Arc::new(items.into_iter().collect()))
    }

    pub fn lazy_text(loader: impl Fn() -> String + Send + Sync + 'static) -> Self {
        Value::LazyText(Lazy::new(loader))
    }

    pub fn lazy_binary(loader: impl Fn() -> Vec<u8> + Send + Sync + 'static) -> Self {
        Value::LazyBinary(Lazy::new(loader))
    }

    /// Mark a value as no-resolve. Marking twice is a no-op.
    pub fn verbatim(value: Value) -> Self {
        match value {
            Value::Verbatim(_) => value,
            other => Value::Verbatim(Box::new(other)),
        }
    }

    pub fn is_verbatim(&self) -> bool {
        matches!(self, Value::Verbatim(_))
    }

    /// The value with any no-resolve marker removed.
    pub fn peel(&self) -> &Value {
        match self {
            Value::Verbatim(inner) => inner.peel(),
            other => other,
        }
    }

    pub fn into_peeled(self) -> Value {
        match self {
            Value::Verbatim(inner) => inner.into_peeled(),
            other => other,
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Absent => ValueType::Absent,
            Value::Text(_) | Value::LazyText(_) => ValueType::Text,
            Value::DateTime(_) => ValueType::DateTime,
            Value::Bool(_) => ValueType::Bool,
            Value::Integer(_) => ValueType::Integer,
            Value::Float(_) => ValueType::Float,
            Value::Object(_) => ValueType::Object,
            Value::List(_) => ValueType::List,
            Value::LazyBinary(_) => ValueType::Binary,
            Value::Verbatim(inner) => inner.value_type(),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self.peel(), Value::Absent)
    }

    pub fn is_text(&self) -> bool {
        self.value_type() == ValueType::Text
    }

    /// Text payload, forcing lazy text if needed.
    pub fn as_str(&self) -> Option<&str> {
        match self.peel() {
            Value::Text(s) => Some(s),
            Value::LazyText(lazy) => Some(lazy.get().as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.peel() {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.peel() {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.peel() {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&DateTime<Utc>> {
        match self.peel() {
            Value::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self.peel() {
            Value::LazyBinary(lazy) => Some(lazy.get().as_slice()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self.peel() {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self.peel() {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a property of an object value.
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(name))
    }

    /// The logical key of a keyed-list element: its `key` property as text.
    ///
    /// Integer keys are accepted and rendered in decimal so that `list[3]`
    /// finds `{ key: 3 }`.
    pub fn element_key(&self) -> Option<String> {
        match self.property(KEY_PROPERTY)?.peel() {
            Value::Text(s) => Some(s.clone()),
            Value::LazyText(lazy) => Some(lazy.get().clone()),
            Value::Integer(i) => Some(i.to_string()),
            _ => None,
        }
    }

    /// Find the element of a list value whose `key` property equals `key`.
    pub fn find_keyed(&self, key: &str) -> Option<&Value> {
        self.as_list()?
            .iter()
            .find(|item| item.element_key().as_deref() == Some(key))
    }

    /// A copy of this object with `name` set to `value`.
    ///
    /// A non-object receiver is treated as an empty object.
    pub fn with_property(&self, name: impl Into<String>, value: Value) -> Value {
        let mut map = self.as_object().cloned().unwrap_or_default();
        map.insert(name.into(), value);
        Value::Object(Arc::new(map))
    }

    /// A copy of this list with the element keyed like `element` removed and
    /// `element` appended. A non-list receiver is treated as an empty list.
    pub fn with_upserted_element(&self, element: Value) -> Value {
        let key = element.element_key();
        let mut items: Vec<Value> = self
            .as_list()
            .map(|items| {
                items
                    .iter()
                    .filter(|item| key.is_none() || item.element_key() != key)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        items.push(element);
        Value::List(Arc::new(items))
    }

    /// Whether this value counts as "off" for flags such as `enabled`.
    ///
    /// Absent, `false`, zero, empty text and the words `false`, `no`, `off`
    /// (any case) are false-ish. Everything else is true-ish.
    pub fn is_falsy(&self) -> bool {
        match self.peel() {
            Value::Absent => true,
            Value::Bool(b) => !b,
            Value::Integer(i) => *i == 0,
            Value::Float(f) => *f == 0.0,
            Value::Text(_) | Value::LazyText(_) => {
                let text = self.as_str().unwrap_or_default().trim().to_ascii_lowercase();
                matches!(text.as_str(), "" | "0" | "false" | "no" | "off")
            }
            _ => false,
        }
    }
}

impl PartialEq for Value {
    /// Structural equality. No-resolve markers are ignored, lazy text
    /// compares by content with plain text, object comparison ignores
    /// property order.
    fn eq(&self, other: &Self) -> bool {
        match (self.peel(), other.peel()) {
            (Value::Absent, Value::Absent) => true,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::LazyBinary(a), Value::LazyBinary(b)) => a.get() == b.get(),
            (a, b) if a.is_text() && b.is_text() => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.peel() {
            Value::Absent => Ok(()),
            Value::Text(s) => f.write_str(s),
            Value::LazyText(lazy) => f.write_str(lazy.get()),
            Value::DateTime(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::LazyBinary(lazy) => write!(f, "<{} bytes>", lazy.get().len()),
            compound => {
                let json = serde_json::to_string(compound).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Value::DateTime(dt)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(Arc::new(items))
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Object(Arc::new(map))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Absent)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn keyed(key: &str, data: i64) -> Value {
        Value::object([("key", Value::text(key)), ("data", Value::Integer(data))])
    }

    #[test]
    fn test_default_is_absent() {
        assert!(Value::default().is_absent());
        assert_eq!(Value::default().value_type(), ValueType::Absent);
    }

    #[test]
    fn test_lazy_text_computed_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let value = Value::lazy_text(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            "body".to_string()
        });
        let copy = value.clone();

        assert_eq!(value.as_str(), Some("body"));
        assert_eq!(copy.as_str(), Some("body"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(value.value_type(), ValueType::Text);
    }

    #[test]
    fn test_lazy_text_equals_plain_text() {
        let lazy = Value::lazy_text(|| "same".to_string());
        assert_eq!(lazy, Value::text("same"));
    }

    #[test]
    fn test_verbatim_is_transparent_for_accessors() {
        let value = Value::verbatim(Value::text("{{ x }}"));
        assert!(value.is_verbatim());
        assert_eq!(value.as_str(), Some("{{ x }}"));
        assert_eq!(value, Value::text("{{ x }}"));
        assert!(matches!(Value::verbatim(value.clone()), Value::Verbatim(inner) if !inner.is_verbatim()));
    }

    #[test]
    fn test_object_equality_ignores_order() {
        let a = Value::object([("a", Value::Integer(1)), ("b", Value::Integer(2))]);
        let b = Value::object([("b", Value::Integer(2)), ("a", Value::Integer(1))]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_integer_and_float_are_distinct() {
        assert_ne!(Value::Integer(1), Value::Float(1.0));
    }

    #[test]
    fn test_find_keyed_element() {
        let list = Value::list([keyed("x", 1), keyed("y", 2)]);
        assert_eq!(list.find_keyed("y").and_then(|v| v.property("data")), Some(&Value::Integer(2)));
        assert!(list.find_keyed("z").is_none());
    }

    #[test]
    fn test_integer_key_matches_bracket_text() {
        let element = Value::object([("key", Value::Integer(3))]);
        assert_eq!(element.element_key().as_deref(), Some("3"));
    }

    #[test]
    fn test_upsert_replaces_and_appends() {
        let list = Value::list([keyed("a", 1), keyed("b", 2)]);
        let updated = list.with_upserted_element(keyed("a", 9));

        let items = updated.as_list().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].element_key().as_deref(), Some("b"));
        assert_eq!(items[1], keyed("a", 9));
        // Original is untouched.
        assert_eq!(list.as_list().unwrap()[0], keyed("a", 1));
    }

    #[test]
    fn test_with_property_returns_new_value() {
        let original = Value::object([("a", Value::Integer(1))]);
        let changed = original.with_property("b", Value::Bool(true));
        assert!(original.property("b").is_none());
        assert_eq!(changed.property("b"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_falsy_values() {
        for v in [
            Value::Absent,
            Value::Bool(false),
            Value::Integer(0),
            Value::text("False"),
            Value::text(" no "),
            Value::text(""),
        ] {
            assert!(v.is_falsy(), "{v:?} should be false-ish");
        }
        for v in [Value::Bool(true), Value::text("yes"), Value::Integer(2), Value::list([])] {
            assert!(!v.is_falsy(), "{v:?} should be true-ish");
        }
    }

    #[test]
    fn test_display_scalars() {
        assert_eq!(Value::text("hi").to_string(), "hi");
        assert_eq!(Value::Integer(42).to_string(), "42");
        assert_eq!(Value::Absent.to_string(), "");
        assert_eq!(Value::list([Value::Integer(1)]).to_string(), "[1]");
    }
}
