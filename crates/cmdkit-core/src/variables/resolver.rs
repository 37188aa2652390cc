//! Recursive `{{ }}` resolution over value trees.
//!
//! Resolution rules:
//! - A text that is exactly one reference becomes the referenced value,
//!   itself resolved, whatever its kind.
//! - A reference embedded in surrounding text must resolve to text; the
//!   result is spliced in and the rewritten text is scanned again, which is
//!   how `{{ hosts[{{ env }}].url }}` works (innermost reference first).
//! - Objects and lists resolve element by element.
//! - Values marked verbatim are returned untouched.
//!
//! Every nested resolution costs one level of depth. Each branch of an
//! object or list carries its own count; exceeding the limit is reported as
//! a circular reference.

use std::sync::Arc;

use cmdkit_types::config::{DEFAULT_MAX_RESOLUTION_DEPTH, EngineConfig};
use cmdkit_types::error::CommandError;
use cmdkit_types::path::{CLOSE, OPEN, extract_reference, wrap_reference};
use cmdkit_types::value::{Map, Value};

use super::store::VariableStore;

/// Resolves templates against a [`VariableStore`].
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    store: &'a VariableStore,
    max_depth: u32,
    escape_markup: bool,
}

impl<'a> Resolver<'a> {
    /// Resolver with default settings: depth 50, markup escaping on.
    pub fn new(store: &'a VariableStore) -> Self {
        Self {
            store,
            max_depth: DEFAULT_MAX_RESOLUTION_DEPTH,
            escape_markup: true,
        }
    }

    pub fn with_config(store: &'a VariableStore, config: &EngineConfig) -> Self {
        Self {
            store,
            max_depth: config.max_resolution_depth,
            escape_markup: config.escape_markup,
        }
    }

    pub fn store(&self) -> &'a VariableStore {
        self.store
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Resolve a value.
    ///
    /// With `as_variable`, a text value is read as a variable path rather
    /// than a template: `token` resolves like `{{ token }}`.
    pub fn resolve(&self, value: &Value, as_variable: bool) -> Result<Value, CommandError> {
        self.resolve_at(value, as_variable, 0)
    }

    /// Follow references in `text` without resolving the final target.
    ///
    /// Embedded references are substituted as usual until the text is a single
    /// whole reference; the raw stored value it points to is returned. `None`
    /// means the text holds no reference at all.
    pub fn dereference(&self, text: &str) -> Result<Option<Value>, CommandError> {
        let mut text = text.to_string();
        let mut depth = 1;
        loop {
            let Some(reference) = extract_reference(&text) else {
                return Ok(None);
            };
            if reference.is_whole(&text) {
                return self.store.lookup(reference.path).map(Some);
            }
            let (start, end) = (reference.start, reference.end);
            let nested = inside_reference(&text[..start]);
            let substitution = self.embedded_text(reference.path, nested, &mut depth)?;
            text.replace_range(start..end, &substitution);
        }
    }

    fn resolve_at(
        &self,
        value: &Value,
        as_variable: bool,
        depth: u32,
    ) -> Result<Value, CommandError> {
        let depth = depth + 1;
        if depth > self.max_depth {
            return Err(self.too_deep(value));
        }

        match value {
            Value::Verbatim(_) => Ok(value.clone()),
            Value::Text(_) | Value::LazyText(_) => {
                let raw = value.as_str().unwrap_or_default();
                let text = if as_variable {
                    wrap_reference(raw)
                } else {
                    raw.to_string()
                };
                if extract_reference(&text).is_none() {
                    return Ok(value.clone());
                }
                self.resolve_text(text, depth)
            }
            Value::Object(map) => {
                let mut resolved = Map::with_capacity(map.len());
                for (key, item) in map.iter() {
                    resolved.insert(key.clone(), self.resolve_at(item, false, depth)?);
                }
                Ok(Value::Object(Arc::new(resolved)))
            }
            Value::List(items) => {
                let resolved = items
                    .iter()
                    .map(|item| self.resolve_at(item, false, depth))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::from(resolved))
            }
            Value::Absent
            | Value::DateTime(_)
            | Value::Bool(_)
            | Value::Integer(_)
            | Value::Float(_)
            | Value::LazyBinary(_) => Ok(value.clone()),
        }
    }

    fn resolve_text(&self, mut text: String, depth: u32) -> Result<Value, CommandError> {
        let mut depth = depth;
        loop {
            let Some(reference) = extract_reference(&text) else {
                return Ok(Value::Text(text));
            };
            tracing::trace!(path = reference.path, depth, "resolving reference");

            if reference.is_whole(&text) {
                let referenced = self.store.lookup(reference.path)?;
                if referenced.is_absent() {
                    return Ok(Value::Absent);
                }
                return self
                    .resolve_at(&referenced, false, depth)
                    .map_err(|err| rewrap_too_deep(err, &text));
            }

            let (start, end) = (reference.start, reference.end);
            let nested = inside_reference(&text[..start]);
            let substitution = self.embedded_text(reference.path, nested, &mut depth)?;
            text.replace_range(start..end, &substitution);
        }
    }

    /// Text to splice in place of an embedded reference.
    ///
    /// Absent references splice in nothing. A substitution that brings new
    /// `{{` markers with it counts as one more level of depth, so a verbatim
    /// value that re-inserts its own reference cannot loop forever.
    /// A `nested` splice becomes part of an enclosing reference's path and is
    /// never markup-escaped.
    fn embedded_text(
        &self,
        path: &str,
        nested: bool,
        depth: &mut u32,
    ) -> Result<String, CommandError> {
        let referenced = self.store.lookup(path)?;
        if referenced.is_absent() {
            return Ok(String::new());
        }

        let resolved = self.resolve_at(&referenced, false, *depth)?;
        let Some(text) = resolved.as_str() else {
            return Err(CommandError::resolution(format!(
                "'{path}' resolves to a {} value, which cannot be embedded in text",
                resolved.value_type()
            )));
        };

        if text.contains(OPEN) {
            *depth += 1;
            if *depth > self.max_depth {
                return Err(self.too_deep(&resolved));
            }
        }

        Ok(if self.escape_markup && !nested {
            escape_markup(text)
        } else {
            text.to_string()
        })
    }

    fn too_deep(&self, value: &Value) -> CommandError {
        let path = value
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| value.value_type().to_string());
        tracing::warn!(path = %path, max = self.max_depth, "resolution depth exceeded");
        CommandError::CircularReference {
            path,
            max_depth: self.max_depth,
            unresolved: value.clone(),
        }
    }

}

/// Report a runaway whole-string reference against the outermost text.
fn rewrap_too_deep(err: CommandError, text: &str) -> CommandError {
    match err {
        CommandError::CircularReference {
            max_depth,
            unresolved,
            ..
        } => CommandError::CircularReference {
            path: text.to_string(),
            max_depth,
            unresolved,
        },
        other => other,
    }
}

/// Whether a splice after `prefix` lands inside an unclosed `{{`.
fn inside_reference(prefix: &str) -> bool {
    prefix.matches(OPEN).count() > prefix.matches(CLOSE).count()
}

/// Escape markup-control characters so substituted text renders literally.
///
/// Styled terminal output treats `[` and `]` as tag delimiters; doubling
/// them turns them back into plain brackets.
pub fn escape_markup(text: &str) -> String {
    if !text.contains(['[', ']']) {
        return text.to_string();
    }
    let mut escaped = String::with_capacity(text.len() + 4);
    for c in text.chars() {
        match c {
            '[' => escaped.push_str("[["),
            ']' => escaped.push_str("]]"),
            other => escaped.push(other),
        }
    }
    escaped
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
