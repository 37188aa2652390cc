//! Operation catalogue for runtime lookup by name.
//!
//! A case-insensitive registry of zero-argument constructors. Each call to
//! [`OperationCatalogue::create`] returns a new, unbound instance.

use indexmap::IndexMap;

use super::BoxOperation;

/// Builds a fresh operation with its parameters declared.
pub type Constructor = fn() -> BoxOperation;

/// Registry of available operations, indexed by name.
pub struct OperationCatalogue {
    /// Lower-cased name → (registered name, constructor).
    constructors: IndexMap<String, (String, Constructor)>,
}

impl OperationCatalogue {
    /// Create an empty catalogue.
    pub fn new() -> Self {
        Self {
            constructors: IndexMap::new(),
        }
    }

    /// A catalogue holding the built-in operations.
    pub fn with_builtins() -> Self {
        let mut catalogue = Self::new();
        crate::operations::register_builtins(&mut catalogue);
        catalogue
    }

    /// Register a constructor under the given name.
    ///
    /// If an operation with this name already exists, it is replaced.
    pub fn register(&mut self, name: impl Into<String>, constructor: Constructor) {
        let name = name.into();
        self.constructors
            .insert(name.to_ascii_lowercase(), (name, constructor));
    }

    /// Instantiate an operation by name, ignoring case.
    pub fn create(&self, name: &str) -> Option<BoxOperation> {
        self.constructors
            .get(&name.trim().to_ascii_lowercase())
            .map(|(_, constructor)| constructor())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors
            .contains_key(&name.trim().to_ascii_lowercase())
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.constructors
            .values()
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

impl Default for OperationCatalogue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::{Block, Log};

    #[test]
    fn test_create_is_case_insensitive() {
        let catalogue = OperationCatalogue::with_builtins();
        let op = catalogue.create("foreach").unwrap();
        assert_eq!(op.name(), "ForEach");
        assert!(op.is_aggregate());
        assert!(catalogue.create("  SETVARIABLE ").is_some());
        assert!(catalogue.create("Unknown").is_none());
    }

    #[test]
    fn test_each_create_is_a_new_instance() {
        let catalogue = OperationCatalogue::with_builtins();
        let mut first = catalogue.create("Log").unwrap();
        first
            .state_mut()
            .parameters
            .bind("message", cmdkit_types::value::Value::text("bound"));
        let second = catalogue.create("Log").unwrap();
        assert!(second.parameters().get("message").unwrap().original.is_none());
    }

    #[test]
    fn test_register_replaces_existing() {
        let mut catalogue = OperationCatalogue::new();
        catalogue.register("Step", Log::boxed);
        catalogue.register("STEP", Block::boxed);
        assert_eq!(catalogue.names(), vec!["STEP"]);
        assert!(catalogue.create("step").unwrap().is_aggregate());
    }

    #[test]
    fn test_builtin_names() {
        let catalogue = OperationCatalogue::with_builtins();
        assert_eq!(
            catalogue.names(),
            vec!["Block", "ForEach", "SetVariable", "Log"]
        );
    }
}
