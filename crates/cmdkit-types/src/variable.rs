//! Scoped variables.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// The layer a variable lives in.
///
/// Variants are ordered from narrowest to broadest lifetime, so
/// `scope >= Scope::Session` reads as "session-wide or broader".
/// Read precedence is the same order: Command wins over Session, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Transient, cleared at the start and end of every command run.
    Command,
    /// Persisted per named session.
    Session,
    /// Persisted for the whole installation.
    Application,
    /// Shipped defaults, read-only once loaded.
    BuiltIn,
}

impl Scope {
    /// All scopes in read-precedence order.
    pub const PRECEDENCE: [Scope; 4] = [
        Scope::Command,
        Scope::Session,
        Scope::Application,
        Scope::BuiltIn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Command => "command",
            Scope::Session => "session",
            Scope::Application => "application",
            Scope::BuiltIn => "builtin",
        }
    }

    /// Position in [`Scope::PRECEDENCE`].
    pub fn index(&self) -> usize {
        match self {
            Scope::Command => 0,
            Scope::Session => 1,
            Scope::Application => 2,
            Scope::BuiltIn => 3,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "command" => Ok(Scope::Command),
            "session" => Ok(Scope::Session),
            "application" | "app" => Ok(Scope::Application),
            "builtin" | "built-in" => Ok(Scope::BuiltIn),
            other => Err(format!("unknown scope: '{other}'")),
        }
    }
}

/// A named value in one scope layer.
///
/// `source` names the repository element (session file, application file,
/// builtin bundle) the variable belongs to, so the layer can be saved back
/// to where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub key: String,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Variable {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_ordering_is_narrow_to_broad() {
        assert!(Scope::Command < Scope::Session);
        assert!(Scope::Session < Scope::Application);
        assert!(Scope::Application < Scope::BuiltIn);
        assert!(Scope::Application >= Scope::Session);
    }

    #[test]
    fn test_precedence_matches_index() {
        for (i, scope) in Scope::PRECEDENCE.iter().enumerate() {
            assert_eq!(scope.index(), i);
        }
    }

    #[test]
    fn test_scope_from_str() {
        assert_eq!("Session".parse::<Scope>().unwrap(), Scope::Session);
        assert_eq!("app".parse::<Scope>().unwrap(), Scope::Application);
        assert!("global".parse::<Scope>().is_err());
    }

    #[test]
    fn test_scope_serde_names() {
        assert_eq!(serde_json::to_string(&Scope::BuiltIn).unwrap(), "\"builtin\"");
        let scope: Scope = serde_json::from_str("\"application\"").unwrap();
        assert_eq!(scope, Scope::Application);
    }

    #[test]
    fn test_variable_serde_roundtrip() {
        let var = Variable::new("token", Value::text("abc")).with_source("dev");
        let json = serde_json::to_string(&var).unwrap();
        let parsed: Variable = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, var);
    }
}
