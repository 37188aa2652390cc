//! Engine configuration types.
//!
//! `EngineConfig` is the top-level `config.toml` that tunes resolution and
//! seeds the builtin variable layer.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Default cap on nested resolution before a reference is declared circular.
pub const DEFAULT_MAX_RESOLUTION_DEPTH: u32 = 50;

/// Top-level configuration for the command engine.
///
/// Loaded from `~/.cmdkit/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How deep nested `{{ }}` resolution may go.
    #[serde(default = "default_max_resolution_depth")]
    pub max_resolution_depth: u32,

    /// Escape markup-control characters in text substituted into a template,
    /// so variable content cannot inject styling into rendered output.
    #[serde(default = "default_escape_markup")]
    pub escape_markup: bool,

    /// Session used when none is named on the command line.
    #[serde(default = "default_session")]
    pub default_session: String,

    /// Variables loaded into the builtin layer at startup.
    #[serde(default)]
    pub builtin_variables: IndexMap<String, Value>,
}

fn default_max_resolution_depth() -> u32 {
    DEFAULT_MAX_RESOLUTION_DEPTH
}

fn default_escape_markup() -> bool {
    true
}

fn default_session() -> String {
    "default".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_resolution_depth: default_max_resolution_depth(),
            escape_markup: default_escape_markup(),
            default_session: default_session(),
            builtin_variables: IndexMap::new(),
        }
    }
}
