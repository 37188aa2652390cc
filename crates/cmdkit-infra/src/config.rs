//! Engine configuration loader for cmdkit.
//!
//! Reads `config.toml` from the data directory (`~/.cmdkit/` in production)
//! and deserializes it into [`EngineConfig`]. Falls back to defaults when
//! the file is missing or malformed.

use std::path::Path;

use cmdkit_core::variables::store::BUILTIN_SOURCE;
use cmdkit_types::config::EngineConfig;
use cmdkit_types::variable::Variable;

/// Lowest accepted resolution depth.
const MIN_RESOLUTION_DEPTH: u32 = 1;

/// Load engine configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`EngineConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - A `max_resolution_depth` of zero is raised to one.
pub async fn load_engine_config(data_dir: &Path) -> EngineConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return EngineConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return EngineConfig::default();
        }
    };

    match toml::from_str::<EngineConfig>(&content) {
        Ok(mut config) => {
            config.max_resolution_depth = config.max_resolution_depth.max(MIN_RESOLUTION_DEPTH);
            config
        }
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            EngineConfig::default()
        }
    }
}

/// The `[builtin_variables]` table as variables for the BuiltIn layer.
pub fn builtin_variables(config: &EngineConfig) -> Vec<Variable> {
    config
        .builtin_variables
        .iter()
        .map(|(key, value)| Variable::new(key.clone(), value.clone()).with_source(BUILTIN_SOURCE))
        .collect()
}
