//! Data directory layout.
//!
//! ```text
//! {data_dir}/
//!   config.toml
//!   variables/
//!     builtin/{source}.json
//!     application/{source}.json
//!     session/{source}.json
//! ```

use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "CMDKIT_DATA_DIR";

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `CMDKIT_DATA_DIR` environment variable
/// 2. `~/.cmdkit`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".cmdkit");
    }

    // Last resort: current directory
    PathBuf::from(".cmdkit")
}

/// Root of the persisted variable layers: `{data_dir}/variables`.
pub fn variables_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("variables")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variables_dir() {
        assert_eq!(
            variables_dir(Path::new("/home/user/.cmdkit")),
            PathBuf::from("/home/user/.cmdkit/variables")
        );
    }

    #[test]
    fn test_resolve_data_dir_from_env() {
        // SAFETY: This test is single-threaded and restores the env var immediately.
        unsafe {
            std::env::set_var(DATA_DIR_ENV, "/tmp/test-cmdkit");
        }
        let dir = resolve_data_dir();
        assert_eq!(dir, PathBuf::from("/tmp/test-cmdkit"));
        unsafe {
            std::env::remove_var(DATA_DIR_ENV);
        }
    }
}
