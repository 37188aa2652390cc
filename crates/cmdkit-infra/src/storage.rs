//! Filesystem-backed variable repository.
//!
//! Implements the `VariableRepository` trait from `cmdkit-core` with one
//! JSON file per source at `{data_dir}/variables/{scope}/{source}.json`.

use std::path::{Path, PathBuf};

use cmdkit_core::repository::VariableRepository;
use cmdkit_types::error::RepositoryError;
use cmdkit_types::variable::{Scope, Variable};

use crate::filesystem::variables_dir;

/// Local filesystem variable store.
///
/// Each file holds a JSON array of `{ "key": ..., "value": ... }` entries in
/// layer order. The file name is the source id, so entries carry no source
/// of their own on disk.
pub struct FsVariableRepository {
    root: PathBuf,
}

impl FsVariableRepository {
    /// Create a repository rooted at `{data_dir}/variables`.
    pub fn new(data_dir: &Path) -> Self {
        Self {
            root: variables_dir(data_dir),
        }
    }

    fn scope_dir(&self, scope: Scope) -> PathBuf {
        self.root.join(scope.as_str())
    }

    fn source_path(&self, scope: Scope, source: &str) -> Result<PathBuf, RepositoryError> {
        validate_source(source)?;
        Ok(self.scope_dir(scope).join(format!("{source}.json")))
    }
}

/// Source ids become file names: letters, digits, `-`, `_` and `.` only,
/// not starting with a dot.
fn validate_source(source: &str) -> Result<(), RepositoryError> {
    let valid = !source.is_empty()
        && !source.starts_with('.')
        && source
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(RepositoryError::InvalidSource(source.to_string()))
    }
}

impl VariableRepository for FsVariableRepository {
    async fn load(&self, scope: Scope, source: &str) -> Result<Vec<Variable>, RepositoryError> {
        let path = self.source_path(scope, source)?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let variables: Vec<Variable> = serde_json::from_str(&content).map_err(|e| {
            RepositoryError::Serialization(format!("{}: {e}", path.display()))
        })?;
        tracing::debug!(path = %path.display(), count = variables.len(), "variables loaded");
        Ok(variables)
    }

    async fn save(
        &self,
        scope: Scope,
        source: &str,
        variables: &[Variable],
    ) -> Result<(), RepositoryError> {
        let path = self.source_path(scope, source)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let stored: Vec<Variable> = variables
            .iter()
            .map(|v| Variable::new(v.key.clone(), v.value.clone()))
            .collect();
        let json = serde_json::to_string_pretty(&stored)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        // Readers never observe a partially written file.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        tracing::debug!(path = %path.display(), count = stored.len(), "variables saved");
        Ok(())
    }

    async fn sources(&self, scope: Scope) -> Result<Vec<String>, RepositoryError> {
        let mut entries = match tokio::fs::read_dir(self.scope_dir(scope)).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut sources = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if validate_source(stem).is_ok() {
                    sources.push(stem.to_string());
                }
            }
        }
        sources.sort();
        Ok(sources)
    }
}
