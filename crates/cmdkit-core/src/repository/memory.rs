//! In-memory `VariableRepository`, for tests and embedding.

use std::collections::BTreeMap;
use std::sync::Mutex;

use cmdkit_types::error::RepositoryError;
use cmdkit_types::variable::{Scope, Variable};

use super::VariableRepository;

/// Keeps every saved source in a map. Cloning variables on load keeps the
/// stored copy independent of the caller's store.
#[derive(Debug, Default)]
pub struct InMemoryVariableRepository {
    sources: Mutex<BTreeMap<(Scope, String), Vec<Variable>>>,
}

impl InMemoryVariableRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, BTreeMap<(Scope, String), Vec<Variable>>>, RepositoryError>
    {
        self.sources
            .lock()
            .map_err(|_| RepositoryError::Serialization("repository lock poisoned".to_string()))
    }
}

impl VariableRepository for InMemoryVariableRepository {
    async fn load(&self, scope: Scope, source: &str) -> Result<Vec<Variable>, RepositoryError> {
        Ok(self
            .lock()?
            .get(&(scope, source.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn save(
        &self,
        scope: Scope,
        source: &str,
        variables: &[Variable],
    ) -> Result<(), RepositoryError> {
        self.lock()?
            .insert((scope, source.to_string()), variables.to_vec());
        Ok(())
    }

    async fn sources(&self, scope: Scope) -> Result<Vec<String>, RepositoryError> {
        Ok(self
            .lock()?
            .keys()
            .filter(|(s, _)| *s == scope)
            .map(|(_, source)| source.clone())
            .collect())
    }
}
