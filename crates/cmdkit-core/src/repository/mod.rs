//! Variable persistence port.
//!
//! The engine never touches storage itself. A host loads the persisted
//! layers into a [`VariableStore`] before a run and saves them afterwards;
//! implementations live in cmdkit-infra.

pub mod memory;

use cmdkit_types::error::RepositoryError;
use cmdkit_types::variable::{Scope, Variable};

use crate::variables::VariableStore;
use crate::variables::store::{APPLICATION_SOURCE, BUILTIN_SOURCE};

/// Repository trait for scoped variable persistence.
///
/// A scope holds any number of sources (a session name, `application`, a
/// builtin bundle); each source is an ordered variable list.
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait VariableRepository: Send + Sync {
    /// Load one source. A source that was never saved is empty.
    fn load(
        &self,
        scope: Scope,
        source: &str,
    ) -> impl std::future::Future<Output = Result<Vec<Variable>, RepositoryError>> + Send;

    /// Replace one source with `variables`.
    fn save(
        &self,
        scope: Scope,
        source: &str,
        variables: &[Variable],
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Every source saved under a scope.
    fn sources(
        &self,
        scope: Scope,
    ) -> impl std::future::Future<Output = Result<Vec<String>, RepositoryError>> + Send;
}

/// The source a scope's unowned variables are saved to.
pub fn default_source(scope: Scope, session: &str) -> &str {
    match scope {
        Scope::Session => session,
        Scope::Application => APPLICATION_SOURCE,
        Scope::BuiltIn | Scope::Command => BUILTIN_SOURCE,
    }
}

/// Load the given sources of a scope into the store. Returns the number of
/// variables loaded. Each variable is tagged with the source it came from.
pub async fn load_sources<R: VariableRepository>(
    repo: &R,
    store: &mut VariableStore,
    scope: Scope,
    sources: &[String],
) -> Result<usize, RepositoryError> {
    let mut loaded = 0;
    for source in sources {
        let variables = repo.load(scope, source).await?;
        loaded += variables.len();
        store.load_layer(
            scope,
            variables.into_iter().map(|v| Variable {
                source: Some(source.clone()),
                ..v
            }),
        );
    }
    tracing::debug!(%scope, sources = sources.len(), loaded, "variable layer loaded");
    Ok(loaded)
}

/// Load every saved source of a scope.
pub async fn load_scope<R: VariableRepository>(
    repo: &R,
    store: &mut VariableStore,
    scope: Scope,
) -> Result<usize, RepositoryError> {
    let sources = repo.sources(scope).await?;
    load_sources(repo, store, scope, &sources).await
}

/// Save a scope back, one call per owning source. Returns the number of
/// sources written.
///
/// A saved source that no longer owns any variable (a broader write cleared
/// its last one) is rewritten empty. For the session scope only the active
/// session's source is considered, since other sessions were never loaded.
pub async fn save_scope<R: VariableRepository>(
    repo: &R,
    store: &VariableStore,
    scope: Scope,
    session: &str,
) -> Result<usize, RepositoryError> {
    let grouped = store.variables_by_source(scope, default_source(scope, session));
    for (source, variables) in &grouped {
        repo.save(scope, source, variables).await?;
    }

    let emptied: Vec<String> = repo
        .sources(scope)
        .await?
        .into_iter()
        .filter(|source| !grouped.contains_key(source))
        .filter(|source| scope != Scope::Session || source == session)
        .collect();
    for source in &emptied {
        repo.save(scope, source, &[]).await?;
    }

    let written = grouped.len() + emptied.len();
    tracing::debug!(%scope, sources = written, emptied = emptied.len(), "variable layer saved");
    Ok(written)
}
