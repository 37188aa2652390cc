//! Execution context threaded through a command run.
//!
//! `ExecutionContext` owns the variable store for the run, the operation
//! catalogue, the engine configuration, and the cancellation token. Every
//! operation receives it mutably; nothing in the engine is global.

use std::sync::Arc;

use cmdkit_types::config::EngineConfig;
use cmdkit_types::error::CommandError;
use cmdkit_types::value::Value;
use cmdkit_types::variable::Scope;
use tokio_util::sync::CancellationToken;

use crate::operation::{OperationCatalogue, OperationFactory};
use crate::variables::{Resolver, VariableStore};

/// Counters collected while a command runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Operations whose run completed, nested ones included.
    pub executed: usize,
    /// Operations skipped by `enabled` or their conditions.
    pub skipped: usize,
    /// Whether the run stopped early on cancellation.
    pub cancelled: bool,
}

/// Mutable state for one engine instance.
pub struct ExecutionContext {
    store: VariableStore,
    session: String,
    catalogue: Arc<OperationCatalogue>,
    config: EngineConfig,
    cancel: CancellationToken,
    stats: RunStats,
}

impl ExecutionContext {
    pub fn new(store: VariableStore, catalogue: Arc<OperationCatalogue>, config: EngineConfig) -> Self {
        Self {
            store,
            session: config.default_session.clone(),
            catalogue,
            config,
            cancel: CancellationToken::new(),
            stats: RunStats::default(),
        }
    }

    /// Name the active session, the default owner of session writes.
    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = session.into();
        self
    }

    /// Share an externally owned cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn store(&self) -> &VariableStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut VariableStore {
        &mut self.store
    }

    pub fn into_store(self) -> VariableStore {
        self.store
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalogue(&self) -> &OperationCatalogue {
        &self.catalogue
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut RunStats {
        &mut self.stats
    }

    /// A resolver over the current store.
    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::with_config(&self.store, &self.config)
    }

    /// A factory over the current store and catalogue.
    pub fn factory(&self) -> OperationFactory<'_> {
        OperationFactory::new(&self.catalogue, self.resolver())
    }

    pub fn resolve(&self, value: &Value, as_variable: bool) -> Result<Value, CommandError> {
        self.resolver().resolve(value, as_variable)
    }

    /// Write through the store's writer under the active session.
    pub fn write(
        &mut self,
        scope: Scope,
        path: &str,
        value: Value,
        source: Option<String>,
    ) -> Result<(), CommandError> {
        self.store.write(scope, &self.session, path, value, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_defaults() {
        let ctx = ExecutionContext::new(
            VariableStore::new(),
            Arc::new(OperationCatalogue::with_builtins()),
            EngineConfig::default(),
        );
        assert_eq!(ctx.session(), "default");
        assert!(!ctx.is_cancelled());
        assert_eq!(ctx.stats(), RunStats::default());
    }

    #[test]
    fn test_write_uses_active_session() {
        let mut ctx = ExecutionContext::new(
            VariableStore::new(),
            Arc::new(OperationCatalogue::new()),
            EngineConfig::default(),
        )
        .with_session("staging");
        ctx.write(Scope::Session, "k", Value::Integer(1), None).unwrap();
        assert_eq!(
            ctx.store().get(Scope::Session, "k").unwrap().source.as_deref(),
            Some("staging")
        );
        assert_eq!(ctx.resolve(&Value::text("{{ k }}"), false).unwrap(), Value::Integer(1));
    }

    #[test]
    fn test_shared_cancellation_token() {
        let token = CancellationToken::new();
        let ctx = ExecutionContext::new(
            VariableStore::new(),
            Arc::new(OperationCatalogue::new()),
            EngineConfig::default(),
        )
        .with_cancellation(token.clone());
        token.cancel();
        assert!(ctx.is_cancelled());
    }
}
