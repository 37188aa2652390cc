//! Application state wiring the engine to its persistence.
//!
//! AppState pins the engine's repository port to the filesystem
//! implementation and owns everything a CLI command needs: the data
//! directory, the loaded configuration, and the operation catalogue.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use cmdkit_core::command::ExecutionContext;
use cmdkit_core::operation::OperationCatalogue;
use cmdkit_core::repository::{load_scope, load_sources, save_scope};
use cmdkit_core::variables::VariableStore;
use cmdkit_infra::config::{builtin_variables, load_engine_config};
use cmdkit_infra::filesystem::resolve_data_dir;
use cmdkit_infra::storage::FsVariableRepository;
use cmdkit_types::config::EngineConfig;
use cmdkit_types::variable::Scope;
use tokio_util::sync::CancellationToken;

/// Scopes written back to disk after a command changes them.
const PERSISTED_SCOPES: [Scope; 2] = [Scope::Session, Scope::Application];

/// Shared application state.
pub struct AppState {
    pub data_dir: PathBuf,
    pub config: EngineConfig,
    pub repository: FsVariableRepository,
    pub catalogue: Arc<OperationCatalogue>,
}

impl AppState {
    /// Initialize the application state: data directory, config, repository.
    pub async fn init(data_dir: Option<PathBuf>) -> anyhow::Result<Self> {
        let data_dir = data_dir.unwrap_or_else(resolve_data_dir);

        // Ensure data directory exists
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let config = load_engine_config(&data_dir).await;
        let repository = FsVariableRepository::new(&data_dir);

        tracing::debug!(data_dir = %data_dir.display(), "application state initialized");

        Ok(Self {
            data_dir,
            config,
            repository,
            catalogue: Arc::new(OperationCatalogue::with_builtins()),
        })
    }

    /// The session named on the command line, or the configured default.
    pub fn session_name(&self, session: Option<String>) -> String {
        session.unwrap_or_else(|| self.config.default_session.clone())
    }

    /// Load every persisted layer visible to `session`.
    ///
    /// The BuiltIn layer is the config's `[builtin_variables]` overlaid with
    /// any saved builtin sources. Only the active session's source is loaded
    /// into the Session layer.
    pub async fn load_store(&self, session: &str) -> anyhow::Result<VariableStore> {
        let mut store = VariableStore::new();
        store.load_layer(Scope::BuiltIn, builtin_variables(&self.config));
        load_scope(&self.repository, &mut store, Scope::BuiltIn).await?;
        load_scope(&self.repository, &mut store, Scope::Application).await?;
        load_sources(
            &self.repository,
            &mut store,
            Scope::Session,
            &[session.to_string()],
        )
        .await?;
        Ok(store)
    }

    /// Persist the Session and Application layers.
    pub async fn save_store(&self, store: &VariableStore, session: &str) -> anyhow::Result<()> {
        for scope in PERSISTED_SCOPES {
            save_scope(&self.repository, store, scope, session)
                .await
                .with_context(|| format!("failed to save {scope} variables"))?;
        }
        Ok(())
    }

    /// An execution context over `store`, bound to `session` and `cancel`.
    pub fn context(
        &self,
        store: VariableStore,
        session: &str,
        cancel: CancellationToken,
    ) -> ExecutionContext {
        ExecutionContext::new(store, Arc::clone(&self.catalogue), self.config.clone())
            .with_session(session)
            .with_cancellation(cancel)
    }
}
