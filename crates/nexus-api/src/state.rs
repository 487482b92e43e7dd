//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both CLI and REST API.
//! `SessionService` is generic over repository traits; AppState pins it to
//! the SQLite implementations.

use std::sync::Arc;

use nexus_core::llm::box_provider::BoxLlmProvider;
use nexus_core::session::executor::{CallPolicy, TaskExecutor};
use nexus_core::session::service::SessionService;
use nexus_infra::config::{load_global_config, resolve_data_dir};
use nexus_infra::llm::provider_from_settings;
use nexus_infra::sqlite::pool::{DatabasePool, database_url};
use nexus_infra::sqlite::roster::SqliteRosterRepository;
use nexus_infra::sqlite::session::SqliteSessionRepository;
use nexus_types::config::GlobalConfig;

pub type ConcreteSessionService = SessionService<SqliteSessionRepository, SqliteRosterRepository>;

/// Shared application state holding all services.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub session_service: Arc<ConcreteSessionService>,
    pub config: Arc<GlobalConfig>,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: load config, connect to DB, wire services.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_global_config(&data_dir).await;
        let db_pool = DatabasePool::new(&database_url(&data_dir)).await?;
        let provider = provider_from_settings(&config.provider);

        Ok(Self::assemble(config, db_pool, provider))
    }

    /// Wire services from already-built parts.
    pub fn assemble(
        config: GlobalConfig,
        db_pool: DatabasePool,
        provider: BoxLlmProvider,
    ) -> Self {
        let executor = TaskExecutor::new(
            Arc::new(provider),
            CallPolicy::from_settings(&config.execution),
        );
        let session_service = SessionService::new(
            SqliteSessionRepository::new(db_pool.clone()),
            SqliteRosterRepository::new(db_pool.clone()),
            executor,
            &config.execution,
        );

        Self {
            session_service: Arc::new(session_service),
            config: Arc::new(config),
            db_pool,
        }
    }
}
