//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both the CLI and
//! the HTTP/WebSocket layer. Core components are generic over the
//! ledger/repository ports, but AppState pins them to the SQLite infra
//! implementations.

use std::path::PathBuf;
use std::sync::Arc;

use samvad_core::events::SessionEventBus;
use samvad_core::session::registry::SessionRegistry;
use samvad_infra::config::{load_global_config, resolve_data_dir};
use samvad_infra::sqlite::message::SqliteMessageRepository;
use samvad_infra::sqlite::pool::DatabasePool;
use samvad_infra::sqlite::rates::SqliteRateCatalogue;
use samvad_infra::sqlite::session::SqliteSessionRepository;
use samvad_infra::sqlite::token::SqliteTokenAuth;
use samvad_infra::sqlite::user::SqliteUserStore;
use samvad_infra::sqlite::wallet::SqliteWalletLedger;
use samvad_types::config::SessionPolicy;

/// Concrete registry type pinned to the SQLite infra implementations.
pub type ConcreteRegistry =
    SessionRegistry<SqliteWalletLedger, SqliteSessionRepository, SqliteMessageRepository>;

/// Shared application state holding all services.
///
/// Used by CLI commands, REST handlers, and the WebSocket gateway.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ConcreteRegistry>,
    pub auth: Arc<SqliteTokenAuth>,
    pub sessions: Arc<SqliteSessionRepository>,
    pub messages: Arc<SqliteMessageRepository>,
    pub ledger: Arc<SqliteWalletLedger>,
    pub catalogue: Arc<SqliteRateCatalogue>,
    pub users: Arc<SqliteUserStore>,
    pub policy: SessionPolicy,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: connect to the DB, load config,
    /// wire services.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();

        // Ensure data directory exists
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_global_config(&data_dir).await;
        let policy = config.session;

        // Initialize database
        let db_url = format!("sqlite://{}?mode=rwc", data_dir.join("samvad.db").display());
        let db_pool = DatabasePool::new(&db_url).await?;

        let sessions = Arc::new(SqliteSessionRepository::new(db_pool.clone()));
        let messages = Arc::new(SqliteMessageRepository::new(db_pool.clone()));
        let ledger = Arc::new(SqliteWalletLedger::new(db_pool.clone()));
        let catalogue = Arc::new(SqliteRateCatalogue::new(db_pool.clone()));
        let users = Arc::new(SqliteUserStore::new(db_pool.clone()));
        let auth = Arc::new(SqliteTokenAuth::new(db_pool.clone()));

        let registry = Arc::new(SessionRegistry::new(
            Arc::clone(&ledger),
            Arc::clone(&sessions),
            Arc::clone(&messages),
            policy.clone(),
            SessionEventBus::new(),
        ));

        Ok(Self {
            registry,
            auth,
            sessions,
            messages,
            ledger,
            catalogue,
            users,
            policy,
            data_dir,
            db_pool,
        })
    }
}
