use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{BrookError, Result};
use crate::client::http_client::HttpApiClient;
use crate::config::Config;
use crate::notify::NotificationSink;
use crate::reader::AutoMarkReadTimer;
use crate::store::{CachePersistence, CacheStore, SqliteCache};
use crate::sync::RefreshCoordinator;

/// Wires the cache, the HTTP client, the sync coordinator and the reader
/// timer together for one process.
pub struct AppContext {
    pub config: Config,
    pub cache: Arc<CacheStore>,
    pub persistence: Arc<SqliteCache>,
    pub api: Arc<HttpApiClient>,
    pub coordinator: Arc<RefreshCoordinator>,
    pub reader: AutoMarkReadTimer,
}

impl AppContext {
    pub fn new(
        config: Config,
        db_path: Option<PathBuf>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Result<Self> {
        let db_path = match db_path {
            Some(p) => p,
            None => Self::default_db_path()?,
        };
        let persistence = Arc::new(SqliteCache::new(&db_path)?);
        Self::build(config, persistence, notifier)
    }

    pub fn in_memory(config: Config, notifier: Arc<dyn NotificationSink>) -> Result<Self> {
        let persistence = Arc::new(SqliteCache::in_memory()?);
        Self::build(config, persistence, notifier)
    }

    fn build(
        config: Config,
        persistence: Arc<SqliteCache>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Result<Self> {
        let cache = Arc::new(CacheStore::from_data(persistence.load()?));
        let api = Arc::new(HttpApiClient::new(
            &config.sync.api_url,
            config.sync.api_token.clone(),
            config.sync.request_timeout(),
        )?);
        let coordinator = RefreshCoordinator::new(
            api.clone(),
            cache.clone(),
            notifier,
            config.sync.debounce_window(),
        );
        let reader = AutoMarkReadTimer::new(api.clone(), config.reader.mark_read_delay());

        Ok(Self {
            config,
            cache,
            persistence,
            api,
            coordinator,
            reader,
        })
    }

    /// Writes the live cache to the offline database.
    pub fn persist(&self) -> Result<()> {
        self.persistence.save(&self.cache.data())
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| BrookError::Config("Could not find data directory".into()))?;
        let brook_dir = data_dir.join("brook");
        std::fs::create_dir_all(&brook_dir)?;
        Ok(brook_dir.join("brook.db"))
    }
}
