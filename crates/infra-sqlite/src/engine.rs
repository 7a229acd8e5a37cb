// SQLite Engine
use async_trait::async_trait;
use cogdb_core::domain::{ConfigError, ConnectionConfig, PoolSize};
use cogdb_core::error::Result;
use cogdb_core::port::{Backend, Engine, EngineFactory};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::map_sqlx_error;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Create SQLite connection pool with WAL mode, creating the file if missing
pub async fn create_pool(db_path: &Path, size: PoolSize) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT)
        .foreign_keys(true)
        .create_if_missing(true);

    SqlitePoolOptions::new()
        .min_connections(size.min())
        .max_connections(size.max())
        .connect_with(options)
        .await
        .map_err(map_sqlx_error)
}

/// File-backed engine for one plugin
#[derive(Debug)]
pub struct SqliteEngine {
    path: PathBuf,
    database: String,
    pool: RwLock<Option<SqlitePool>>,
}

impl SqliteEngine {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            database: path.to_string_lossy().into_owned(),
            path,
            pool: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Driver pool, once started
    pub fn pool(&self) -> Option<SqlitePool> {
        self.pool.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Engine for SqliteEngine {
    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    fn database(&self) -> &str {
        &self.database
    }

    async fn start_connection_pool(&self, size: PoolSize) -> Result<()> {
        if self.is_pool_started() {
            debug!(path = %self.path.display(), "SQLite pool already started");
            return Ok(());
        }

        let pool = create_pool(&self.path, size).await?;
        *self.pool.write().unwrap_or_else(|e| e.into_inner()) = Some(pool);
        info!(path = %self.path.display(), max_size = size.max(), "SQLite pool started");
        Ok(())
    }

    async fn close_connection_pool(&self) -> Result<()> {
        let pool = self.pool.write().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(pool) = pool {
            pool.close().await;
            debug!(path = %self.path.display(), "SQLite pool closed");
        }
        Ok(())
    }

    fn is_pool_started(&self) -> bool {
        self.pool.read().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Builds `SqliteEngine`s from the `database` setting (a file path)
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteEngineFactory;

impl EngineFactory for SqliteEngineFactory {
    fn construct(&self, config: &ConnectionConfig, _extensions: &[String]) -> Result<Arc<dyn Engine>> {
        let path = config.database().ok_or_else(|| ConfigError::InvalidSetting {
            key: "database".to_string(),
            reason: "SQLite engine needs a database file path".to_string(),
        })?;
        Ok(Arc::new(SqliteEngine::new(path)))
    }
}
