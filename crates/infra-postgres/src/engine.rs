// Postgres Engine
use async_trait::async_trait;
use cogdb_core::domain::{ConnectionConfig, PoolSize};
use cogdb_core::error::{AppError, Result};
use cogdb_core::port::{Backend, Engine, EngineFactory};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{Connection, Executor, PgConnection};
use std::any::Any;
use std::sync::{Arc, RwLock};
use tokio::runtime::Handle;
use tracing::{debug, info};

use crate::error::map_sqlx_error;
use crate::options::{connect_options, quote_ident};

/// Pooled engine bound to one plugin database
#[derive(Debug)]
pub struct PgEngine {
    options: PgConnectOptions,
    database: String,
    extensions: Vec<String>,
    server_version: String,
    pool: RwLock<Option<PgPool>>,
}

impl PgEngine {
    /// Driver pool, once started
    pub fn pool(&self) -> Option<PgPool> {
        self.pool.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// `server_version` reported while the engine was built
    pub fn server_version(&self) -> &str {
        &self.server_version
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }
}

#[async_trait]
impl Engine for PgEngine {
    fn backend(&self) -> Backend {
        Backend::Postgres
    }

    fn database(&self) -> &str {
        &self.database
    }

    async fn start_connection_pool(&self, size: PoolSize) -> Result<()> {
        if self.is_pool_started() {
            debug!(database = %self.database, "Connection pool already running");
            return Ok(());
        }

        let pool = PgPoolOptions::new()
            .min_connections(size.min())
            .max_connections(size.max())
            .connect_with(self.options.clone())
            .await
            .map_err(map_sqlx_error)?;

        *self.pool.write().unwrap_or_else(|e| e.into_inner()) = Some(pool);
        Ok(())
    }

    async fn close_connection_pool(&self) -> Result<()> {
        let pool = self.pool.write().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(pool) = pool {
            pool.close().await;
            info!(database = %self.database, "Connection pool closed");
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

/// Builds `PgEngine`s
///
/// Construction blocks the calling thread: it connects once, reads the
/// server version and enables the requested extensions. It must run on a
/// thread where blocking is allowed (e.g. `spawn_blocking`) inside a tokio
/// runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgEngineFactory;

impl EngineFactory for PgEngineFactory {
    fn construct(&self, config: &ConnectionConfig, extensions: &[String]) -> Result<Arc<dyn Engine>> {
        let options = connect_options(config)?;
        let handle = Handle::try_current()
            .map_err(|e| AppError::Internal(format!("no tokio runtime for engine construction: {}", e)))?;

        let server_version = handle.block_on(prepare_database(&options, extensions))?;
        let database = options.get_database().unwrap_or_default().to_string();
        info!(
            database = %database,
            server_version = %server_version,
            "Postgres engine ready"
        );

        Ok(Arc::new(PgEngine {
            options,
            database,
            extensions: extensions.to_vec(),
            server_version,
            pool: RwLock::new(None),
        }))
    }
}

/// One-off connection: version probe plus `CREATE EXTENSION IF NOT EXISTS`
async fn prepare_database(options: &PgConnectOptions, extensions: &[String]) -> Result<String> {
    let mut conn = PgConnection::connect_with(options)
        .await
        .map_err(map_sqlx_error)?;

    let result = probe_and_enable(&mut conn, extensions).await;

    if let Err(e) = conn.close().await {
        debug!(error = %e, "Failed to close setup connection");
    }
    result
}

async fn probe_and_enable(conn: &mut PgConnection, extensions: &[String]) -> Result<String> {
    let version: String = sqlx::query_scalar("SHOW server_version")
        .fetch_one(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;

    for extension in extensions {
        let sql = format!("CREATE EXTENSION IF NOT EXISTS {}", quote_ident(extension));
        conn.execute(sql.as_str()).await.map_err(map_sqlx_error)?;
        debug!(extension = %extension, "Extension enabled");
    }

    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construct_without_runtime_fails() {
        let config = ConnectionConfig::new().set("host", "localhost");
        let err = tokio_test::assert_err!(PgEngineFactory.construct(&config, &[]));
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[test]
    fn test_construct_rejects_bad_config() {
        let config = ConnectionConfig::new().set("port", "x");
        let err = tokio_test::assert_err!(PgEngineFactory.construct(&config, &[]));
        assert!(matches!(err, AppError::Config(_)));
    }
}
