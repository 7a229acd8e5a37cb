// Postgres administrative connection (provisioning)

use async_trait::async_trait;
use cogdb_core::domain::{ConnectionConfig, DbName};
use cogdb_core::error::{AppError, Result};
use cogdb_core::port::database_admin::{create_database_sql, LIST_DATABASES_SQL};
use cogdb_core::port::{AdminConnection, DatabaseAdmin};
use sqlx::{Connection, Executor, PgConnection};
use tracing::debug;

use crate::error::map_sqlx_error;
use crate::options::connect_options;

/// Opens single, unpooled connections for DDL
#[derive(Debug, Clone, Copy, Default)]
pub struct PgDatabaseAdmin;

#[async_trait]
impl DatabaseAdmin for PgDatabaseAdmin {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn AdminConnection>> {
        let options = connect_options(config)?;
        let conn = PgConnection::connect_with(&options)
            .await
            .map_err(map_sqlx_error)?;
        debug!(host = %options.get_host(), "Administrative connection opened");
        Ok(Box::new(PgAdminConnection { conn: Some(conn) }))
    }
}

/// Connection is `None` once closed
pub struct PgAdminConnection {
    conn: Option<PgConnection>,
}

impl PgAdminConnection {
    fn conn(&mut self) -> Result<&mut PgConnection> {
        self.conn
            .as_mut()
            .ok_or_else(|| AppError::Internal("administrative connection already closed".into()))
    }
}

#[async_trait]
impl AdminConnection for PgAdminConnection {
    async fn list_databases(&mut self) -> Result<Vec<String>> {
        sqlx::query_scalar::<_, String>(LIST_DATABASES_SQL)
            .fetch_all(self.conn()?)
            .await
            .map_err(map_sqlx_error)
    }

    async fn create_database(&mut self, name: &DbName) -> Result<()> {
        // CREATE DATABASE goes over the simple query protocol
        let sql = create_database_sql(name);
        self.conn()?
            .execute(sql.as_str())
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().await.map_err(map_sqlx_error)?;
            debug!("Administrative connection closed");
        }
        Ok(())
    }
}
