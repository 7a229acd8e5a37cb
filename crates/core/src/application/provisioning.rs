// Provisioning Step
use crate::domain::{ConnectionConfig, DbName};
use crate::error::{AppError, Result};
use crate::port::{AdminConnection, DatabaseAdmin};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Create the plugin database if the server does not have it yet
///
/// Connects with the caller's config as-is (typically the maintenance
/// database). The connection is closed on every exit path.
///
/// # Returns
/// true if a new database was created
pub async fn ensure_database_exists(
    admin: &dyn DatabaseAdmin,
    config: &ConnectionConfig,
    db_name: &DbName,
    connect_timeout: Duration,
) -> Result<bool> {
    let mut conn = match timeout(connect_timeout, admin.connect(config)).await {
        Ok(conn) => conn?,
        Err(_) => {
            return Err(AppError::ConnectionTimeout {
                operation: "administrative connection",
                after: connect_timeout,
            })
        }
    };

    let outcome = create_if_missing(conn.as_mut(), db_name).await;

    if let Err(e) = conn.close().await {
        warn!(error = %e, "Failed to close administrative connection");
    }

    outcome
}

async fn create_if_missing(conn: &mut dyn AdminConnection, db_name: &DbName) -> Result<bool> {
    let databases = conn.list_databases().await?;

    if databases.iter().any(|name| name == db_name.as_str()) {
        debug!(db_name = %db_name, "Database already exists");
        return Ok(false);
    }

    info!(db_name = %db_name, "Creating database");
    conn.create_database(db_name).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::database_admin::mocks::MockDatabaseAdmin;

    fn economy() -> DbName {
        DbName::new("economy").unwrap()
    }

    #[tokio::test]
    async fn test_creates_missing_database() {
        let admin = MockDatabaseAdmin::new(&["postgres", "template1"]);
        let config = ConnectionConfig::new().set("host", "x");

        let created = ensure_database_exists(&admin, &config, &economy(), Duration::from_secs(1))
            .await
            .unwrap();

        assert!(created);
        assert_eq!(
            admin.statements(),
            vec![
                "SELECT datname FROM pg_database;".to_string(),
                "CREATE DATABASE \"economy\";".to_string(),
            ]
        );
        assert_eq!(admin.close_count(), 1);
    }

    #[tokio::test]
    async fn test_existing_database_is_noop() {
        let admin = MockDatabaseAdmin::new(&["postgres", "economy"]);

        let created = ensure_database_exists(
            &admin,
            &ConnectionConfig::new(),
            &economy(),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        assert!(!created);
        assert_eq!(admin.statements().len(), 1);
        assert_eq!(admin.close_count(), 1);
    }

    #[tokio::test]
    async fn test_connection_closed_on_error() {
        let admin = MockDatabaseAdmin::new(&[]).failing_listing();

        let result = ensure_database_exists(
            &admin,
            &ConnectionConfig::new(),
            &economy(),
            Duration::from_secs(1),
        )
        .await;

        assert!(matches!(result, Err(AppError::Database(_))));
        assert_eq!(admin.close_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_timeout() {
        let admin = MockDatabaseAdmin::new(&[]).with_connect_delay(Duration::from_secs(30));

        let err = ensure_database_exists(
            &admin,
            &ConnectionConfig::new(),
            &economy(),
            Duration::from_secs(10),
        )
        .await
        .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(admin.connect_count(), 0);
        assert!(admin.statements().is_empty());
    }

    #[tokio::test]
    async fn test_admin_connection_uses_caller_config() {
        let admin = MockDatabaseAdmin::new(&[]);
        let config = ConnectionConfig::new().set("database", "postgres");

        ensure_database_exists(&admin, &config, &economy(), Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(admin.last_config().unwrap().database(), Some("postgres"));
    }
}
