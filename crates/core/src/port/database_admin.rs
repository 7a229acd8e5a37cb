// Database Admin Port
// Short-lived administrative connection used to provision plugin databases

use crate::domain::{ConnectionConfig, DbName};
use crate::error::Result;
use async_trait::async_trait;

/// Lists every database on the server
pub const LIST_DATABASES_SQL: &str = "SELECT datname FROM pg_database;";

/// DDL creating a plugin database; the name is always quoted
pub fn create_database_sql(name: &DbName) -> String {
    format!("CREATE DATABASE {};", name.quoted())
}

/// Opens administrative connections
#[async_trait]
pub trait DatabaseAdmin: Send + Sync {
    /// Connect using the caller's configuration as-is
    ///
    /// The caller bounds this with a timeout.
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn AdminConnection>>;
}

/// A live administrative connection
#[async_trait]
pub trait AdminConnection: Send {
    /// Names of all databases on the server
    async fn list_databases(&mut self) -> Result<Vec<String>>;

    /// Issue `CREATE DATABASE` for `name`
    async fn create_database(&mut self, name: &DbName) -> Result<()>;

    /// Release the connection
    async fn close(&mut self) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct AdminState {
        databases: Vec<String>,
        statements: Vec<String>,
        connects: usize,
        closes: usize,
        last_config: Option<ConnectionConfig>,
    }

    /// In-memory server with a database list
    #[derive(Clone, Default)]
    pub struct MockDatabaseAdmin {
        state: Arc<Mutex<AdminState>>,
        connect_delay: Option<Duration>,
        fail_listing: bool,
    }

    impl MockDatabaseAdmin {
        pub fn new(existing: &[&str]) -> Self {
            let admin = Self::default();
            admin.state.lock().unwrap().databases =
                existing.iter().map(|s| s.to_string()).collect();
            admin
        }

        /// Connecting takes `delay` before succeeding
        pub fn with_connect_delay(mut self, delay: Duration) -> Self {
            self.connect_delay = Some(delay);
            self
        }

        /// Listing databases fails after connecting
        pub fn failing_listing(mut self) -> Self {
            self.fail_listing = true;
            self
        }

        /// SQL statements issued, in order
        pub fn statements(&self) -> Vec<String> {
            self.state.lock().unwrap().statements.clone()
        }

        pub fn databases(&self) -> Vec<String> {
            self.state.lock().unwrap().databases.clone()
        }

        pub fn connect_count(&self) -> usize {
            self.state.lock().unwrap().connects
        }

        pub fn close_count(&self) -> usize {
            self.state.lock().unwrap().closes
        }

        pub fn last_config(&self) -> Option<ConnectionConfig> {
            self.state.lock().unwrap().last_config.clone()
        }
    }

    #[async_trait]
    impl DatabaseAdmin for MockDatabaseAdmin {
        async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn AdminConnection>> {
            if let Some(delay) = self.connect_delay {
                tokio::time::sleep(delay).await;
            }
            {
                let mut state = self.state.lock().unwrap();
                state.connects += 1;
                state.last_config = Some(config.clone());
            }
            Ok(Box::new(MockAdminConnection {
                state: self.state.clone(),
                fail_listing: self.fail_listing,
            }))
        }
    }

    struct MockAdminConnection {
        state: Arc<Mutex<AdminState>>,
        fail_listing: bool,
    }

    #[async_trait]
    impl AdminConnection for MockAdminConnection {
        async fn list_databases(&mut self) -> Result<Vec<String>> {
            let mut state = self.state.lock().unwrap();
            state.statements.push(LIST_DATABASES_SQL.to_string());
            if self.fail_listing {
                return Err(AppError::Database("permission denied".to_string()));
            }
            Ok(state.databases.clone())
        }

        async fn create_database(&mut self, name: &DbName) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            state.statements.push(create_database_sql(name));
            state.databases.push(name.as_str().to_string());
            Ok(())
        }

        async fn close(&mut self) -> Result<()> {
            self.state.lock().unwrap().closes += 1;
            Ok(())
        }
    }
}
