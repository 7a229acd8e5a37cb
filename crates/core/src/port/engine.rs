// Engine Port
// Pooled database engine handed to table descriptors

use crate::domain::{ConnectionConfig, PoolSize};
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Database backend behind an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Postgres,
    Sqlite,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Postgres => f.write_str("postgres"),
            Backend::Sqlite => f.write_str("sqlite"),
        }
    }
}

/// Opaque pooled-connection handle
#[async_trait]
pub trait Engine: Send + Sync + fmt::Debug {
    fn backend(&self) -> Backend;

    /// Database (or file path) this engine talks to
    fn database(&self) -> &str;

    /// Open the connection pool with the given bounds
    async fn start_connection_pool(&self, size: PoolSize) -> Result<()>;

    /// Close the pool if it was started
    async fn close_connection_pool(&self) -> Result<()>;

    fn is_pool_started(&self) -> bool;

    /// Access the concrete engine (e.g. to reach the driver pool)
    fn as_any(&self) -> &dyn Any;
}

/// Builds engines
///
/// `construct` may block (version probe, extension setup) and is always
/// called from the blocking thread pool.
pub trait EngineFactory: Send + Sync {
    fn construct(&self, config: &ConnectionConfig, extensions: &[String])
        -> Result<Arc<dyn Engine>>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Engine that records pool lifecycle calls
    #[derive(Debug, Default)]
    pub struct MockEngine {
        database: String,
        pool: Mutex<Option<PoolSize>>,
        starts: Mutex<usize>,
    }

    impl MockEngine {
        pub fn new(database: impl Into<String>) -> Self {
            Self {
                database: database.into(),
                ..Default::default()
            }
        }

        pub fn start_count(&self) -> usize {
            *self.starts.lock().unwrap()
        }

        pub fn pool_size(&self) -> Option<PoolSize> {
            *self.pool.lock().unwrap()
        }
    }

    #[async_trait]
    impl Engine for MockEngine {
        fn backend(&self) -> Backend {
            Backend::Postgres
        }

        fn database(&self) -> &str {
            &self.database
        }

        async fn start_connection_pool(&self, size: PoolSize) -> Result<()> {
            *self.starts.lock().unwrap() += 1;
            *self.pool.lock().unwrap() = Some(size);
            Ok(())
        }

        async fn close_connection_pool(&self) -> Result<()> {
            *self.pool.lock().unwrap() = None;
            Ok(())
        }

        fn is_pool_started(&self) -> bool {
            self.pool.lock().unwrap().is_some()
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    /// Factory behavior
    #[derive(Debug, Clone)]
    pub enum MockFactoryBehavior {
        /// Build immediately
        Success,
        /// Block the calling thread for the given duration, then build
        Slow(Duration),
        /// Fail with a driver error
        Fail(String),
    }

    /// Factory producing `MockEngine`s
    pub struct MockEngineFactory {
        behavior: MockFactoryBehavior,
        built: Mutex<Vec<Arc<MockEngine>>>,
        configs: Mutex<Vec<(ConnectionConfig, Vec<String>)>>,
    }

    impl MockEngineFactory {
        pub fn new(behavior: MockFactoryBehavior) -> Self {
            Self {
                behavior,
                built: Mutex::new(Vec::new()),
                configs: Mutex::new(Vec::new()),
            }
        }

        pub fn new_success() -> Self {
            Self::new(MockFactoryBehavior::Success)
        }

        /// Engines built so far
        pub fn engines(&self) -> Vec<Arc<MockEngine>> {
            self.built.lock().unwrap().clone()
        }

        /// Configs and extension lists passed to `construct`
        pub fn calls(&self) -> Vec<(ConnectionConfig, Vec<String>)> {
            self.configs.lock().unwrap().clone()
        }
    }

    impl EngineFactory for MockEngineFactory {
        fn construct(
            &self,
            config: &ConnectionConfig,
            extensions: &[String],
        ) -> Result<Arc<dyn Engine>> {
            self.configs
                .lock()
                .unwrap()
                .push((config.clone(), extensions.to_vec()));

            match &self.behavior {
                MockFactoryBehavior::Success => {}
                MockFactoryBehavior::Slow(delay) => std::thread::sleep(*delay),
                MockFactoryBehavior::Fail(msg) => return Err(AppError::Database(msg.clone())),
            }

            let engine = Arc::new(MockEngine::new(config.database().unwrap_or_default()));
            self.built.lock().unwrap().push(engine.clone());
            Ok(engine)
        }
    }
}
