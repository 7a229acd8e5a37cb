// Engine Acquisition
use crate::domain::ConnectionConfig;
use crate::error::{AppError, Result};
use crate::port::{Engine, EngineFactory};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Construct an engine on the blocking pool, bounded by `limit`
///
/// On timeout the construction thread is abandoned; the engine it may still
/// produce is dropped unused and no pool is started.
pub async fn acquire_engine(
    factory: Arc<dyn EngineFactory>,
    config: ConnectionConfig,
    extensions: Vec<String>,
    limit: Duration,
) -> Result<Arc<dyn Engine>> {
    debug!(database = ?config.database(), extensions = ?extensions, "Constructing engine");

    let task = tokio::task::spawn_blocking(move || factory.construct(&config, &extensions));

    match timeout(limit, task).await {
        Ok(Ok(engine)) => engine,
        Ok(Err(join_err)) => Err(AppError::Internal(format!(
            "engine construction task failed: {}",
            join_err
        ))),
        Err(_) => Err(AppError::ConnectionTimeout {
            operation: "database engine construction",
            after: limit,
        }),
    }
}
