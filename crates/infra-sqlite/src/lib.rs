// cogdb Infrastructure - SQLite Adapter
// Implements: EngineFactory, Engine

mod engine;
mod error;

pub use engine::{create_pool, SqliteEngine, SqliteEngineFactory};

// Note: sqlx::Error conversion is handled by a helper in `error`
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
