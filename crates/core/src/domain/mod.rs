// Domain Layer - Plugin identity, connection settings, migration outcomes

pub mod connection;
pub mod error;
pub mod migration;
pub mod plugin;

// Re-exports
pub use connection::{ConnectionConfig, PoolSize};
pub use error::ConfigError;
pub use migration::{MigrationOutcome, ToolOutput};
pub use plugin::{DbName, PluginIdentity, PluginInstance, ResolvedPlugin};
