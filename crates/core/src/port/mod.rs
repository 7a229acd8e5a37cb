// Port Layer - Interfaces for external collaborators

pub mod database_admin;
pub mod engine;
pub mod migration_tool;
pub mod table;

// Re-exports
pub use database_admin::{AdminConnection, DatabaseAdmin};
pub use engine::{Backend, Engine, EngineFactory};
pub use migration_tool::{ExecutionError, MigrationTool, ToolInvocation};
pub use table::{BoundTable, TableBinding};
