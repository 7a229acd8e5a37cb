// Application Layer - Registration use cases

pub mod constants;
pub mod engine;
pub mod migration_runner;
pub mod provisioning;
pub mod registrar;
pub mod resolver;
pub mod sqlite_registrar;

// Re-exports
pub use engine::acquire_engine;
pub use migration_runner::{MigrationCommand, MigrationContext, MigrationRunner};
pub use registrar::{bind_tables, DatabaseRegistrar, RegisterOptions, RegistrarTimeouts};
pub use resolver::{is_unc_path, resolve, resolve_data_dir};
pub use sqlite_registrar::SqliteRegistrar;
