// Registrar constants (no magic values in use cases)
use std::time::Duration;

/// Bound on opening the administrative provisioning connection (10s)
pub const ADMIN_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Bound on blocking engine construction (10s)
pub const ENGINE_CONSTRUCT_TIMEOUT: Duration = Duration::from_secs(10);

/// Postgres extensions enabled when the caller does not choose any
pub const DEFAULT_EXTENSIONS: &[&str] = &["uuid-ossp"];

/// Config module the migration tool imports from the plugin root
pub const PICCOLO_CONF_MODULE: &str = "db.piccolo_conf";

/// File name of a plugin's SQLite database inside its data directory
pub const SQLITE_DB_FILE: &str = "db.sqlite";

/// Prefix for connection settings exported to the migration tool
/// (`host` becomes `POSTGRES_HOST`)
pub const POSTGRES_ENV_PREFIX: &str = "POSTGRES_";

/// Appended to the diagnostics report when forward migrations fail
pub const MIGRATION_FAILED_MESSAGE: &str = "One or more migrations failed to run!";
