// Registration Orchestrator (SQLite)
// File-backed variant: no provisioning, the database lives in the plugin's data dir

use super::constants::{ENGINE_CONSTRUCT_TIMEOUT, SQLITE_DB_FILE};
use super::engine::acquire_engine;
use super::migration_runner::{MigrationContext, MigrationRunner};
use super::registrar::{bind_tables, RegisterOptions};
use super::resolver::resolve_data_dir;
use crate::domain::{ConnectionConfig, PluginIdentity, ToolOutput};
use crate::error::Result;
use crate::port::{Engine, EngineFactory, MigrationTool, TableBinding};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Registers SQLite-backed plugins
pub struct SqliteRegistrar {
    migrations: MigrationRunner,
    engines: Arc<dyn EngineFactory>,
}

impl SqliteRegistrar {
    pub fn new(tool: Arc<dyn MigrationTool>, engines: Arc<dyn EngineFactory>) -> Self {
        Self {
            migrations: MigrationRunner::new(tool),
            engines,
        }
    }

    /// Path of the plugin's database file
    pub fn db_path(identity: &PluginIdentity) -> Result<PathBuf> {
        Ok(resolve_data_dir(identity)?.join(SQLITE_DB_FILE))
    }

    fn context(identity: &PluginIdentity) -> Result<MigrationContext> {
        let db_path = Self::db_path(identity)?;
        Ok(Self::context_for(identity, &db_path))
    }

    fn context_for(identity: &PluginIdentity, db_path: &Path) -> MigrationContext {
        MigrationContext::sqlite(identity.root(), &identity.app_name(), db_path)
    }

    /// Register a plugin: run migrations, open the database file and bind
    /// it to `tables`
    ///
    /// `options.extensions` does not apply to SQLite and is ignored.
    pub async fn register(
        &self,
        identity: &PluginIdentity,
        tables: &[Arc<dyn TableBinding>],
        options: RegisterOptions,
    ) -> Result<Arc<dyn Engine>> {
        let db_path = Self::db_path(identity)?;

        if !options.skip_migrations {
            let ctx = Self::context_for(identity, &db_path);
            self.migrations.apply_pending(&ctx, options.trace).await?;
        }

        debug!(db_path = %db_path.display(), "Fetching database engine");
        let engine = acquire_engine(
            self.engines.clone(),
            ConnectionConfig::new().set("database", db_path.to_string_lossy()),
            Vec::new(),
            ENGINE_CONSTRUCT_TIMEOUT,
        )
        .await?;

        engine.start_connection_pool(options.pool).await?;
        info!(database = %engine.database(), "SQLite database ready ✓");

        bind_tables(tables, &engine);
        Ok(engine)
    }

    /// Apply pending migrations
    pub async fn run_migrations(&self, identity: &PluginIdentity, trace: bool) -> Result<ToolOutput> {
        let ctx = Self::context(identity)?;
        self.migrations.forwards(&ctx, trace).await
    }

    /// Revert migrations down to `timestamp`
    pub async fn reverse_migration(
        &self,
        identity: &PluginIdentity,
        timestamp: &str,
        trace: bool,
    ) -> Result<ToolOutput> {
        let ctx = Self::context(identity)?;
        self.migrations.backwards(&ctx, timestamp, trace).await
    }

    /// Generate a new migration. THIS SHOULD BE RUN MANUALLY.
    pub async fn create_migrations(
        &self,
        identity: &PluginIdentity,
        trace: bool,
        description: Option<&str>,
    ) -> Result<ToolOutput> {
        let ctx = Self::context(identity)?;
        self.migrations.create(&ctx, trace, description).await
    }

    /// Tool diagnosis plus migration check
    pub async fn diagnose_issues(&self, identity: &PluginIdentity) -> Result<String> {
        let ctx = Self::context(identity)?;
        self.migrations.diagnose(&ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConfigError;
    use crate::error::AppError;
    use crate::port::engine::mocks::MockEngineFactory;
    use crate::port::migration_tool::mocks::MockMigrationTool;
    use crate::port::BoundTable;

    #[tokio::test]
    async fn test_register_uses_data_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("Referrals");
        let data = tmp.path().join("data");
        std::fs::create_dir(&root).unwrap();
        std::fs::create_dir(&data).unwrap();

        let tool = Arc::new(MockMigrationTool::new("No migrations need to be run"));
        let factory = Arc::new(MockEngineFactory::new_success());
        let registrar = SqliteRegistrar::new(tool.clone(), factory.clone());
        let identity = PluginIdentity::instance("Referrals", &root).with_data_dir(&data);
        let table = BoundTable::new("referrals");
        let tables: Vec<Arc<dyn TableBinding>> = vec![table.clone()];

        let engine = registrar
            .register(&identity, &tables, RegisterOptions::default())
            .await
            .unwrap();

        let expected = data.join("db.sqlite");
        assert_eq!(engine.database(), expected.to_string_lossy());
        assert!(table.engine().is_some());

        let call = &tool.invocations()[0];
        assert_eq!(call.working_dir, root);
        assert_eq!(call.env["DB_PATH"], expected.to_string_lossy());
        assert_eq!(call.args, vec!["migrations", "forwards", "Referrals"]);
    }

    #[tokio::test]
    async fn test_register_rejects_missing_data_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let registrar = SqliteRegistrar::new(
            Arc::new(MockMigrationTool::new("")),
            Arc::new(MockEngineFactory::new_success()),
        );
        let identity = PluginIdentity::from_path(tmp.path().join("gone"));

        let err = registrar
            .register(&identity, &[], RegisterOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Config(ConfigError::InvalidDirectory(_))));
    }
}
