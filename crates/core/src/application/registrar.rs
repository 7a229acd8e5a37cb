// Registration Orchestrator (Postgres)
// Resolve -> provision -> migrate -> acquire engine -> bind tables

use super::constants::{ADMIN_CONNECT_TIMEOUT, DEFAULT_EXTENSIONS, ENGINE_CONSTRUCT_TIMEOUT};
use super::engine::acquire_engine;
use super::migration_runner::{MigrationContext, MigrationRunner};
use super::provisioning;
use super::resolver::resolve;
use crate::domain::{ConnectionConfig, DbName, PluginIdentity, PoolSize, ToolOutput};
use crate::error::Result;
use crate::port::{DatabaseAdmin, Engine, EngineFactory, MigrationTool, TableBinding};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Registration settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterOptions {
    /// Pass `--trace` to the migration tool
    pub trace: bool,
    /// Connection pool bounds
    pub pool: PoolSize,
    /// Do not invoke the migration tool at all
    pub skip_migrations: bool,
    /// Postgres extensions to enable (ignored for SQLite)
    pub extensions: Vec<String>,
}

impl Default for RegisterOptions {
    fn default() -> Self {
        Self {
            trace: false,
            pool: PoolSize::default(),
            skip_migrations: false,
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Bounds on the two otherwise unbounded waits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrarTimeouts {
    pub admin_connect: Duration,
    pub engine_construct: Duration,
}

impl Default for RegistrarTimeouts {
    fn default() -> Self {
        Self {
            admin_connect: ADMIN_CONNECT_TIMEOUT,
            engine_construct: ENGINE_CONSTRUCT_TIMEOUT,
        }
    }
}

/// Point every table at `engine`
pub fn bind_tables(tables: &[Arc<dyn TableBinding>], engine: &Arc<dyn Engine>) {
    for table in tables {
        table.bind(engine.clone());
        debug!(table = %table.table_name(), "Table bound to engine");
    }
}

/// Registers Postgres-backed plugins
pub struct DatabaseRegistrar {
    admin: Arc<dyn DatabaseAdmin>,
    migrations: MigrationRunner,
    engines: Arc<dyn EngineFactory>,
    timeouts: RegistrarTimeouts,
}

impl DatabaseRegistrar {
    /// Create a registrar
    ///
    /// # Arguments
    /// * `admin` - Administrative connections for provisioning
    /// * `tool` - Migration tool adapter
    /// * `engines` - Engine factory (blocking construction)
    ///
    /// # Example
    /// ```ignore
    /// let registrar = DatabaseRegistrar::new(
    ///     Arc::new(PgDatabaseAdmin),
    ///     Arc::new(PiccoloCli::from_env()),
    ///     Arc::new(PgEngineFactory),
    /// );
    /// let engine = registrar
    ///     .register(&identity, &tables, &config, RegisterOptions::default())
    ///     .await?;
    /// ```
    pub fn new(
        admin: Arc<dyn DatabaseAdmin>,
        tool: Arc<dyn MigrationTool>,
        engines: Arc<dyn EngineFactory>,
    ) -> Self {
        Self {
            admin,
            migrations: MigrationRunner::new(tool),
            engines,
            timeouts: RegistrarTimeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: RegistrarTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Database name for a plugin
    pub fn db_name(identity: &PluginIdentity) -> Result<DbName> {
        Ok(identity.db_name()?)
    }

    /// Register a plugin: provision its database, run migrations, start an
    /// engine and bind it to `tables`
    ///
    /// Migration failures are logged and do not abort registration.
    ///
    /// # Errors
    /// - Config if the plugin root is a UNC path or not a directory
    /// - ConnectionTimeout if provisioning or engine construction stalls
    /// - Database for driver errors
    /// - Execution if the migration tool cannot be run
    pub async fn register(
        &self,
        identity: &PluginIdentity,
        tables: &[Arc<dyn TableBinding>],
        config: &ConnectionConfig,
        options: RegisterOptions,
    ) -> Result<Arc<dyn Engine>> {
        let resolved = resolve(identity)?;

        let created = provisioning::ensure_database_exists(
            self.admin.as_ref(),
            config,
            &resolved.db_name,
            self.timeouts.admin_connect,
        )
        .await?;
        if created {
            info!(db_name = %resolved.db_name, "New database created for {}", resolved.app_name);
        }

        if !options.skip_migrations {
            let ctx = MigrationContext::postgres(&resolved, config);
            self.migrations.apply_pending(&ctx, options.trace).await?;
        }

        debug!("Fetching database engine");
        let engine = acquire_engine(
            self.engines.clone(),
            config.with_database(resolved.db_name.as_str()),
            options.extensions,
            self.timeouts.engine_construct,
        )
        .await?;

        debug!("Database engine acquired, starting pool");
        engine.start_connection_pool(options.pool).await?;
        info!(
            db_name = %resolved.db_name,
            min_size = options.pool.min(),
            max_size = options.pool.max(),
            "Database connection pool started ✓"
        );

        bind_tables(tables, &engine);
        Ok(engine)
    }

    /// Create the plugin's database if missing
    ///
    /// # Returns
    /// true if a new database was created
    pub async fn ensure_database_exists(
        &self,
        identity: &PluginIdentity,
        config: &ConnectionConfig,
    ) -> Result<bool> {
        let db_name = identity.db_name()?;
        provisioning::ensure_database_exists(
            self.admin.as_ref(),
            config,
            &db_name,
            self.timeouts.admin_connect,
        )
        .await
    }

    fn context(identity: &PluginIdentity, config: &ConnectionConfig) -> Result<MigrationContext> {
        let resolved = resolve(identity)?;
        Ok(MigrationContext::postgres(&resolved, config))
    }

    /// Apply pending migrations
    pub async fn run_migrations(
        &self,
        identity: &PluginIdentity,
        config: &ConnectionConfig,
        trace: bool,
    ) -> Result<ToolOutput> {
        let ctx = Self::context(identity, config)?;
        self.migrations.forwards(&ctx, trace).await
    }

    /// Revert migrations down to `timestamp`
    pub async fn reverse_migration(
        &self,
        identity: &PluginIdentity,
        config: &ConnectionConfig,
        timestamp: &str,
        trace: bool,
    ) -> Result<ToolOutput> {
        let ctx = Self::context(identity, config)?;
        self.migrations.backwards(&ctx, timestamp, trace).await
    }

    /// Generate a new migration. THIS SHOULD BE RUN MANUALLY.
    pub async fn create_migrations(
        &self,
        identity: &PluginIdentity,
        config: &ConnectionConfig,
        trace: bool,
        description: Option<&str>,
    ) -> Result<ToolOutput> {
        let ctx = Self::context(identity, config)?;
        self.migrations.create(&ctx, trace, description).await
    }

    /// Tool diagnosis plus migration check
    pub async fn diagnose_issues(
        &self,
        identity: &PluginIdentity,
        config: &ConnectionConfig,
    ) -> Result<String> {
        let ctx = Self::context(identity, config)?;
        self.migrations.diagnose(&ctx).await
    }

    /// Build an engine for `config` without starting its pool
    pub async fn acquire_engine(
        &self,
        config: &ConnectionConfig,
        extensions: &[String],
    ) -> Result<Arc<dyn Engine>> {
        acquire_engine(
            self.engines.clone(),
            config.clone(),
            extensions.to_vec(),
            self.timeouts.engine_construct,
        )
        .await
    }
}
