//! cogdb CLI - register plugin databases and drive their migrations

mod settings;
mod telemetry;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use cogdb_core::application::{DatabaseRegistrar, RegisterOptions, SqliteRegistrar};
use cogdb_core::domain::{ConnectionConfig, PluginIdentity, PoolSize, ToolOutput};
use cogdb_core::port::{Backend, BoundTable, Engine, TableBinding};
use cogdb_infra_postgres::{PgDatabaseAdmin, PgEngineFactory};
use cogdb_infra_sqlite::SqliteEngineFactory;
use cogdb_infra_system::PiccoloCli;

#[derive(Parser)]
#[command(name = "cogdb")]
#[command(about = "Plugin database registrar", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Connection settings file (TOML)
    #[arg(long, global = true, env = "COGDB_CONFIG")]
    config: Option<String>,

    /// Use the file-backed SQLite backend instead of Postgres
    #[arg(long, global = true)]
    sqlite: bool,
}

#[derive(Args)]
struct PluginArgs {
    /// Plugin root directory
    path: String,

    /// Qualified name of a loaded plugin instance
    #[arg(long)]
    name: Option<String>,

    /// Data directory for file-backed databases (instances only, defaults to the root)
    #[arg(long)]
    data_dir: Option<String>,
}

impl PluginArgs {
    fn identity(&self) -> Result<PluginIdentity> {
        let root = settings::expand_path(&self.path)?;
        let identity = match &self.name {
            Some(name) => PluginIdentity::instance(name.clone(), root),
            None => PluginIdentity::from_path(root),
        };
        Ok(match &self.data_dir {
            Some(dir) => identity.with_data_dir(settings::expand_path(dir)?),
            None => identity,
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Provision, migrate and start the plugin's engine
    Register {
        #[command(flatten)]
        plugin: PluginArgs,

        /// Pass --trace to the migration tool
        #[arg(long)]
        trace: bool,

        /// Do not run migrations
        #[arg(long)]
        skip_migrations: bool,

        #[arg(long, default_value = "1")]
        min_size: u32,

        #[arg(long, default_value = "20")]
        max_size: u32,

        /// Postgres extension to enable (repeatable)
        #[arg(long = "extension")]
        extensions: Vec<String>,

        /// Table descriptor to bind (repeatable)
        #[arg(long = "table")]
        tables: Vec<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply pending migrations
    Forwards {
        #[command(flatten)]
        plugin: PluginArgs,

        #[arg(long)]
        trace: bool,
    },

    /// Revert migrations down to a timestamp
    Backwards {
        #[command(flatten)]
        plugin: PluginArgs,

        /// Migration timestamp to revert to
        timestamp: String,

        #[arg(long)]
        trace: bool,
    },

    /// Generate a new auto migration
    New {
        #[command(flatten)]
        plugin: PluginArgs,

        #[arg(long)]
        trace: bool,

        /// Migration description
        #[arg(long)]
        desc: Option<String>,
    },

    /// Run tool diagnostics and a migration check
    Diagnose {
        #[command(flatten)]
        plugin: PluginArgs,
    },

    /// Create the plugin's Postgres database if missing
    EnsureDb {
        #[command(flatten)]
        plugin: PluginArgs,
    },

    /// Print the plugin's database name
    DbName {
        #[command(flatten)]
        plugin: PluginArgs,
    },
}

#[derive(Serialize)]
struct RegisterReport {
    backend: Backend,
    database: String,
    pool_min: u32,
    pool_max: u32,
    tables: Vec<String>,
}

impl RegisterReport {
    fn new(engine: &Arc<dyn Engine>, pool: PoolSize, tables: &[Arc<dyn TableBinding>]) -> Self {
        Self {
            backend: engine.backend(),
            database: engine.database().to_string(),
            pool_min: pool.min(),
            pool_max: pool.max(),
            tables: tables.iter().map(|t| t.table_name().to_string()).collect(),
        }
    }

    fn print(&self) {
        println!("{}", "✓ Plugin registered".green().bold());
        println!("  backend:  {}", self.backend);
        println!("  database: {}", self.database);
        println!("  pool:     {}..{}", self.pool_min, self.pool_max);
        if !self.tables.is_empty() {
            println!("  tables:   {}", self.tables.join(", "));
        }
    }
}

enum Registrar {
    Postgres {
        registrar: DatabaseRegistrar,
        config: ConnectionConfig,
    },
    Sqlite(SqliteRegistrar),
}

impl Registrar {
    fn build(cli: &Cli) -> Result<Self> {
        let tool = Arc::new(PiccoloCli::from_env());
        if cli.sqlite {
            return Ok(Registrar::Sqlite(SqliteRegistrar::new(
                tool,
                Arc::new(SqliteEngineFactory),
            )));
        }

        let config_path = cli
            .config
            .as_deref()
            .map(settings::expand_path)
            .transpose()?;
        let config = settings::load_connection_config(config_path.as_deref())?;

        Ok(Registrar::Postgres {
            registrar: DatabaseRegistrar::new(
                Arc::new(PgDatabaseAdmin),
                tool,
                Arc::new(PgEngineFactory),
            ),
            config,
        })
    }
}

fn print_tool_output(output: &ToolOutput) {
    println!("{}", output.text);
    if output.exited_with_error() {
        eprintln!(
            "{}",
            format!("migration tool exited with {:?}", output.exit_code).yellow()
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_logging()?;

    let cli = Cli::parse();

    let backend = Registrar::build(&cli)?;

    match (&cli.command, &backend) {
        (
            Commands::Register {
                plugin,
                trace,
                skip_migrations,
                min_size,
                max_size,
                extensions,
                tables,
                json,
            },
            _,
        ) => {
            let identity = plugin.identity()?;
            let pool = PoolSize::new(*min_size, *max_size)?;
            let mut options = RegisterOptions {
                trace: *trace,
                pool,
                skip_migrations: *skip_migrations,
                ..RegisterOptions::default()
            };
            if !extensions.is_empty() {
                options.extensions = extensions.clone();
            }

            let tables: Vec<Arc<dyn TableBinding>> = tables
                .iter()
                .map(|name| BoundTable::new(name.clone()) as Arc<dyn TableBinding>)
                .collect();

            let engine = match &backend {
                Registrar::Postgres { registrar, config } => {
                    registrar.register(&identity, &tables, config, options).await
                }
                Registrar::Sqlite(registrar) => registrar.register(&identity, &tables, options).await,
            }
            .context("Registration failed")?;

            let report = RegisterReport::new(&engine, pool, &tables);
            if *json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                report.print();
            }

            engine.close_connection_pool().await?;
        }

        (Commands::Forwards { plugin, trace }, Registrar::Postgres { registrar, config }) => {
            let output = registrar
                .run_migrations(&plugin.identity()?, config, *trace)
                .await?;
            print_tool_output(&output);
        }
        (Commands::Forwards { plugin, trace }, Registrar::Sqlite(registrar)) => {
            let output = registrar.run_migrations(&plugin.identity()?, *trace).await?;
            print_tool_output(&output);
        }

        (
            Commands::Backwards {
                plugin,
                timestamp,
                trace,
            },
            Registrar::Postgres { registrar, config },
        ) => {
            let output = registrar
                .reverse_migration(&plugin.identity()?, config, timestamp, *trace)
                .await?;
            print_tool_output(&output);
        }
        (
            Commands::Backwards {
                plugin,
                timestamp,
                trace,
            },
            Registrar::Sqlite(registrar),
        ) => {
            let output = registrar
                .reverse_migration(&plugin.identity()?, timestamp, *trace)
                .await?;
            print_tool_output(&output);
        }

        (Commands::New { plugin, trace, desc }, Registrar::Postgres { registrar, config }) => {
            let output = registrar
                .create_migrations(&plugin.identity()?, config, *trace, desc.as_deref())
                .await?;
            print_tool_output(&output);
        }
        (Commands::New { plugin, trace, desc }, Registrar::Sqlite(registrar)) => {
            let output = registrar
                .create_migrations(&plugin.identity()?, *trace, desc.as_deref())
                .await?;
            print_tool_output(&output);
        }

        (Commands::Diagnose { plugin }, Registrar::Postgres { registrar, config }) => {
            let report = registrar
                .diagnose_issues(&plugin.identity()?, config)
                .await?;
            println!("{}", report);
        }
        (Commands::Diagnose { plugin }, Registrar::Sqlite(registrar)) => {
            let report = registrar.diagnose_issues(&plugin.identity()?).await?;
            println!("{}", report);
        }

        (Commands::EnsureDb { plugin }, Registrar::Postgres { registrar, config }) => {
            let identity = plugin.identity()?;
            let created = registrar.ensure_database_exists(&identity, config).await?;
            let name = DatabaseRegistrar::db_name(&identity)?;
            if created {
                info!(db_name = %name, "Database created");
                println!("{}", format!("✓ Created database {}", name).green().bold());
            } else {
                println!("{}", format!("Database {} already exists", name).cyan());
            }
        }
        (Commands::EnsureDb { .. }, Registrar::Sqlite(_)) => {
            anyhow::bail!("ensure-db applies to Postgres only; SQLite files are created on first use");
        }

        (Commands::DbName { plugin }, _) => {
            println!("{}", DatabaseRegistrar::db_name(&plugin.identity()?)?);
        }
    }

    Ok(())
}
