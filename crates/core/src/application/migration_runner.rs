// Migration Runner
// Builds migration tool invocations and classifies their output

use super::constants::{MIGRATION_FAILED_MESSAGE, PICCOLO_CONF_MODULE, POSTGRES_ENV_PREFIX};
use crate::domain::{ConnectionConfig, MigrationOutcome, ResolvedPlugin, ToolOutput};
use crate::error::Result;
use crate::port::{MigrationTool, ToolInvocation};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// Migration tool subcommands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationCommand<'a> {
    /// Apply all pending migrations
    Forwards,
    /// Revert down to a migration id
    Backwards { timestamp: &'a str },
    /// Generate a new migration file (manual use only)
    New { description: Option<&'a str> },
    /// Tool self-diagnosis
    Diagnose,
    /// Migration consistency check
    Check,
}

impl MigrationCommand<'_> {
    /// Argument list for this command (executable excluded)
    pub fn args(&self, app_name: &str, trace: bool) -> Vec<String> {
        let mut args: Vec<String> = match self {
            Self::Forwards => vec!["migrations".into(), "forwards".into(), app_name.into()],
            Self::Backwards { timestamp } => vec![
                "migrations".into(),
                "backwards".into(),
                app_name.into(),
                (*timestamp).into(),
            ],
            Self::New { .. } => vec![
                "migrations".into(),
                "new".into(),
                app_name.into(),
                "--auto".into(),
            ],
            Self::Diagnose => return vec!["--diagnose".into()],
            Self::Check => return vec!["migrations".into(), "check".into()],
        };

        if trace {
            args.push("--trace".into());
        }
        if let Self::New {
            description: Some(desc),
        } = self
        {
            args.push(format!("--desc={}", desc));
        }
        args
    }
}

/// Where and with which environment the tool runs for one plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationContext {
    pub working_dir: PathBuf,
    pub app_name: String,
    pub env: BTreeMap<String, String>,
}

impl MigrationContext {
    fn base(working_dir: &Path, app_name: &str) -> Self {
        let mut env = BTreeMap::new();
        env.insert("PICCOLO_CONF".to_string(), PICCOLO_CONF_MODULE.to_string());
        env.insert("APP_NAME".to_string(), app_name.to_string());
        if cfg!(windows) {
            env.insert("PYTHONIOENCODING".to_string(), "utf-8".to_string());
        }

        Self {
            working_dir: working_dir.to_path_buf(),
            app_name: app_name.to_string(),
            env,
        }
    }

    /// Postgres plugin: connection settings exported as `POSTGRES_*`,
    /// with the database pointed at the plugin's own
    pub fn postgres(resolved: &ResolvedPlugin, config: &ConnectionConfig) -> Self {
        let mut ctx = Self::base(&resolved.root, &resolved.app_name);
        let plugin_config = config.with_database(resolved.db_name.as_str());
        for (key, value) in plugin_config.iter() {
            ctx.env.insert(
                format!("{}{}", POSTGRES_ENV_PREFIX, key.to_uppercase()),
                value.to_string(),
            );
        }
        ctx
    }

    /// SQLite plugin: the database file is exported as `DB_PATH`
    pub fn sqlite(root: &Path, app_name: &str, db_path: &Path) -> Self {
        let mut ctx = Self::base(root, app_name);
        ctx.env
            .insert("DB_PATH".to_string(), db_path.to_string_lossy().into_owned());
        ctx
    }

    fn invocation(&self, command: &MigrationCommand<'_>, trace: bool) -> ToolInvocation {
        ToolInvocation {
            args: command.args(&self.app_name, trace),
            working_dir: self.working_dir.clone(),
            env: self.env.clone(),
        }
    }
}

/// Runs migration tool commands for plugins
#[derive(Clone)]
pub struct MigrationRunner {
    tool: Arc<dyn MigrationTool>,
}

impl MigrationRunner {
    pub fn new(tool: Arc<dyn MigrationTool>) -> Self {
        Self { tool }
    }

    async fn run(
        &self,
        ctx: &MigrationContext,
        command: MigrationCommand<'_>,
        trace: bool,
    ) -> Result<ToolOutput> {
        let invocation = ctx.invocation(&command, trace);
        Ok(self.tool.run(&invocation).await?)
    }

    /// Apply all pending migrations
    pub async fn forwards(&self, ctx: &MigrationContext, trace: bool) -> Result<ToolOutput> {
        self.run(ctx, MigrationCommand::Forwards, trace).await
    }

    /// Revert migrations down to `timestamp`
    pub async fn backwards(
        &self,
        ctx: &MigrationContext,
        timestamp: &str,
        trace: bool,
    ) -> Result<ToolOutput> {
        self.run(ctx, MigrationCommand::Backwards { timestamp }, trace)
            .await
    }

    /// Generate a new auto migration
    ///
    /// Meant to be run by a developer; registration never calls this.
    pub async fn create(
        &self,
        ctx: &MigrationContext,
        trace: bool,
        description: Option<&str>,
    ) -> Result<ToolOutput> {
        self.run(ctx, MigrationCommand::New { description }, trace)
            .await
    }

    /// Self-diagnosis followed by a migration check, joined by a newline
    pub async fn diagnose(&self, ctx: &MigrationContext) -> Result<String> {
        let diagnoses = self.run(ctx, MigrationCommand::Diagnose, false).await?;
        let check = self.run(ctx, MigrationCommand::Check, false).await?;
        Ok(format!("{}\n{}", diagnoses.text, check.text))
    }

    /// Forward migrations as part of registration
    ///
    /// A failed migration is logged with diagnostics, never returned as an
    /// error. Only a tool that cannot be run at all fails this call.
    pub async fn apply_pending(
        &self,
        ctx: &MigrationContext,
        trace: bool,
    ) -> Result<MigrationOutcome> {
        info!(app = %ctx.app_name, "Running migrations, if any");
        let output = self.forwards(ctx, trace).await?;
        let outcome = MigrationOutcome::classify(&output);

        match &outcome {
            MigrationOutcome::NoOp => info!("No migrations needed ✓"),
            MigrationOutcome::Applied(text) => {
                info!(exit_code = ?output.exit_code, "Migration result...\n{}", text)
            }
            MigrationOutcome::Failed(text) => {
                info!("Migration result...\n{}", text);
                let diagnoses = self.diagnose(ctx).await?;
                error!(exit_code = ?output.exit_code, "{}", failure_report(&diagnoses));
            }
        }

        Ok(outcome)
    }
}

/// Error report for a failed forward run: diagnostics, then the banner
pub fn failure_report(diagnoses: &str) -> String {
    format!("{}\n{}", diagnoses, MIGRATION_FAILED_MESSAGE)
}
