//! Connection settings loading
//!
//! Layering (lowest to highest): optional TOML file, then `POSTGRES_*`
//! environment variables. Keys are flat, e.g. `host`, `port`, `user`.

use anyhow::{Context, Result};
use cogdb_core::domain::ConnectionConfig;
use config::{Config, Environment, File, FileFormat};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "cogdb.toml";
const ENV_PREFIX: &str = "POSTGRES";

/// Expand `~` and environment references in a user-supplied path
pub fn expand_path(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw).with_context(|| format!("Cannot expand path {}", raw))?;
    Ok(PathBuf::from(expanded.into_owned()))
}

/// Load connection settings
///
/// An explicit `path` must exist; the default `cogdb.toml` is used only if present.
pub fn load_connection_config(path: Option<&Path>) -> Result<ConnectionConfig> {
    load_with_env(path, Environment::with_prefix(ENV_PREFIX))
}

fn load_with_env(path: Option<&Path>, env: Environment) -> Result<ConnectionConfig> {
    let file = match path {
        Some(path) => File::from(path.to_path_buf())
            .format(FileFormat::Toml)
            .required(true),
        None => File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false),
    };

    let settings = Config::builder()
        .add_source(file)
        .add_source(env)
        .build()
        .context("Failed to load connection settings")?;

    settings
        .try_deserialize::<ConnectionConfig>()
        .context("Connection settings must be flat key/value pairs")
}
