// Domain Error Types

use std::path::PathBuf;
use thiserror::Error;

/// Rejected plugin identity or registration settings
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("UNC paths are not supported, please move the cog's location: {}", .0.display())]
    UncPath(PathBuf),

    #[error("Cog files are not in a valid directory: {}", .0.display())]
    InvalidDirectory(PathBuf),

    #[error("Invalid database name {name:?}: {reason}")]
    InvalidDatabaseName { name: String, reason: String },

    #[error("Invalid pool size: min={min}, max={max}")]
    InvalidPoolSize { min: u32, max: u32 },

    #[error("Invalid connection setting '{key}': {reason}")]
    InvalidSetting { key: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
