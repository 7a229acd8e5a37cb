// Plugin identity and the names derived from it

use super::error::{ConfigError, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// PostgreSQL truncates identifiers longer than NAMEDATALEN - 1 bytes
pub const MAX_DB_NAME_LENGTH: usize = 63;

/// A plugin as seen by the registrar: either a live plugin or a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginIdentity {
    /// Loaded plugin instance
    Instance(PluginInstance),
    /// Plugin addressed by its directory
    Path(PathBuf),
}

/// Metadata the host framework exposes for a loaded plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginInstance {
    /// Qualified plugin name, e.g. `Economy`
    pub qualified_name: String,
    /// Directory holding the plugin's source files and migrations
    pub root: PathBuf,
    /// Directory the host assigns for the plugin's persistent data
    pub data_dir: Option<PathBuf>,
}

impl PluginIdentity {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    pub fn instance(qualified_name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self::Instance(PluginInstance {
            qualified_name: qualified_name.into(),
            root: root.into(),
            data_dir: None,
        })
    }

    /// Attach a data directory (no-op for path identities)
    pub fn with_data_dir(self, data_dir: impl Into<PathBuf>) -> Self {
        match self {
            Self::Instance(mut inst) => {
                inst.data_dir = Some(data_dir.into());
                Self::Instance(inst)
            }
            other => other,
        }
    }

    /// Root directory the migration tool runs in
    pub fn root(&self) -> &Path {
        match self {
            Self::Instance(inst) => &inst.root,
            Self::Path(path) => path,
        }
    }

    /// Directory where file-backed databases live
    ///
    /// Instances without an explicit data directory fall back to their root.
    pub fn data_dir(&self) -> &Path {
        match self {
            Self::Instance(inst) => inst.data_dir.as_deref().unwrap_or(&inst.root),
            Self::Path(path) => path,
        }
    }

    /// Migration app label: the root directory's stem, casing preserved
    pub fn app_name(&self) -> String {
        stem(self.root())
    }

    /// Lowercase database name, not yet validated
    pub fn raw_db_name(&self) -> String {
        match self {
            Self::Instance(inst) => inst.qualified_name.to_lowercase(),
            Self::Path(path) => stem(path).to_lowercase(),
        }
    }

    /// Validated database name for this plugin
    pub fn db_name(&self) -> Result<DbName> {
        DbName::new(self.raw_db_name())
    }
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Database name safe to embed in DDL once quoted
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DbName(String);

impl DbName {
    /// Validate a database name
    ///
    /// Rejects empty names, names with NUL bytes and names longer than
    /// `MAX_DB_NAME_LENGTH` bytes.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let reason = if name.is_empty() {
            Some("name cannot be empty".to_string())
        } else if name.contains('\0') {
            Some("name contains a null byte".to_string())
        } else if name.len() > MAX_DB_NAME_LENGTH {
            Some(format!(
                "name exceeds {} bytes (got {})",
                MAX_DB_NAME_LENGTH,
                name.len()
            ))
        } else {
            None
        };

        match reason {
            Some(reason) => Err(ConfigError::InvalidDatabaseName { name, reason }),
            None => Ok(Self(name)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Double-quoted identifier with embedded quotes doubled
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0.replace('"', "\"\""))
    }
}

impl fmt::Display for DbName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DbName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Output of identity resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPlugin {
    /// Working directory for the migration tool
    pub root: PathBuf,
    /// Database owned by the plugin
    pub db_name: DbName,
    /// Migration app label
    pub app_name: String,
}
