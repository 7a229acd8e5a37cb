// Path/Identity Resolver
use crate::domain::error::{ConfigError, Result};
use crate::domain::{PluginIdentity, ResolvedPlugin};
use std::path::{Path, PathBuf};

/// Resolve a plugin to its root directory and database name
///
/// Checks, in order: UNC root, root is an existing directory, database name
/// is valid.
pub fn resolve(identity: &PluginIdentity) -> Result<ResolvedPlugin> {
    let root = identity.root();
    check_directory(root)?;

    Ok(ResolvedPlugin {
        root: root.to_path_buf(),
        db_name: identity.db_name()?,
        app_name: identity.app_name(),
    })
}

/// Resolve the directory that holds a plugin's file-backed database
pub fn resolve_data_dir(identity: &PluginIdentity) -> Result<PathBuf> {
    let data_dir = identity.data_dir();
    check_directory(data_dir)?;
    Ok(data_dir.to_path_buf())
}

fn check_directory(path: &Path) -> Result<()> {
    if is_unc_path(path) {
        return Err(ConfigError::UncPath(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Err(ConfigError::InvalidDirectory(path.to_path_buf()));
    }
    Ok(())
}

/// True for network paths (`\\server\share\...`)
pub fn is_unc_path(path: &Path) -> bool {
    #[cfg(windows)]
    {
        use std::path::{Component, Prefix};

        if let Some(Component::Prefix(prefix)) = path.components().next() {
            if matches!(prefix.kind(), Prefix::UNC(..) | Prefix::VerbatimUNC(..)) {
                return true;
            }
        }
    }

    path.to_string_lossy().starts_with(r"\\")
}
