// Migration executable discovery
use cogdb_core::port::ExecutionError;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;

/// File names tried in every PATH entry
pub const PICCOLO_EXECUTABLE_NAMES: &[&str] = &["piccolo", "piccolo.exe"];

/// Find the piccolo executable in the system's PATH
pub fn find_piccolo_executable() -> Result<PathBuf, ExecutionError> {
    let path_var = std::env::var_os("PATH").unwrap_or_default();
    let found = find_executable_in(&path_var, PICCOLO_EXECUTABLE_NAMES).ok_or_else(|| {
        ExecutionError::ExecutableNotFound("piccolo (searched system PATH)".into())
    })?;

    info!(executable = %found.display(), "Found piccolo executable");
    Ok(found)
}

/// First `dir/name` in a PATH-style list that exists and is executable
pub fn find_executable_in(search_path: &OsStr, names: &[&str]) -> Option<PathBuf> {
    std::env::split_paths(search_path).find_map(|dir| {
        names
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| is_executable(candidate))
    })
}

/// Exists, is a regular file, and the current user may execute it
pub fn is_executable(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use nix::unistd::{access, AccessFlags};
        access(path, AccessFlags::X_OK).is_ok()
    }

    #[cfg(not(unix))]
    {
        true
    }
}
