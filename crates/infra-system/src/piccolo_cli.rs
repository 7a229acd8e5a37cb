// Migration tool adapter
// Spawns the piccolo CLI in the plugin root and captures its output
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::Instant;
use tracing::{debug, info};

use cogdb_core::domain::ToolOutput;
use cogdb_core::port::{ExecutionError, MigrationTool, ToolInvocation};

use crate::executable::find_piccolo_executable;

/// Emoji the tool prints that some consoles cannot encode
const THUMBS_UP: &str = "👍";

/// Runs the piccolo executable as a child process
///
/// The child inherits the parent environment with the invocation's
/// variables overlaid.
#[derive(Debug, Clone, Default)]
pub struct PiccoloCli {
    executable: Option<PathBuf>,
}

impl PiccoloCli {
    /// Locate the executable on PATH at every run
    pub fn from_env() -> Self {
        Self { executable: None }
    }

    /// Use a fixed executable
    ///
    /// # Example
    /// ```ignore
    /// let tool = PiccoloCli::with_executable("/opt/venv/bin/piccolo");
    /// ```
    pub fn with_executable(path: impl Into<PathBuf>) -> Self {
        Self {
            executable: Some(path.into()),
        }
    }

    fn locate(&self) -> Result<PathBuf, ExecutionError> {
        match &self.executable {
            Some(path) if path.is_file() => Ok(path.clone()),
            Some(path) => Err(ExecutionError::ExecutableNotFound(
                path.display().to_string(),
            )),
            None => find_piccolo_executable(),
        }
    }

    /// Spawn child process and wait for output
    async fn spawn_and_wait(
        &self,
        executable: &Path,
        invocation: &ToolInvocation,
    ) -> Result<std::process::Output, ExecutionError> {
        let child = Command::new(executable)
            .args(&invocation.args)
            .envs(&invocation.env)
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExecutionError::SpawnFailed(format!("{}: {}", executable.display(), e)))?;

        child
            .wait_with_output()
            .await
            .map_err(|e| ExecutionError::IoError(e.to_string()))
    }
}

/// Combined stdout then stderr, lossily decoded
fn build_output(output: &std::process::Output) -> ToolOutput {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&stderr);
    }

    ToolOutput::new(text.replace(THUMBS_UP, "!"), output.status.code())
}

#[async_trait]
impl MigrationTool for PiccoloCli {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ExecutionError> {
        let executable = self.locate()?;
        let started = Instant::now();

        debug!(
            executable = %executable.display(),
            args = %invocation.display_args(),
            working_dir = %invocation.working_dir.display(),
            "Starting migration tool"
        );

        let output = self.spawn_and_wait(&executable, invocation).await?;
        let result = build_output(&output);

        info!(
            args = %invocation.display_args(),
            duration_ms = started.elapsed().as_millis() as u64,
            exit_code = ?result.exit_code,
            "Migration tool finished"
        );

        Ok(result)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::os::unix::fs::PermissionsExt;
    use tokio_test::{assert_err, assert_ok};

    fn script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("piccolo");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn invocation(dir: &Path, args: &[&str]) -> ToolInvocation {
        let mut env = BTreeMap::new();
        env.insert("APP_NAME".to_string(), "Economy".to_string());
        ToolInvocation {
            args: args.iter().map(|s| s.to_string()).collect(),
            working_dir: dir.to_path_buf(),
            env,
        }
    }

    #[tokio::test]
    async fn test_combines_stdout_and_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let tool = PiccoloCli::with_executable(script(
            dir.path(),
            "echo \"running $APP_NAME $@\"\necho 'Traceback (most recent call last):' >&2\nexit 1",
        ));

        let output = assert_ok!(
            tool.run(&invocation(dir.path(), &["migrations", "forwards", "Economy"]))
                .await
        );

        assert_eq!(output.exit_code, Some(1));
        assert!(output.text.contains("running Economy migrations forwards Economy"));
        assert!(output.text.contains("Traceback"));
    }

    #[tokio::test]
    async fn test_replaces_thumbs_up() {
        let dir = tempfile::tempdir().unwrap();
        let tool = PiccoloCli::with_executable(script(dir.path(), "echo '👍 1 app'"));

        let output = tool.run(&invocation(dir.path(), &[])).await.unwrap();

        assert_eq!(output.text, "! 1 app\n");
        assert_eq!(output.exit_code, Some(0));
    }

    #[tokio::test]
    async fn test_runs_in_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let tool = PiccoloCli::with_executable(script(dir.path(), "pwd"));

        let output = tool.run(&invocation(dir.path(), &[])).await.unwrap();

        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(Path::new(output.text.trim()).canonicalize().unwrap(), expected);
    }

    #[tokio::test]
    async fn test_missing_executable() {
        let dir = tempfile::tempdir().unwrap();
        let tool = PiccoloCli::with_executable(dir.path().join("nope"));

        let err = assert_err!(tool.run(&invocation(dir.path(), &[])).await);

        assert!(matches!(err, ExecutionError::ExecutableNotFound(_)));
    }
}
