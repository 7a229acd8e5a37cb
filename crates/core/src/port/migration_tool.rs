// Migration Tool Port
// Abstraction over the external migration executable

use crate::domain::ToolOutput;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// One call of the migration tool, minus the executable itself
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolInvocation {
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Overlaid on top of the parent environment
    pub env: BTreeMap<String, String>,
}

impl ToolInvocation {
    /// Space-joined arguments, for logs
    pub fn display_args(&self) -> String {
        self.args.join(" ")
    }
}

/// Execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Executable not found: {0}")]
    ExecutableNotFound(String),

    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Migration Tool trait
///
/// Implementations:
/// - PiccoloCli: locates the executable on PATH and spawns it
#[async_trait]
pub trait MigrationTool: Send + Sync {
    /// Run the tool and capture its combined output
    ///
    /// A tool that runs and reports an error is NOT an `Err`: the failure is
    /// in the returned text and exit code.
    ///
    /// # Errors
    /// - ExecutionError::ExecutableNotFound if the tool cannot be located
    /// - ExecutionError::SpawnFailed if the process cannot be started
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ExecutionError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Scripted migration tool
    ///
    /// Answers with the first response whose argument prefix matches, else
    /// with the default output. Every invocation is recorded.
    pub struct MockMigrationTool {
        default_output: ToolOutput,
        responses: Vec<(Vec<String>, ToolOutput)>,
        invocations: Arc<Mutex<Vec<ToolInvocation>>>,
        missing: bool,
    }

    impl MockMigrationTool {
        pub fn new(default_text: impl Into<String>) -> Self {
            Self {
                default_output: ToolOutput::new(default_text, Some(0)),
                responses: Vec::new(),
                invocations: Arc::new(Mutex::new(Vec::new())),
                missing: false,
            }
        }

        /// Tool that cannot be located
        pub fn new_missing() -> Self {
            Self {
                missing: true,
                ..Self::new("")
            }
        }

        pub fn with_response(mut self, arg_prefix: &[&str], output: ToolOutput) -> Self {
            self.responses.push((
                arg_prefix.iter().map(|s| s.to_string()).collect(),
                output,
            ));
            self
        }

        pub fn invocations(&self) -> Vec<ToolInvocation> {
            self.invocations.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.invocations.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl MigrationTool for MockMigrationTool {
        async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ExecutionError> {
            if self.missing {
                return Err(ExecutionError::ExecutableNotFound(
                    "piccolo (searched system PATH)".to_string(),
                ));
            }
            self.invocations.lock().unwrap().push(invocation.clone());

            let output = self
                .responses
                .iter()
                .find(|(prefix, _)| invocation.args.starts_with(prefix))
                .map(|(_, output)| output.clone())
                .unwrap_or_else(|| self.default_output.clone());
            Ok(output)
        }
    }
}
