// Migration tool output classification

/// Printed by the migration tool when the schema is already current
pub const NO_MIGRATIONS_MARKER: &str = "No migrations need to be run";

/// Printed by the migration tool's interpreter on an uncaught error
pub const FAILURE_MARKER: &str = "Traceback";

/// Raw result of one migration tool invocation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolOutput {
    /// Combined stdout and stderr
    pub text: String,
    /// None when the process was terminated by a signal
    pub exit_code: Option<i32>,
}

impl ToolOutput {
    pub fn new(text: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self {
            text: text.into(),
            exit_code,
        }
    }

    pub fn exited_with_error(&self) -> bool {
        matches!(self.exit_code, Some(code) if code != 0)
    }
}

/// What a forward/backward migration run amounted to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Nothing to apply
    NoOp,
    /// The tool ran and reported something other than a failure
    Applied(String),
    /// The tool crashed with an uncaught error
    Failed(String),
}

impl MigrationOutcome {
    /// Classify tool output by substring inspection
    ///
    /// The no-op marker wins over everything else, then the failure marker.
    /// The exit code is not consulted; anything else is informational.
    pub fn classify(output: &ToolOutput) -> Self {
        if output.text.contains(NO_MIGRATIONS_MARKER) {
            Self::NoOp
        } else if output.text.contains(FAILURE_MARKER) {
            Self::Failed(output.text.clone())
        } else {
            Self::Applied(output.text.clone())
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}
