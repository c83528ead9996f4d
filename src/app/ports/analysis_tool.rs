use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("Analysis tool path is not configured")]
    NotConfigured,
    #[error("Command not found: {0}")]
    CommandNotFound(String),
    #[error("IO error: {0}")]
    Io(String),
}

/// Captured output of one analysis-tool run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Shell-style rendering of the invocation, secrets masked
    pub command_line: String,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl ToolOutput {
    /// stdout followed by stderr, verbatim.
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// External workload analyzer that turns a capture directory into `sqls.txt`.
#[async_trait]
pub trait AnalysisTool: Send + Sync {
    async fn analyze(
        &self,
        capture_dir: &Path,
        extra_args: &[String],
    ) -> Result<ToolOutput, ToolError>;
}
