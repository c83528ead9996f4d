use async_trait::async_trait;
use thiserror::Error;

use obreplay_domain::{BindParams, ExecutionOutcome};

/// The call could not be made at all. A statement the engine rejected is not
/// an error: it comes back as an outcome with `succeeded == false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("Command not found: {0}")]
    CommandNotFound(String),
    #[error("Failed to start client: {0}")]
    Spawn(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Operation timed out after {secs}s")]
    Timeout { secs: u64 },
}

impl ExecutionError {
    /// The client cannot be started at all. A timeout or I/O failure belongs
    /// to the statement that hit it.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ExecutionError::CommandNotFound(_) | ExecutionError::Spawn(_)
        )
    }
}

/// Runs SQL against one engine.
///
/// Implementations always populate `elapsed_ms` and `succeeded`; `explain`
/// additionally fills `plan_text` on success and reports the caller's
/// statement, not the EXPLAIN wrapper, in `statement`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExecutionService: Send + Sync {
    async fn execute(
        &self,
        statement: &str,
        params: &BindParams,
        want_rows: bool,
    ) -> Result<ExecutionOutcome, ExecutionError>;

    async fn explain(&self, statement: &str) -> Result<ExecutionOutcome, ExecutionError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    mod is_fatal {
        use super::*;

        #[rstest]
        #[case(ExecutionError::CommandNotFound("obclient".to_string()), true)]
        #[case(ExecutionError::Spawn("permission denied".to_string()), true)]
        #[case(ExecutionError::Timeout { secs: 60 }, false)]
        #[case(ExecutionError::Io("broken pipe".to_string()), false)]
        fn only_startup_failures_are_fatal(#[case] error: ExecutionError, #[case] expected: bool) {
            assert_eq!(error.is_fatal(), expected);
        }
    }
}
