pub mod benchmark;
pub mod capture;
pub mod config;
pub mod connection;
pub mod execution;
pub mod report;
pub mod source;
pub mod verdict;

pub use benchmark::BenchmarkSummary;
pub use capture::{
    ActiveStatement, CaptureKey, CapturedBind, CapturedStatementRecord, RecentStatement,
    average_elapsed_ms,
};
pub use config::{OmaSettings, ToolConfig};
pub use execution::{BindParams, ExecutionOutcome, SqlParam};
pub use report::{ReplayMode, ReplayReport};
pub use source::StatementSource;
pub use verdict::{CheckStage, CompatibilityVerdict};
