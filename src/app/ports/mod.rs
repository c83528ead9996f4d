pub mod activity_catalog;
pub mod analysis_tool;
pub mod capture_sink;
pub mod execution_service;

pub use activity_catalog::{ActivityCatalog, CatalogError};
pub use analysis_tool::{AnalysisTool, ToolError, ToolOutput};
pub use capture_sink::CaptureSink;
pub use execution_service::{ExecutionError, ExecutionService};

#[cfg(test)]
pub use execution_service::MockExecutionService;
