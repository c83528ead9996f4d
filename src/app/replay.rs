//! Loads a workload from one source and evaluates every statement against the
//! target. A failed statement lands in its own verdict or summary; only a
//! client that cannot start aborts the run.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use obreplay_domain::{ReplayMode, ReplayReport, StatementSource};

use crate::benchmark::PercentileBenchmarker;
use crate::compatibility::CompatibilityClassifier;
use crate::ports::{
    ActivityCatalog, AnalysisTool, CatalogError, ExecutionError, ExecutionService, ToolError,
};
use crate::sources;

/// File the analysis tool materializes inside a capture directory.
pub const ANALYZED_SQL_FILE: &str = "sqls.txt";

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error("Online source requires a source connection")]
    MissingCatalog,
    #[error("Failed to write {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayOptions {
    pub mode: ReplayMode,
    pub iterations: usize,
    pub concurrency: usize,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            mode: ReplayMode::Compat,
            iterations: 1,
            concurrency: 1,
        }
    }
}

/// Statements obtained from a source, before evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedStatements {
    pub statements: Vec<String>,
    pub baselines: BTreeMap<String, f64>,
    pub external_tool_output: Option<String>,
}

pub struct ReplayOrchestrator {
    classifier: CompatibilityClassifier,
    benchmarker: PercentileBenchmarker,
    catalog: Option<Arc<dyn ActivityCatalog>>,
    analysis_tool: Option<Arc<dyn AnalysisTool>>,
}

impl ReplayOrchestrator {
    pub fn new(target: Arc<dyn ExecutionService>) -> Self {
        Self {
            classifier: CompatibilityClassifier::new(Arc::clone(&target)),
            benchmarker: PercentileBenchmarker::new(target),
            catalog: None,
            analysis_tool: None,
        }
    }

    /// Source catalog used by online sources.
    pub fn with_catalog(mut self, catalog: Arc<dyn ActivityCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Tool run over capture directories before `sqls.txt` is read.
    pub fn with_analysis_tool(mut self, tool: Arc<dyn AnalysisTool>) -> Self {
        self.analysis_tool = Some(tool);
        self
    }

    pub async fn run(
        &self,
        source: &StatementSource,
        options: ReplayOptions,
    ) -> Result<ReplayReport, ReplayError> {
        let loaded = self.load(source).await?;
        info!(
            source = source.kind(),
            mode = %options.mode,
            statements = loaded.statements.len(),
            "replay started"
        );
        let report = self.evaluate(loaded, options).await?;
        info!(
            supported = report.supported_count(),
            unsupported = report.unsupported_count(),
            failed_executions = report.failed_execution_count(),
            "replay finished"
        );
        Ok(report)
    }

    pub async fn load(&self, source: &StatementSource) -> Result<LoadedStatements, ReplayError> {
        match source {
            StatementSource::CaptureDir { path, extra_args } => {
                let external_tool_output = match &self.analysis_tool {
                    Some(tool) => {
                        let output = tool.analyze(path, extra_args).await?;
                        debug!(command = %output.command_line, exit_code = ?output.exit_code, "analysis tool finished");
                        Some(output.combined())
                    }
                    None => None,
                };
                Ok(LoadedStatements {
                    statements: sources::read_sql_lines(&path.join(ANALYZED_SQL_FILE)).await,
                    external_tool_output,
                    ..Default::default()
                })
            }
            StatementSource::CaptureLog(path) => Ok(LoadedStatements {
                statements: sources::read_capture_log(path).await,
                ..Default::default()
            }),
            StatementSource::SqlFile(path) => Ok(LoadedStatements {
                statements: sources::read_sql_lines(path).await,
                ..Default::default()
            }),
            StatementSource::Online {
                limit,
                schemas,
                modules,
                store_file,
            } => {
                let catalog = self.catalog.as_ref().ok_or(ReplayError::MissingCatalog)?;
                let recent = catalog.fetch_recent(*limit, schemas, modules).await?;

                let mut loaded = LoadedStatements::default();
                for row in recent {
                    let text = row.sql_text.trim();
                    if text.is_empty() {
                        continue;
                    }
                    if let Some(baseline) = row.baseline_ms() {
                        loaded.baselines.insert(text.to_string(), baseline);
                    }
                    loaded.statements.push(text.to_string());
                }

                if let Some(path) = store_file {
                    sources::write_sql_lines(path, &loaded.statements)
                        .await
                        .map_err(|e| ReplayError::Io {
                            path: path.clone(),
                            message: e.to_string(),
                        })?;
                }
                Ok(loaded)
            }
        }
    }

    /// Statements are evaluated one at a time, in source order.
    pub async fn evaluate(
        &self,
        loaded: LoadedStatements,
        options: ReplayOptions,
    ) -> Result<ReplayReport, ReplayError> {
        let LoadedStatements {
            statements,
            baselines,
            external_tool_output,
        } = loaded;
        let mut report = ReplayReport {
            external_tool_output,
            ..Default::default()
        };

        match options.mode {
            ReplayMode::Compat => {
                for statement in &statements {
                    let verdict = self.classifier.classify(statement, false).await?;
                    debug!(statement = %statement, supported = verdict.supported, "classified");
                    report.compatibility_results.push(verdict);
                }
            }
            ReplayMode::Perf => {
                for statement in &statements {
                    let summary = self
                        .benchmarker
                        .benchmark(
                            statement,
                            options.iterations,
                            options.concurrency,
                            baselines.get(statement).copied(),
                        )
                        .await?;
                    report.benchmark_results.push(summary);
                }
            }
        }

        report.statements = statements;
        report.baselines = baselines;
        Ok(report)
    }
}
