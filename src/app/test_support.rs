//! Scripted fakes for the app ports, shared by unit and integration tests.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use obreplay_domain::{
    ActiveStatement, BindParams, CapturedBind, CapturedStatementRecord, ExecutionOutcome,
    RecentStatement,
};

use crate::ports::{
    ActivityCatalog, AnalysisTool, CaptureSink, CatalogError, ExecutionError, ExecutionService,
    ToolError, ToolOutput,
};

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedCall {
    Explain(String),
    Execute {
        statement: String,
        params: BindParams,
        want_rows: bool,
    },
}

/// Succeeds for every statement unless a rule says otherwise.
///
/// Failure rules match on a substring of the statement text.
#[derive(Debug, Default)]
pub struct ScriptedExecutionService {
    latency: Option<Duration>,
    explain_failures: Vec<(String, String)>,
    execute_failures: Vec<(String, Option<String>)>,
    rows: Vec<(String, Vec<Vec<String>>)>,
    setup_error: Option<ExecutionError>,
    error_rules: Vec<(String, ExecutionError)>,
    calls: Mutex<Vec<ScriptedCall>>,
}

impl ScriptedExecutionService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps this long before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn fail_explain_matching(mut self, needle: &str, error_text: &str) -> Self {
        self.explain_failures
            .push((needle.to_string(), error_text.to_string()));
        self
    }

    pub fn fail_execute_matching(mut self, needle: &str, error_text: &str) -> Self {
        self.execute_failures
            .push((needle.to_string(), Some(error_text.to_string())));
        self
    }

    /// Execution fails without any error text.
    pub fn fail_execute_silently(mut self, needle: &str) -> Self {
        self.execute_failures.push((needle.to_string(), None));
        self
    }

    /// Rows returned by `execute` for matching statements.
    pub fn with_rows(mut self, needle: &str, rows: Vec<Vec<String>>) -> Self {
        self.rows.push((needle.to_string(), rows));
        self
    }

    /// Every call fails before reaching the engine.
    pub fn with_setup_error(mut self, error: ExecutionError) -> Self {
        self.setup_error = Some(error);
        self
    }

    /// Calls for matching statements fail before reaching the engine.
    pub fn error_matching(mut self, needle: &str, error: ExecutionError) -> Self {
        self.error_rules.push((needle.to_string(), error));
        self
    }

    fn setup_error_for(&self, statement: &str) -> Option<ExecutionError> {
        self.setup_error.clone().or_else(|| {
            self.error_rules
                .iter()
                .find(|(needle, _)| statement.contains(needle.as_str()))
                .map(|(_, error)| error.clone())
        })
    }

    pub fn calls(&self) -> Vec<ScriptedCall> {
        guard(&self.calls).clone()
    }

    pub fn explain_count(&self) -> usize {
        guard(&self.calls)
            .iter()
            .filter(|c| matches!(c, ScriptedCall::Explain(_)))
            .count()
    }

    pub fn execute_count(&self) -> usize {
        guard(&self.calls)
            .iter()
            .filter(|c| matches!(c, ScriptedCall::Execute { .. }))
            .count()
    }

    async fn pause(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl ExecutionService for ScriptedExecutionService {
    async fn execute(
        &self,
        statement: &str,
        params: &BindParams,
        want_rows: bool,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        guard(&self.calls).push(ScriptedCall::Execute {
            statement: statement.to_string(),
            params: params.clone(),
            want_rows,
        });
        self.pause().await;

        if let Some(error) = self.setup_error_for(statement) {
            return Err(error);
        }
        if let Some((_, error_text)) = self
            .execute_failures
            .iter()
            .find(|(needle, _)| statement.contains(needle.as_str()))
        {
            let mut outcome = ExecutionOutcome::failure(statement, "", 1.0);
            outcome.error_text = error_text.clone();
            return Ok(outcome);
        }

        let mut outcome = ExecutionOutcome::success(statement, 1.0);
        if want_rows {
            let rows = self
                .rows
                .iter()
                .find(|(needle, _)| statement.contains(needle.as_str()))
                .map(|(_, rows)| rows.clone())
                .unwrap_or_default();
            outcome = outcome.with_rows(rows);
        }
        Ok(outcome)
    }

    async fn explain(&self, statement: &str) -> Result<ExecutionOutcome, ExecutionError> {
        guard(&self.calls).push(ScriptedCall::Explain(statement.to_string()));
        self.pause().await;

        if let Some(error) = self.setup_error_for(statement) {
            return Err(error);
        }
        match self
            .explain_failures
            .iter()
            .find(|(needle, _)| statement.contains(needle.as_str()))
        {
            Some((_, error_text)) => Ok(ExecutionOutcome::failure(statement, error_text, 1.0)),
            None => Ok(ExecutionOutcome::success(statement, 1.0)
                .with_plan(format!("PLAN FOR {}", statement))),
        }
    }
}

/// Replays queued poll batches; an exhausted queue yields empty batches.
#[derive(Debug, Default)]
pub struct ScriptedCatalog {
    now: Option<NaiveDateTime>,
    polls: Mutex<VecDeque<Result<Vec<ActiveStatement>, CatalogError>>>,
    binds: HashMap<(String, i64), Vec<CapturedBind>>,
    recent: Option<Result<Vec<RecentStatement>, CatalogError>>,
    baselines: HashMap<String, f64>,
    poll_cursors: Mutex<Vec<NaiveDateTime>>,
    bind_lookups: Mutex<Vec<(String, i64)>>,
    recent_requests: Mutex<Vec<(usize, Vec<String>, Vec<String>)>>,
}

impl ScriptedCatalog {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Some(now),
            ..Default::default()
        }
    }

    /// `current_time` fails with a query error.
    pub fn without_clock() -> Self {
        Self::default()
    }

    pub fn then_poll(self, rows: Vec<ActiveStatement>) -> Self {
        guard(&self.polls).push_back(Ok(rows));
        self
    }

    pub fn then_poll_error(self, error: CatalogError) -> Self {
        guard(&self.polls).push_back(Err(error));
        self
    }

    pub fn with_binds(mut self, sql_id: &str, child_number: i64, binds: Vec<CapturedBind>) -> Self {
        self.binds.insert((sql_id.to_string(), child_number), binds);
        self
    }

    pub fn with_recent(mut self, rows: Vec<RecentStatement>) -> Self {
        self.recent = Some(Ok(rows));
        self
    }

    pub fn with_recent_error(mut self, error: CatalogError) -> Self {
        self.recent = Some(Err(error));
        self
    }

    pub fn with_baseline(mut self, sql_id: &str, ms: f64) -> Self {
        self.baselines.insert(sql_id.to_string(), ms);
        self
    }

    /// The `since` argument of every poll, in order.
    pub fn poll_cursors(&self) -> Vec<NaiveDateTime> {
        guard(&self.poll_cursors).clone()
    }

    pub fn bind_lookups(&self) -> Vec<(String, i64)> {
        guard(&self.bind_lookups).clone()
    }

    pub fn recent_requests(&self) -> Vec<(usize, Vec<String>, Vec<String>)> {
        guard(&self.recent_requests).clone()
    }
}

#[async_trait]
impl ActivityCatalog for ScriptedCatalog {
    async fn current_time(&self) -> Result<NaiveDateTime, CatalogError> {
        self.now
            .ok_or_else(|| CatalogError::QueryFailed("ORA-00942: dual is missing".to_string()))
    }

    async fn fetch_active_since(
        &self,
        since: NaiveDateTime,
        limit: usize,
    ) -> Result<Vec<ActiveStatement>, CatalogError> {
        guard(&self.poll_cursors).push(since);
        let next = guard(&self.polls).pop_front();
        match next {
            Some(Ok(mut rows)) => {
                rows.truncate(limit);
                Ok(rows)
            }
            Some(Err(error)) => Err(error),
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_binds(
        &self,
        sql_id: &str,
        child_number: i64,
    ) -> Result<Vec<CapturedBind>, CatalogError> {
        guard(&self.bind_lookups).push((sql_id.to_string(), child_number));
        Ok(self
            .binds
            .get(&(sql_id.to_string(), child_number))
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_recent(
        &self,
        limit: usize,
        schemas: &[String],
        modules: &[String],
    ) -> Result<Vec<RecentStatement>, CatalogError> {
        guard(&self.recent_requests).push((limit, schemas.to_vec(), modules.to_vec()));
        match &self.recent {
            Some(Ok(rows)) => Ok(rows.iter().take(limit).cloned().collect()),
            Some(Err(error)) => Err(error.clone()),
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_baseline_ms(&self, sql_id: &str) -> Result<Option<f64>, CatalogError> {
        Ok(self.baselines.get(sql_id).copied())
    }
}

/// Keeps appended records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<CapturedStatementRecord>,
    pub fail_writes: bool,
}

impl CaptureSink for MemorySink {
    fn append(&mut self, record: &CapturedStatementRecord) -> std::io::Result<()> {
        if self.fail_writes {
            return Err(std::io::Error::other("disk full"));
        }
        self.records.push(record.clone());
        Ok(())
    }
}

/// Writes a fixed `sqls.txt` into the capture directory when asked to analyze.
#[derive(Debug, Default)]
pub struct ScriptedAnalysisTool {
    pub sqls: Option<Vec<String>>,
    pub stdout: String,
    pub stderr: String,
}

#[async_trait]
impl AnalysisTool for ScriptedAnalysisTool {
    async fn analyze(
        &self,
        capture_dir: &Path,
        extra_args: &[String],
    ) -> Result<ToolOutput, ToolError> {
        if let Some(sqls) = &self.sqls {
            let mut content = sqls.join("\n");
            content.push('\n');
            tokio::fs::write(capture_dir.join("sqls.txt"), content)
                .await
                .map_err(|e| ToolError::Io(e.to_string()))?;
        }
        Ok(ToolOutput {
            command_line: format!(
                "oma analyze --input {} {}",
                capture_dir.display(),
                extra_args.join(" ")
            ),
            stdout: self.stdout.clone(),
            stderr: self.stderr.clone(),
            exit_code: Some(0),
        })
    }
}
