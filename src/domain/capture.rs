use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One row of the source engine's active-statement view.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveStatement {
    pub sql_id: String,
    pub child_number: i64,
    pub schema: Option<String>,
    pub module: Option<String>,
    pub last_active: NaiveDateTime,
    pub sql_text: String,
    pub elapsed_time_us: Option<i64>,
    pub executions: Option<i64>,
    pub cpu_time_us: Option<i64>,
    pub buffer_gets: Option<i64>,
    pub disk_reads: Option<i64>,
    pub rows_processed: Option<i64>,
    pub fetches: Option<i64>,
}

impl ActiveStatement {
    pub fn capture_key(&self) -> CaptureKey {
        CaptureKey {
            sql_id: self.sql_id.clone(),
            child_number: self.child_number,
            last_active: self.last_active,
        }
    }
}

/// Identity of one observed statement instance, used for de-duplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CaptureKey {
    pub sql_id: String,
    pub child_number: i64,
    pub last_active: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedBind {
    pub position: i64,
    pub name: Option<String>,
    pub datatype: Option<String>,
    pub value: Option<String>,
}

/// A line of the capture log. Written once, never rewritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedStatementRecord {
    pub sql_id: String,
    pub child_number: i64,
    pub schema: Option<String>,
    pub module: Option<String>,
    pub last_active_time: NaiveDateTime,
    pub sql_text: String,
    #[serde(default)]
    pub binds: Vec<CapturedBind>,
    pub executions: Option<i64>,
    pub avg_elapsed_ms: Option<f64>,
    pub elapsed_time_us: Option<i64>,
    pub cpu_time_us: Option<i64>,
    pub buffer_gets: Option<i64>,
    pub disk_reads: Option<i64>,
    pub rows_processed: Option<i64>,
    pub fetches: Option<i64>,
}

impl CapturedStatementRecord {
    pub fn from_active(active: ActiveStatement, binds: Vec<CapturedBind>) -> Self {
        let avg_elapsed_ms = average_elapsed_ms(active.elapsed_time_us, active.executions);
        Self {
            sql_id: active.sql_id,
            child_number: active.child_number,
            schema: active.schema,
            module: active.module,
            last_active_time: active.last_active,
            sql_text: active.sql_text,
            binds,
            executions: active.executions,
            avg_elapsed_ms,
            elapsed_time_us: active.elapsed_time_us,
            cpu_time_us: active.cpu_time_us,
            buffer_gets: active.buffer_gets,
            disk_reads: active.disk_reads,
            rows_processed: active.rows_processed,
            fetches: active.fetches,
        }
    }
}

/// Statement text plus cumulative statistics, as returned by an online fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct RecentStatement {
    pub sql_text: String,
    pub elapsed_time_us: Option<i64>,
    pub executions: Option<i64>,
}

impl RecentStatement {
    pub fn baseline_ms(&self) -> Option<f64> {
        average_elapsed_ms(self.elapsed_time_us, self.executions)
    }
}

/// Cumulative microseconds divided by execution count, in milliseconds.
pub fn average_elapsed_ms(elapsed_time_us: Option<i64>, executions: Option<i64>) -> Option<f64> {
    match (elapsed_time_us, executions) {
        (Some(elapsed), Some(execs)) if execs > 0 => Some(elapsed as f64 / 1000.0 / execs as f64),
        _ => None,
    }
}
