use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tracing::{debug, warn};

use obreplay_app::ports::{ActivityCatalog, CatalogError, ExecutionService};
use obreplay_domain::{ActiveStatement, BindParams, CapturedBind, RecentStatement};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const CURRENT_TIME_SQL: &str = "SELECT TO_CHAR(SYSDATE, 'YYYY-MM-DD\"T\"HH24:MI:SS') FROM dual";

const ACTIVE_SINCE_SQL: &str = "SELECT sql_id, child_number, parsing_schema_name, module, \
TO_CHAR(last_active_time, 'YYYY-MM-DD\"T\"HH24:MI:SS'), sql_fulltext, elapsed_time, executions, \
cpu_time, buffer_gets, disk_reads, rows_processed, fetches \
FROM (SELECT * FROM v$sql WHERE last_active_time > :since ORDER BY last_active_time) \
WHERE ROWNUM <= :limit";

const BINDS_SQL: &str = "SELECT position, name, datatype_string, value_string \
FROM v$sql_bind_capture WHERE sql_id = :sql_id AND child_number = :child ORDER BY position";

const BASELINE_SQL: &str =
    "SELECT elapsed_time/1000/executions FROM v$sql WHERE sql_id = :sql_id AND executions > 0";

/// Source-engine activity views, queried through any execution service.
pub struct OracleCatalog {
    source: Arc<dyn ExecutionService>,
}

impl OracleCatalog {
    pub fn new(source: Arc<dyn ExecutionService>) -> Self {
        Self { source }
    }

    async fn query(&self, sql: &str, params: &BindParams) -> Result<Vec<Vec<String>>, CatalogError> {
        let outcome = self.source.execute(sql, params, true).await?;
        if !outcome.succeeded {
            let error = outcome
                .error_text
                .unwrap_or_else(|| "unknown error".to_string());
            warn!(error = %error, "catalog query failed");
            return Err(CatalogError::QueryFailed(error));
        }
        Ok(outcome.rows.unwrap_or_default())
    }
}

/// `WHERE` for the online fetch, with one `:prefixN` placeholder per value.
fn recent_query(schemas: &[String], modules: &[String], params: &mut BindParams) -> String {
    let mut filters = vec!["sql_text IS NOT NULL".to_string()];
    if !schemas.is_empty() {
        filters.push(format!(
            "parsing_schema_name IN ({})",
            bind_list("sch", schemas, params)
        ));
    }
    if !modules.is_empty() {
        filters.push(format!("module IN ({})", bind_list("mod", modules, params)));
    }
    format!(
        "SELECT sql_fulltext, elapsed_time, executions FROM \
(SELECT * FROM v$sql WHERE {} ORDER BY last_active_time DESC) WHERE ROWNUM <= :limit",
        filters.join(" AND ")
    )
}

fn bind_list(prefix: &str, values: &[String], params: &mut BindParams) -> String {
    values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let name = format!("{}{}", prefix, i);
            params.insert(name.clone(), value.as_str());
            format!(":{}", name)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn cell(row: &[String], index: usize) -> Option<&str> {
    row.get(index)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

fn text(row: &[String], index: usize) -> Option<String> {
    cell(row, index).map(str::to_string)
}

/// Blank or non-numeric cells read as absent.
fn number(row: &[String], index: usize) -> Option<i64> {
    cell(row, index).and_then(|s| s.parse().ok())
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT).ok()
}

fn active_statement(row: &[String]) -> Option<ActiveStatement> {
    let sql_id = text(row, 0)?;
    let Some(last_active) = cell(row, 4).and_then(parse_timestamp) else {
        warn!(sql_id = %sql_id, "dropping row with unreadable last_active_time");
        return None;
    };
    Some(ActiveStatement {
        sql_id,
        child_number: number(row, 1).unwrap_or(0),
        schema: text(row, 2),
        module: text(row, 3),
        last_active,
        sql_text: row.get(5).cloned().unwrap_or_default(),
        elapsed_time_us: number(row, 6),
        executions: number(row, 7),
        cpu_time_us: number(row, 8),
        buffer_gets: number(row, 9),
        disk_reads: number(row, 10),
        rows_processed: number(row, 11),
        fetches: number(row, 12),
    })
}

#[async_trait]
impl ActivityCatalog for OracleCatalog {
    async fn current_time(&self) -> Result<NaiveDateTime, CatalogError> {
        let rows = self.query(CURRENT_TIME_SQL, &BindParams::new()).await?;
        let value = rows
            .first()
            .and_then(|row| cell(row, 0))
            .ok_or_else(|| CatalogError::MalformedRow("empty SYSDATE result".to_string()))?;
        parse_timestamp(value)
            .ok_or_else(|| CatalogError::MalformedRow(format!("unreadable SYSDATE: {}", value)))
    }

    async fn fetch_active_since(
        &self,
        since: NaiveDateTime,
        limit: usize,
    ) -> Result<Vec<ActiveStatement>, CatalogError> {
        let params = BindParams::new().with("since", since).with("limit", limit);
        let rows = self.query(ACTIVE_SINCE_SQL, &params).await?;
        let statements: Vec<_> = rows.iter().filter_map(|row| active_statement(row)).collect();
        debug!(since = %since, rows = rows.len(), kept = statements.len(), "fetched active statements");
        Ok(statements)
    }

    async fn fetch_binds(
        &self,
        sql_id: &str,
        child_number: i64,
    ) -> Result<Vec<CapturedBind>, CatalogError> {
        let params = BindParams::new()
            .with("sql_id", sql_id)
            .with("child", child_number);
        let rows = self.query(BINDS_SQL, &params).await?;
        Ok(rows
            .iter()
            .map(|row| CapturedBind {
                position: number(row, 0).unwrap_or(0),
                name: text(row, 1),
                datatype: text(row, 2),
                value: text(row, 3),
            })
            .collect())
    }

    async fn fetch_recent(
        &self,
        limit: usize,
        schemas: &[String],
        modules: &[String],
    ) -> Result<Vec<RecentStatement>, CatalogError> {
        let mut params = BindParams::new().with("limit", limit);
        let sql = recent_query(schemas, modules, &mut params);
        let rows = self.query(&sql, &params).await?;
        Ok(rows
            .iter()
            .filter_map(|row| {
                Some(RecentStatement {
                    sql_text: text(row, 0)?,
                    elapsed_time_us: number(row, 1),
                    executions: number(row, 2),
                })
            })
            .collect())
    }

    async fn fetch_baseline_ms(&self, sql_id: &str) -> Result<Option<f64>, CatalogError> {
        let params = BindParams::new().with("sql_id", sql_id);
        let rows = self.query(BASELINE_SQL, &params).await?;
        Ok(rows
            .first()
            .and_then(|row| cell(row, 0))
            .and_then(|value| value.parse().ok()))
    }
}
