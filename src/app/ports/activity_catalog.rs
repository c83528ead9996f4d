use async_trait::async_trait;
use chrono::NaiveDateTime;
use thiserror::Error;

use obreplay_domain::{ActiveStatement, CapturedBind, RecentStatement};

use super::ExecutionError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error("Catalog query failed: {0}")]
    QueryFailed(String),
    #[error("Malformed catalog row: {0}")]
    MalformedRow(String),
}

impl CatalogError {
    /// Only a failure to reach the engine stops a long-running capture.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CatalogError::Execution(_))
    }
}

/// Read access to the source engine's statement-activity views.
#[async_trait]
pub trait ActivityCatalog: Send + Sync {
    /// Current time according to the source engine.
    async fn current_time(&self) -> Result<NaiveDateTime, CatalogError>;

    /// Statements active strictly after `since`, oldest first, at most `limit`.
    async fn fetch_active_since(
        &self,
        since: NaiveDateTime,
        limit: usize,
    ) -> Result<Vec<ActiveStatement>, CatalogError>;

    /// Captured bind values for one statement instance, ordered by position.
    async fn fetch_binds(
        &self,
        sql_id: &str,
        child_number: i64,
    ) -> Result<Vec<CapturedBind>, CatalogError>;

    /// Most recently active statements, newest first.
    async fn fetch_recent(
        &self,
        limit: usize,
        schemas: &[String],
        modules: &[String],
    ) -> Result<Vec<RecentStatement>, CatalogError>;

    /// Average elapsed milliseconds for one SQL_ID, if it has executed.
    async fn fetch_baseline_ms(&self, sql_id: &str) -> Result<Option<f64>, CatalogError>;
}
