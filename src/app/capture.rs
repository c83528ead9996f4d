//! Polls the source engine for recently active statements and appends them to
//! a capture log.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDateTime, TimeDelta};
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use obreplay_domain::{ActiveStatement, CaptureKey, CapturedBind, CapturedStatementRecord};

use crate::ports::{ActivityCatalog, CaptureSink, CatalogError};

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("Failed to write capture log: {0}")]
    Sink(String),
}

/// Schema and module admission rules. Comparison is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementFilter {
    schemas: Option<HashSet<String>>,
    modules: Option<HashSet<String>>,
    default_include_all: bool,
}

impl Default for StatementFilter {
    fn default() -> Self {
        Self {
            schemas: None,
            modules: None,
            default_include_all: true,
        }
    }
}

impl StatementFilter {
    /// Empty lists mean "no filter". Without a schema list,
    /// `default_include_all` decides whether anything is admitted.
    pub fn new(schemas: &[String], modules: &[String], default_include_all: bool) -> Self {
        Self {
            schemas: lowered_set(schemas),
            modules: lowered_set(modules),
            default_include_all,
        }
    }

    pub fn admits(&self, statement: &ActiveStatement) -> bool {
        let schema_ok = match &self.schemas {
            Some(schemas) => schemas.contains(&lowered(statement.schema.as_deref())),
            None => self.default_include_all,
        };
        let module_ok = match &self.modules {
            Some(modules) => modules.contains(&lowered(statement.module.as_deref())),
            None => true,
        };
        schema_ok && module_ok
    }
}

fn lowered(value: Option<&str>) -> String {
    value.unwrap_or_default().to_lowercase()
}

fn lowered_set(values: &[String]) -> Option<HashSet<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().map(|v| v.to_lowercase()).collect())
    }
}

#[derive(Debug, Clone)]
pub struct CaptureOptions {
    pub duration: Duration,
    pub poll_interval: Duration,
    pub limit_per_poll: usize,
    pub include_binds: bool,
    pub dedup: bool,
    pub filter: StatementFilter,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(3600),
            poll_interval: Duration::from_secs(5),
            limit_per_poll: 200,
            include_binds: true,
            dedup: false,
            filter: StatementFilter::default(),
        }
    }
}

/// Lower bound for the next poll. Never moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureCursor {
    last_seen: NaiveDateTime,
}

impl CaptureCursor {
    /// Starts one interval before `now` so the first poll has a lower bound.
    pub fn starting_before(now: NaiveDateTime, interval: Duration) -> Self {
        let back = TimeDelta::from_std(interval).unwrap_or_else(|_| TimeDelta::zero());
        Self {
            last_seen: now.checked_sub_signed(back).unwrap_or(now),
        }
    }

    pub fn position(&self) -> NaiveDateTime {
        self.last_seen
    }

    /// Moves to the last row of a batch. Empty batches leave it in place.
    pub fn advance(&mut self, batch: &[ActiveStatement]) {
        if let Some(last) = batch.last() {
            self.last_seen = self.last_seen.max(last.last_active);
        }
    }
}

pub struct CaptureStreamer {
    catalog: Arc<dyn ActivityCatalog>,
}

impl CaptureStreamer {
    pub fn new(catalog: Arc<dyn ActivityCatalog>) -> Self {
        Self { catalog }
    }

    /// Polls until `options.duration` elapses or `cancel` fires, returning the
    /// number of records written. Each record is flushed before the next one.
    pub async fn stream(
        &self,
        sink: &mut dyn CaptureSink,
        options: &CaptureOptions,
        cancel: &CancellationToken,
    ) -> Result<usize, CaptureError> {
        let deadline = Instant::now() + options.duration;
        let mut cursor = CaptureCursor::starting_before(self.start_time().await, options.poll_interval);
        let mut seen: HashSet<CaptureKey> = HashSet::new();
        let mut written = 0;

        info!(
            duration_secs = options.duration.as_secs(),
            interval_secs = options.poll_interval.as_secs(),
            cursor = %cursor.position(),
            "capture started"
        );

        while Instant::now() < deadline && !cancel.is_cancelled() {
            let batch = match self
                .catalog
                .fetch_active_since(cursor.position(), options.limit_per_poll)
                .await
            {
                Ok(batch) => batch,
                Err(e) if e.is_fatal() => {
                    warn!(written, error = %e, "capture aborted");
                    return Err(e.into());
                }
                Err(e) => {
                    warn!(error = %e, "poll failed; treating as empty batch");
                    Vec::new()
                }
            };
            cursor.advance(&batch);
            debug!(rows = batch.len(), cursor = %cursor.position(), "poll finished");

            for statement in batch {
                if !options.filter.admits(&statement) {
                    continue;
                }
                let key = statement.capture_key();
                if options.dedup && seen.contains(&key) {
                    continue;
                }

                let binds = if options.include_binds {
                    self.binds_for(&statement).await?
                } else {
                    Vec::new()
                };
                let record = CapturedStatementRecord::from_active(statement, binds);
                sink.append(&record)
                    .map_err(|e| CaptureError::Sink(e.to_string()))?;
                if options.dedup {
                    seen.insert(key);
                }
                written += 1;
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(options.poll_interval) => {}
            }
        }

        info!(written, "capture finished");
        Ok(written)
    }

    async fn start_time(&self) -> NaiveDateTime {
        match self.catalog.current_time().await {
            Ok(now) => now,
            Err(e) => {
                warn!(error = %e, "source clock unavailable; using local time");
                chrono::Local::now().naive_local()
            }
        }
    }

    async fn binds_for(
        &self,
        statement: &ActiveStatement,
    ) -> Result<Vec<CapturedBind>, CaptureError> {
        match self
            .catalog
            .fetch_binds(&statement.sql_id, statement.child_number)
            .await
        {
            Ok(binds) => Ok(binds),
            Err(e) if e.is_fatal() => Err(e.into()),
            Err(e) => {
                warn!(sql_id = %statement.sql_id, error = %e, "bind lookup failed");
                Ok(Vec::new())
            }
        }
    }
}
