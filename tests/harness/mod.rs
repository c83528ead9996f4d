use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use clap::Parser;

use obreplay::app::test_support::{ScriptedCatalog, ScriptedExecutionService};
use obreplay::cli::{Cli, Command};
use obreplay::commands::Services;
use obreplay::domain::connection::{SourceProfile, TargetProfile};
use obreplay::domain::{ActiveStatement, OmaSettings, ToolConfig};

pub struct Fakes {
    pub target: Arc<ScriptedExecutionService>,
    pub source: Arc<ScriptedExecutionService>,
    pub catalog: Arc<ScriptedCatalog>,
}

impl Fakes {
    pub fn new(target: ScriptedExecutionService, catalog: ScriptedCatalog) -> Self {
        Self {
            target: Arc::new(target),
            source: Arc::new(ScriptedExecutionService::new()),
            catalog: Arc::new(catalog),
        }
    }

    pub fn with_source(mut self, source: ScriptedExecutionService) -> Self {
        self.source = Arc::new(source);
        self
    }

    pub fn services(&self) -> Services {
        Services {
            target: self.target.clone(),
            source: self.source.clone(),
            catalog: self.catalog.clone(),
        }
    }
}

pub fn test_config() -> ToolConfig {
    ToolConfig {
        source: SourceProfile::new("db-host:1521/ORCL", "scott", "tiger"),
        target: TargetProfile::new("ob-host", 2881, "ora_t1", "app", "s3cret"),
        capture_schemas: vec!["HR".to_string()],
        oma: OmaSettings::default(),
    }
}

pub fn parse(args: &[&str]) -> Command {
    Cli::try_parse_from(std::iter::once("obreplay").chain(args.iter().copied()))
        .unwrap()
        .command
}

pub fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

pub fn active(sql_id: &str, schema: &str, last_active: NaiveDateTime) -> ActiveStatement {
    ActiveStatement {
        sql_id: sql_id.to_string(),
        child_number: 0,
        schema: Some(schema.to_string()),
        module: Some("JDBC Thin Client".to_string()),
        last_active,
        sql_text: format!("SELECT * FROM orders WHERE id = :1 /* {} */", sql_id),
        elapsed_time_us: Some(5_000),
        executions: Some(4),
        cpu_time_us: None,
        buffer_gets: None,
        disk_reads: None,
        rows_processed: None,
        fetches: None,
    }
}

pub fn output(buffer: Vec<u8>) -> String {
    String::from_utf8(buffer).unwrap()
}
