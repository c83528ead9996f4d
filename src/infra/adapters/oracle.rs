use async_trait::async_trait;

use obreplay_app::ports::{ExecutionError, ExecutionService};
use obreplay_domain::connection::SourceProfile;
use obreplay_domain::{BindParams, ExecutionOutcome};

use super::process::{ProcessOutput, run_with_input};
use crate::utils::render_binds;

const SESSION_SETTINGS: &str = "SET MARKUP CSV ON QUOTE ON
SET HEADING OFF
SET FEEDBACK OFF
SET PAGESIZE 0
SET LONG 1000000
SET LINESIZE 32767
SET TRIMSPOOL ON
WHENEVER SQLERROR EXIT FAILURE
";

const PLAN_QUERY: &str = "SELECT plan_table_output FROM TABLE(DBMS_XPLAN.DISPLAY())";

/// Source engine reached through `sqlplus`, with results read back as CSV.
pub struct SqlPlusAdapter {
    profile: SourceProfile,
}

impl SqlPlusAdapter {
    pub fn new(profile: SourceProfile) -> Self {
        Self { profile }
    }

    pub fn display_command(&self) -> String {
        format!(
            "{} -S -L {}",
            self.profile.sqlplus_path,
            self.profile.masked_connect_string()
        )
    }

    /// Full script for one or more statements, each run as its own buffer.
    fn script(&self, statements: &[&str]) -> String {
        let mut script = String::from(SESSION_SETTINGS);
        if let Some(schema) = &self.profile.schema {
            script.push_str(&format!("ALTER SESSION SET CURRENT_SCHEMA = {}\n/\n", schema));
        }
        for statement in statements {
            script.push_str(buffer(statement));
            script.push_str("\n/\n");
        }
        script.push_str("EXIT\n");
        script
    }

    async fn run(&self, statements: &[&str]) -> Result<ProcessOutput, ExecutionError> {
        let args = vec![
            "-S".to_string(),
            "-L".to_string(),
            self.profile.connect_string(),
        ];
        run_with_input(
            &self.profile.sqlplus_path,
            &args,
            &self.script(statements),
            self.profile.timeout_secs,
            &self.display_command(),
        )
        .await
    }
}

/// PL/SQL blocks keep their terminating semicolon; plain SQL must not have one
/// since the buffer is run with `/`.
fn buffer(statement: &str) -> &str {
    let trimmed = statement.trim();
    let upper = trimmed.get(..7).unwrap_or(trimmed).to_ascii_uppercase();
    if upper.starts_with("BEGIN") || upper.starts_with("DECLARE") {
        trimmed
    } else {
        trimmed.trim_end_matches(';').trim_end()
    }
}

/// SP2- lines are client-side errors that do not set the exit status.
fn client_error(stdout: &str) -> Option<String> {
    let lines: Vec<&str> = stdout
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("SP2-"))
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

fn failure_text(output: &ProcessOutput) -> Option<String> {
    if !output.status.success() {
        return Some(output.error_text());
    }
    client_error(&output.stdout)
}

/// `SET MARKUP CSV ON QUOTE ON` output without a heading line.
pub(crate) fn parse_csv_rows(stdout: &str) -> Result<Vec<Vec<String>>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(stdout.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.len() == 1 && record.get(0).is_some_and(str::is_empty) {
            continue;
        }
        rows.push(record.iter().map(|s| s.to_string()).collect());
    }
    Ok(rows)
}

#[async_trait]
impl ExecutionService for SqlPlusAdapter {
    async fn execute(
        &self,
        statement: &str,
        params: &BindParams,
        want_rows: bool,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        let rendered = render_binds(statement, params);
        let output = self.run(&[&rendered]).await?;

        if let Some(error) = failure_text(&output) {
            return Ok(ExecutionOutcome::failure(statement, error, output.elapsed_ms));
        }
        if !want_rows {
            return Ok(ExecutionOutcome::success(statement, output.elapsed_ms));
        }
        match parse_csv_rows(&output.stdout) {
            Ok(rows) => Ok(ExecutionOutcome::success(statement, output.elapsed_ms).with_rows(rows)),
            Err(e) => Ok(ExecutionOutcome::failure(
                statement,
                format!("Unparsable client output: {}", e),
                output.elapsed_ms,
            )),
        }
    }

    async fn explain(&self, statement: &str) -> Result<ExecutionOutcome, ExecutionError> {
        let explain = format!("EXPLAIN PLAN FOR {}", buffer(statement));
        let output = self.run(&[&explain, PLAN_QUERY]).await?;

        if let Some(error) = failure_text(&output) {
            return Ok(ExecutionOutcome::failure(statement, error, output.elapsed_ms));
        }
        let plan = match parse_csv_rows(&output.stdout) {
            Ok(rows) => rows
                .into_iter()
                .filter_map(|row| row.into_iter().next())
                .collect::<Vec<_>>()
                .join("\n"),
            Err(_) => output.stdout.clone(),
        };
        Ok(ExecutionOutcome::success(statement, output.elapsed_ms).with_plan(plan))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn profile() -> SourceProfile {
        SourceProfile::new("db-host:1521/ORCL", "scott", "tiger")
    }

    mod buffer {
        use super::*;

        #[rstest]
        #[case("SELECT 1 FROM dual;", "SELECT 1 FROM dual")]
        #[case("  SELECT 1 FROM dual ;  ", "SELECT 1 FROM dual")]
        #[case("begin null; end;", "begin null; end;")]
        #[case("DECLARE x NUMBER; BEGIN x := 1; END;", "DECLARE x NUMBER; BEGIN x := 1; END;")]
        #[case("", "")]
        fn strips_sql_terminator_only(#[case] input: &str, #[case] expected: &str) {
            assert_eq!(buffer(input), expected);
        }
    }

    mod script {
        use super::*;

        #[test]
        fn sets_schema_and_terminates_each_buffer() {
            let mut profile = profile();
            profile.schema = Some("APP".to_string());
            let adapter = SqlPlusAdapter::new(profile);

            let script = adapter.script(&["SELECT 1 FROM dual;"]);

            assert!(script.starts_with("SET MARKUP CSV ON QUOTE ON\n"));
            assert!(script.contains("WHENEVER SQLERROR EXIT FAILURE\n"));
            assert!(script.ends_with(
                "ALTER SESSION SET CURRENT_SCHEMA = APP\n/\nSELECT 1 FROM dual\n/\nEXIT\n"
            ));
        }

        #[test]
        fn display_command_masks_password() {
            let adapter = SqlPlusAdapter::new(profile());

            assert_eq!(adapter.display_command(), "sqlplus -S -L scott/****@db-host:1521/ORCL");
        }
    }

    mod parse_csv_rows {
        use super::*;

        #[test]
        fn unquotes_fields_and_skips_blank_lines() {
            let stdout = "\n\"9babjv8yq8ru3\",0,\"SELECT \"\"x\"\", y FROM t\"\n\"abc\",1,\n";

            let rows = parse_csv_rows(stdout).unwrap();

            assert_eq!(
                rows,
                vec![
                    vec!["9babjv8yq8ru3", "0", "SELECT \"x\", y FROM t"],
                    vec!["abc", "1", ""],
                ]
            );
        }
    }

    mod client_error {
        use super::*;

        #[test]
        fn collects_sp2_lines() {
            let stdout = "SP2-0042: unknown command \"FOO\" - rest of line ignored.\nok\n";

            assert_eq!(
                client_error(stdout).as_deref(),
                Some("SP2-0042: unknown command \"FOO\" - rest of line ignored.")
            );
        }

        #[test]
        fn none_for_clean_output() {
            assert!(client_error("\"1\"\n").is_none());
        }
    }

    #[cfg(unix)]
    mod with_fake_client {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        const FAKE_SQLPLUS: &str = r#"#!/bin/sh
input=$(cat)
case "$input" in
  *missing_table*) echo "ORA-00942: table or view does not exist"; exit 1 ;;
  *DBMS_XPLAN*) printf '"Plan hash value: 1388734953"\n"| 0 | SELECT STATEMENT |"\n' ;;
  *) printf '"2024-05-01T12:00:00"\n' ;;
esac
"#;

        fn adapter(dir: &TempDir) -> SqlPlusAdapter {
            let path = dir.path().join("sqlplus");
            std::fs::write(&path, FAKE_SQLPLUS).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            let mut profile = profile();
            profile.sqlplus_path = path.to_string_lossy().into_owned();
            SqlPlusAdapter::new(profile)
        }

        #[tokio::test]
        async fn execute_parses_rows() {
            let dir = TempDir::new().unwrap();

            let outcome = adapter(&dir)
                .execute("SELECT SYSDATE FROM dual", &BindParams::new(), true)
                .await
                .unwrap();

            assert!(outcome.succeeded);
            assert_eq!(outcome.rows_or_empty(), &[vec!["2024-05-01T12:00:00".to_string()]]);
        }

        #[tokio::test]
        async fn sql_error_exit_becomes_failed_outcome() {
            let dir = TempDir::new().unwrap();

            let outcome = adapter(&dir)
                .execute("SELECT * FROM missing_table", &BindParams::new(), true)
                .await
                .unwrap();

            assert!(!outcome.succeeded);
            assert_eq!(
                outcome.error_text.as_deref(),
                Some("ORA-00942: table or view does not exist")
            );
        }

        #[tokio::test]
        async fn explain_joins_plan_lines() {
            let dir = TempDir::new().unwrap();

            let outcome = adapter(&dir).explain("SELECT 1 FROM dual").await.unwrap();

            assert!(outcome.succeeded);
            assert_eq!(
                outcome.plan_text.as_deref(),
                Some("Plan hash value: 1388734953\n| 0 | SELECT STATEMENT |")
            );
        }
    }
}
