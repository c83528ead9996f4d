use async_trait::async_trait;

use obreplay_app::ports::{ExecutionError, ExecutionService};
use obreplay_domain::connection::TargetProfile;
use obreplay_domain::{BindParams, ExecutionOutcome};

use super::process::{ProcessOutput, run_with_input};
use crate::utils::render_binds;

/// Target engine reached through the `obclient` CLI. SQL goes in on stdin.
pub struct ObClientAdapter {
    profile: TargetProfile,
}

impl ObClientAdapter {
    pub fn new(profile: TargetProfile) -> Self {
        Self { profile }
    }

    fn args(&self, password: &str) -> Vec<String> {
        let mut args = vec![
            "-h".to_string(),
            self.profile.host.clone(),
            "-P".to_string(),
            self.profile.port.to_string(),
            "-u".to_string(),
            self.profile.login(),
            format!("-p{}", password),
            format!("--connect-timeout={}", self.profile.connect_timeout),
            "-A".to_string(),
            "-s".to_string(),
        ];
        if let Some(database) = &self.profile.database {
            args.push("-D".to_string());
            args.push(database.clone());
        }
        args
    }

    /// Command line with the password masked, for logs.
    pub fn display_command(&self) -> String {
        format!("{} {}", self.profile.obclient_path, self.args("****").join(" "))
    }

    async fn run(&self, statement: &str) -> Result<ProcessOutput, ExecutionError> {
        run_with_input(
            &self.profile.obclient_path,
            &self.args(&self.profile.password),
            statement,
            self.profile.timeout_secs,
            &self.display_command(),
        )
        .await
    }
}

/// Batch-mode output: tab separated, first line is the header.
fn parse_rows(stdout: &str) -> Result<Vec<Vec<String>>, csv::Error> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .flexible(true)
        .has_headers(true)
        .from_reader(stdout.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(|s| s.to_string()).collect());
    }
    Ok(rows)
}

#[async_trait]
impl ExecutionService for ObClientAdapter {
    async fn execute(
        &self,
        statement: &str,
        params: &BindParams,
        want_rows: bool,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        let output = self.run(&render_binds(statement, params)).await?;
        let elapsed_ms = output.elapsed_ms;

        if !output.status.success() {
            return Ok(ExecutionOutcome::failure(
                statement,
                output.error_text(),
                elapsed_ms,
            ));
        }
        if !want_rows {
            return Ok(ExecutionOutcome::success(statement, elapsed_ms));
        }
        match parse_rows(&output.stdout) {
            Ok(rows) => Ok(ExecutionOutcome::success(statement, elapsed_ms).with_rows(rows)),
            Err(e) => Ok(ExecutionOutcome::failure(
                statement,
                format!("Unparsable client output: {}", e),
                elapsed_ms,
            )),
        }
    }

    async fn explain(&self, statement: &str) -> Result<ExecutionOutcome, ExecutionError> {
        let output = self.run(&format!("EXPLAIN {}", statement)).await?;

        if output.status.success() {
            Ok(ExecutionOutcome::success(statement, output.elapsed_ms).with_plan(output.stdout))
        } else {
            Ok(ExecutionOutcome::failure(
                statement,
                output.error_text(),
                output.elapsed_ms,
            ))
        }
    }
}
