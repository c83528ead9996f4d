use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use obreplay_app::ports::{AnalysisTool, ToolError, ToolOutput};
use obreplay_domain::{OmaSettings, ToolConfig};

const MASK: &str = "****";
const SECRET_FLAGS: &[&str] = &["--target-db-password", "--source-db-password"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OmaMode {
    Analyze,
    Replay,
}

impl fmt::Display for OmaMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OmaMode::Analyze => write!(f, "ANALYZE"),
            OmaMode::Replay => write!(f, "REPLAY"),
        }
    }
}

/// Where the assessment tool reads its workload from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OmaSourceType {
    DbReplay,
    Text,
    /// Connects to the source engine itself
    Db,
}

impl fmt::Display for OmaSourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OmaSourceType::DbReplay => write!(f, "DB_REPLAY"),
            OmaSourceType::Text => write!(f, "TEXT"),
            OmaSourceType::Db => write!(f, "DB"),
        }
    }
}

/// One assessment run. Connection details come from the loaded config.
#[derive(Debug, Clone, PartialEq)]
pub struct OmaRequest {
    pub mode: OmaMode,
    pub from_type: OmaSourceType,
    pub source_file: Option<String>,
    /// Comma-separated, passed through as given
    pub schemas: Option<String>,
    pub replay_mode: Option<String>,
    pub evaluate_mode: Option<String>,
    pub performance_mode: bool,
    pub max_parallel: Option<u32>,
    pub replay_scale: Option<f64>,
    pub report_root: Option<PathBuf>,
    pub extra_args: Vec<String>,
}

impl OmaRequest {
    pub fn new(mode: OmaMode, from_type: OmaSourceType) -> Self {
        Self {
            mode,
            from_type,
            source_file: None,
            schemas: None,
            replay_mode: None,
            evaluate_mode: None,
            performance_mode: false,
            max_parallel: None,
            replay_scale: None,
            report_root: None,
            extra_args: Vec::new(),
        }
    }
}

/// Wrapper around the assessment tool's start script.
pub struct OmaCli {
    program: Option<PathBuf>,
    report_root: Option<PathBuf>,
}

impl OmaCli {
    pub fn new(settings: &OmaSettings) -> Self {
        Self {
            program: settings.start_script.clone(),
            report_root: settings.report_root.clone(),
        }
    }

    /// Overrides the configured start script.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = Some(program.into());
        self
    }

    /// Arguments for a full assessment, program excluded.
    pub fn assess_args(&self, request: &OmaRequest, config: &ToolConfig) -> Vec<String> {
        let mut args = vec![
            "--mode".to_string(),
            request.mode.to_string(),
            "--from-type".to_string(),
            request.from_type.to_string(),
            "--ob-mode".to_string(),
            config.target.mode.as_tool_flag().to_string(),
        ];
        let mut push = |flag: &str, value: String| {
            args.push(flag.to_string());
            args.push(value);
        };

        if let Some(schemas) = &request.schemas {
            push("--schemas", schemas.clone());
        }
        if let Some(source_file) = &request.source_file {
            push("--source-file", source_file.clone());
        }
        if let Some(replay_mode) = &request.replay_mode {
            push("--replay-mode", replay_mode.clone());
        }
        if let Some(evaluate_mode) = &request.evaluate_mode {
            push("--evaluate-mode", evaluate_mode.clone());
        }
        push("--performance-mode", request.performance_mode.to_string());
        if let Some(max_parallel) = request.max_parallel {
            push("--max-parallel", max_parallel.to_string());
        }
        if let Some(scale) = request.replay_scale {
            push("--replay-scale", format!("{:?}", scale));
        }
        if let Some(root) = request.report_root.as_ref().or(self.report_root.as_ref()) {
            push("--report-root-path", root.to_string_lossy().into_owned());
        }

        let target = &config.target;
        push("--target-db-host", target.host.clone());
        push("--target-db-port", target.port.to_string());
        push("--target-db-user", target.login());
        push("--target-db-password", target.password.clone());

        if request.from_type == OmaSourceType::Db {
            let source = &config.source;
            let endpoint = source.endpoint();
            push("--source-db-type", "ORACLE".to_string());
            push("--source-db-host", endpoint.host);
            push("--source-db-port", endpoint.port.to_string());
            push("--source-db-service-name", endpoint.service);
            push("--source-db-user", source.user.clone());
            push("--source-db-password", source.password.clone());
        }

        args.extend(request.extra_args.iter().cloned());
        args
    }

    pub fn warnings(&self, request: &OmaRequest) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.program.is_none() {
            warnings.push(
                "Assessment tool start script is not set; check [oma].start_script or OMA_START_SCRIPT"
                    .to_string(),
            );
        }
        if request.report_root.is_none() && self.report_root.is_none() {
            warnings.push(
                "Report root is not set; the tool will use its default directory, make sure it is writable"
                    .to_string(),
            );
        }
        warnings
    }

    pub async fn assess(
        &self,
        request: &OmaRequest,
        config: &ToolConfig,
    ) -> Result<ToolOutput, ToolError> {
        self.run(self.assess_args(request, config)).await
    }

    async fn run(&self, args: Vec<String>) -> Result<ToolOutput, ToolError> {
        let program = self.program.as_ref().ok_or(ToolError::NotConfigured)?;
        let command_line = masked_command_line(program, &args);
        info!(command = %command_line, "running assessment tool");

        let output = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                    ToolError::CommandNotFound(format!("{}: {}", program.display(), e))
                }
                _ => ToolError::Io(e.to_string()),
            })?;

        debug!(exit_code = ?output.status.code(), "assessment tool finished");
        Ok(ToolOutput {
            command_line,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        })
    }
}

#[async_trait]
impl AnalysisTool for OmaCli {
    async fn analyze(
        &self,
        capture_dir: &Path,
        extra_args: &[String],
    ) -> Result<ToolOutput, ToolError> {
        let mut args = vec![
            "analyze".to_string(),
            "--input".to_string(),
            capture_dir.to_string_lossy().into_owned(),
        ];
        args.extend(extra_args.iter().cloned());
        self.run(args).await
    }
}

fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_@%+=:,./-".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

/// Shell-style rendering with the value after each password flag masked.
fn masked_command_line(program: &Path, args: &[String]) -> String {
    let mut parts = vec![shell_quote(&program.to_string_lossy())];
    let mut mask_next = false;
    for arg in args {
        if mask_next {
            parts.push(MASK.to_string());
            mask_next = false;
        } else {
            parts.push(shell_quote(arg));
            mask_next = SECRET_FLAGS.contains(&arg.as_str());
        }
    }
    parts.join(" ")
}
