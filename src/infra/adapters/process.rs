use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use obreplay_app::ports::ExecutionError;

#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub elapsed_ms: f64,
}

impl ProcessOutput {
    /// stderr when the client wrote any, otherwise stdout.
    pub fn error_text(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Runs `program` with `input` on stdin and collects both output streams.
///
/// `display` is what gets logged in place of the real arguments, so callers
/// can keep passwords out of the log.
pub async fn run_with_input(
    program: &str,
    args: &[String],
    input: &str,
    timeout_secs: u64,
    display: &str,
) -> Result<ProcessOutput, ExecutionError> {
    let command = display;
    debug!(command, "spawning client");
    let start = Instant::now();

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ExecutionError::CommandNotFound(format!("{}: {}", program, e)))?;

    let mut stdin_handle = child.stdin.take();
    let mut stdout_handle = child.stdout.take();
    let mut stderr_handle = child.stderr.take();

    // Feed stdin and drain both pipes together; waiting first can deadlock on full buffers
    let result = timeout(Duration::from_secs(timeout_secs), async {
        let (write_result, stdout_result, stderr_result) = tokio::join!(
            async {
                if let Some(mut stdin) = stdin_handle.take() {
                    stdin.write_all(input.as_bytes()).await?;
                    stdin.shutdown().await?;
                }
                Ok::<_, std::io::Error>(())
            },
            async {
                let mut buf = Vec::new();
                if let Some(ref mut out) = stdout_handle {
                    out.read_to_end(&mut buf).await?;
                }
                Ok::<_, std::io::Error>(String::from_utf8_lossy(&buf).into_owned())
            },
            async {
                let mut buf = Vec::new();
                if let Some(ref mut err) = stderr_handle {
                    err.read_to_end(&mut buf).await?;
                }
                Ok::<_, std::io::Error>(String::from_utf8_lossy(&buf).into_owned())
            }
        );

        // A client that exits before reading all input closes the pipe; its
        // exit status is what matters
        match write_result {
            Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => return Err(e),
            _ => {}
        }
        let stdout = stdout_result?;
        let stderr = stderr_result?;
        let status = child.wait().await?;

        Ok::<_, std::io::Error>((status, stdout, stderr))
    })
    .await
    .map_err(|_| ExecutionError::Timeout { secs: timeout_secs })?
    .map_err(|e| ExecutionError::Io(e.to_string()))?;

    let (status, stdout, stderr) = result;
    Ok(ProcessOutput {
        status,
        stdout,
        stderr,
        elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
    })
}
