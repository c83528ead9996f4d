//! Statement loaders for file-backed replay sources.
//!
//! Reads are lenient: a missing or unreadable file yields no statements, and
//! lines that are not UTF-8 or, in a capture log, do not parse are skipped.

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Deserialize)]
struct CaptureLogLine {
    sql_text: Option<String>,
}

async fn read_lenient(path: &Path) -> Option<Vec<u8>> {
    match tokio::fs::read(path).await {
        Ok(content) => Some(content),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "statement file unreadable");
            None
        }
    }
}

/// Trimmed, non-blank lines with their 1-based numbers.
fn decoded_lines(content: &[u8]) -> Vec<(usize, &str)> {
    content
        .split(|b| *b == b'\n')
        .enumerate()
        .filter_map(|(idx, raw)| match std::str::from_utf8(raw) {
            Ok(line) => Some((idx + 1, line.trim())),
            Err(e) => {
                debug!(line = idx + 1, error = %e, "skipping line that is not UTF-8");
                None
            }
        })
        .filter(|(_, line)| !line.is_empty())
        .collect()
}

/// One statement per line, trimmed, blank lines dropped.
pub async fn read_sql_lines(path: &Path) -> Vec<String> {
    let Some(content) = read_lenient(path).await else {
        return Vec::new();
    };
    decoded_lines(&content)
        .into_iter()
        .map(|(_, line)| line.to_string())
        .collect()
}

/// `sql_text` of every well-formed capture-log line.
pub async fn read_capture_log(path: &Path) -> Vec<String> {
    let Some(content) = read_lenient(path).await else {
        return Vec::new();
    };

    let mut statements = Vec::new();
    for (number, line) in decoded_lines(&content) {
        match serde_json::from_str::<CaptureLogLine>(line) {
            Ok(CaptureLogLine {
                sql_text: Some(text),
            }) => {
                let text = text.trim();
                if !text.is_empty() {
                    statements.push(text.to_string());
                }
            }
            Ok(_) => {}
            Err(e) => debug!(line = number, error = %e, "skipping malformed capture record"),
        }
    }
    statements
}

/// Overwrites `path` with one statement per line.
pub async fn write_sql_lines(path: &Path, statements: &[String]) -> std::io::Result<()> {
    let mut content = String::new();
    for statement in statements {
        content.push_str(statement);
        content.push('\n');
    }
    tokio::fs::write(path, content).await
}
