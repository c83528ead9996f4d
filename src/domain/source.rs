use std::path::PathBuf;

/// Where a replay gets its statements from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementSource {
    /// DB Replay capture directory; the analysis tool materializes `sqls.txt` inside it
    CaptureDir {
        path: PathBuf,
        extra_args: Vec<String>,
    },
    /// Newline-delimited JSON written by the capture streamer
    CaptureLog(PathBuf),
    /// One statement per line
    SqlFile(PathBuf),
    /// Recently active statements fetched from the source engine
    Online {
        limit: usize,
        schemas: Vec<String>,
        modules: Vec<String>,
        store_file: Option<PathBuf>,
    },
}

impl StatementSource {
    pub fn kind(&self) -> &'static str {
        match self {
            StatementSource::CaptureDir { .. } => "dbreplay",
            StatementSource::CaptureLog(_) => "jsonl",
            StatementSource::SqlFile(_) => "lines",
            StatementSource::Online { .. } => "online",
        }
    }
}
