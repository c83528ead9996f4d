use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use obreplay_app::ports::CaptureSink;
use obreplay_domain::CapturedStatementRecord;

/// Append-only JSON Lines capture log. Existing content is never rewritten.
pub struct JsonlCaptureWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonlCaptureWriter {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CaptureSink for JsonlCaptureWriter {
    fn append(&mut self, record: &CapturedStatementRecord) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use obreplay_domain::CapturedBind;

    fn record(sql_id: &str, sql_text: &str) -> CapturedStatementRecord {
        CapturedStatementRecord {
            sql_id: sql_id.to_string(),
            child_number: 0,
            schema: Some("APP".to_string()),
            module: None,
            last_active_time: NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            sql_text: sql_text.to_string(),
            binds: vec![CapturedBind {
                position: 1,
                name: Some(":1".to_string()),
                datatype: Some("NUMBER".to_string()),
                value: Some("42".to_string()),
            }],
            executions: Some(4),
            avg_elapsed_ms: Some(1.25),
            elapsed_time_us: Some(5_000),
            cpu_time_us: None,
            buffer_gets: None,
            disk_reads: None,
            rows_processed: None,
            fetches: None,
        }
    }

    mod append {
        use super::*;

        #[test]
        fn each_record_is_one_flushed_line() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("capture.jsonl");
            let mut writer = JsonlCaptureWriter::open(&path).unwrap();

            writer.append(&record("a", "SELECT 1 FROM dual")).unwrap();
            // Visible before the writer is dropped
            let content = std::fs::read_to_string(&path).unwrap();
            writer.append(&record("b", "SELECT\n2 FROM dual")).unwrap();

            assert_eq!(content.lines().count(), 1);
            let content = std::fs::read_to_string(&path).unwrap();
            let lines: Vec<_> = content.lines().collect();
            assert_eq!(lines.len(), 2);
            let second: CapturedStatementRecord = serde_json::from_str(lines[1]).unwrap();
            assert_eq!(second, record("b", "SELECT\n2 FROM dual"));
        }

        #[test]
        fn reopening_appends_after_existing_lines() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("capture.jsonl");
            std::fs::write(&path, "{\"sql_text\":\"earlier\"}\n").unwrap();

            let mut writer = JsonlCaptureWriter::open(&path).unwrap();
            writer.append(&record("a", "SELECT 1 FROM dual")).unwrap();

            let content = std::fs::read_to_string(&path).unwrap();
            assert!(content.starts_with("{\"sql_text\":\"earlier\"}\n{"));
            assert_eq!(content.lines().count(), 2);
        }

        #[test]
        fn open_creates_missing_parent_directories() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("nested").join("capture.jsonl");

            let writer = JsonlCaptureWriter::open(&path).unwrap();

            assert_eq!(writer.path(), path.as_path());
            assert!(path.exists());
        }
    }
}
