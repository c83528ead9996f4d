use obreplay_domain::CapturedStatementRecord;

/// Durable, append-only destination for captured statements.
pub trait CaptureSink: Send {
    /// Must not return before the record is flushed.
    fn append(&mut self, record: &CapturedStatementRecord) -> std::io::Result<()>;
}
