pub mod benchmark;
pub mod capture;
pub mod capture_control;
pub mod compatibility;
pub mod ports;
pub mod replay;
pub mod report;
pub mod sources;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use benchmark::PercentileBenchmarker;
pub use capture::{CaptureCursor, CaptureError, CaptureOptions, CaptureStreamer, StatementFilter};
pub use compatibility::{CompatibilityClassifier, hint_from_error};
pub use replay::{LoadedStatements, ReplayError, ReplayOptions, ReplayOrchestrator};
