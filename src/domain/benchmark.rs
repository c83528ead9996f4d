use serde::Serialize;

/// Aggregated timings for repeated executions of one statement.
///
/// Every attempt contributes a latency sample, so
/// `sample_latencies_ms.len() == iteration_count` and
/// `success_count + failure_count == iteration_count`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkSummary {
    pub statement: String,
    pub iteration_count: usize,
    pub concurrency: usize,
    pub average_ms: f64,
    pub p95_ms: f64,
    pub success_count: usize,
    pub failure_count: usize,
    pub sample_latencies_ms: Vec<f64>,
    pub error_texts: Vec<String>,
    /// Source-engine average for the same statement, when known
    pub baseline_ms: Option<f64>,
}

impl BenchmarkSummary {
    /// Positive when the target is slower than the baseline.
    pub fn baseline_delta_ms(&self) -> Option<f64> {
        self.baseline_ms.map(|baseline| self.average_ms - baseline)
    }
}
