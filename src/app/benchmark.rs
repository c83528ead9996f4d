use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, warn};

use obreplay_domain::{BenchmarkSummary, BindParams};

use crate::ports::{ExecutionError, ExecutionService};

const UNKNOWN_ERROR: &str = "unknown error";
const P95: f64 = 0.95;

#[derive(Debug, Default)]
struct Samples {
    latencies_ms: Vec<f64>,
    errors: Vec<String>,
}

impl Samples {
    fn record(&mut self, elapsed_ms: f64, error: Option<String>) {
        self.latencies_ms.push(elapsed_ms);
        if let Some(error) = error {
            self.errors.push(error);
        }
    }
}

pub struct PercentileBenchmarker {
    target: Arc<dyn ExecutionService>,
}

impl PercentileBenchmarker {
    pub fn new(target: Arc<dyn ExecutionService>) -> Self {
        Self { target }
    }

    /// Runs `iterations` timed executions, at most `concurrency` in flight.
    ///
    /// With `concurrency <= 1` samples keep submission order; otherwise they
    /// are recorded in completion order.
    pub async fn benchmark(
        &self,
        statement: &str,
        iterations: usize,
        concurrency: usize,
        baseline_ms: Option<f64>,
    ) -> Result<BenchmarkSummary, ExecutionError> {
        let concurrency = concurrency.max(1);
        let samples = Arc::new(Mutex::new(Samples::default()));

        if concurrency == 1 {
            for _ in 0..iterations {
                let (elapsed_ms, error) = timed_execute(self.target.as_ref(), statement).await?;
                lock(&samples).record(elapsed_ms, error);
            }
        } else {
            self.run_concurrent(statement, iterations, concurrency, &samples)
                .await?;
        }

        let Samples {
            latencies_ms,
            errors,
        } = std::mem::take(&mut *lock(&samples));
        let failure_count = errors.len();

        debug!(
            statement,
            iterations, concurrency, failure_count, "benchmark finished"
        );

        Ok(BenchmarkSummary {
            statement: statement.to_string(),
            iteration_count: iterations,
            concurrency,
            average_ms: mean(&latencies_ms),
            p95_ms: percentile(&latencies_ms, P95),
            success_count: iterations - failure_count,
            failure_count,
            sample_latencies_ms: latencies_ms,
            error_texts: errors,
            baseline_ms,
        })
    }

    async fn run_concurrent(
        &self,
        statement: &str,
        iterations: usize,
        concurrency: usize,
        samples: &Arc<Mutex<Samples>>,
    ) -> Result<(), ExecutionError> {
        let permits = Arc::new(Semaphore::new(concurrency));
        // Dropping the set on an early return aborts every remaining repetition
        let mut in_flight = JoinSet::new();

        for _ in 0..iterations {
            let permits = Arc::clone(&permits);
            let target = Arc::clone(&self.target);
            let samples = Arc::clone(samples);
            let statement = statement.to_string();

            in_flight.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| ExecutionError::Spawn(e.to_string()))?;
                let (elapsed_ms, error) = timed_execute(target.as_ref(), &statement).await?;
                lock(&samples).record(elapsed_ms, error);
                Ok::<(), ExecutionError>(())
            });
        }

        while let Some(joined) = in_flight.join_next().await {
            joined.map_err(|e| ExecutionError::Spawn(e.to_string()))??;
        }
        Ok(())
    }
}

/// Times one call. Engine-reported failures, timeouts and I/O errors still
/// produce a sample; only a client that cannot start is returned as an error.
async fn timed_execute(
    target: &dyn ExecutionService,
    statement: &str,
) -> Result<(f64, Option<String>), ExecutionError> {
    let started = Instant::now();
    let result = target.execute(statement, &BindParams::new(), false).await;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            warn!(statement, error = %e, "execution failed before the engine answered");
            return Ok((elapsed_ms, Some(e.to_string())));
        }
    };

    let error = (!outcome.succeeded).then(|| {
        outcome
            .error_text
            .unwrap_or_else(|| UNKNOWN_ERROR.to_string())
    });
    Ok((elapsed_ms, error))
}

fn lock(samples: &Mutex<Samples>) -> std::sync::MutexGuard<'_, Samples> {
    samples.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Linear interpolation between closest ranks; `0.0` for no samples.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let k = (sorted.len() - 1) as f64 * p;
    let lower = k.floor() as usize;
    let upper = k.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    sorted[lower] * (upper as f64 - k) + sorted[upper] * (k - lower as f64)
}
