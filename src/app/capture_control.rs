//! DB Replay workload capture control on the source engine.
//!
//! The DIRECTORY object must already exist and be granted to the connecting
//! user.

use tracing::info;

use obreplay_domain::connection::CaptureName;
use obreplay_domain::{BindParams, ExecutionOutcome};

use crate::ports::{ExecutionError, ExecutionService};

const START_CAPTURE: &str =
    "BEGIN DBMS_WORKLOAD_CAPTURE.START_CAPTURE(name => :name, dir => :dir); END;";
const FINISH_CAPTURE: &str = "BEGIN DBMS_WORKLOAD_CAPTURE.FINISH_CAPTURE; END;";
const EXPORT_CAPTURE: &str =
    "BEGIN DBMS_WORKLOAD_CAPTURE.EXPORT_CAPTURE(dir => :dir, filename => :filename); END;";

pub async fn start_capture(
    source: &dyn ExecutionService,
    directory: &str,
    name: &CaptureName,
) -> Result<ExecutionOutcome, ExecutionError> {
    info!(directory, name = %name, "starting workload capture");
    let params = BindParams::new()
        .with("name", name.as_str())
        .with("dir", directory);
    source.execute(START_CAPTURE, &params, false).await
}

pub async fn finish_capture(
    source: &dyn ExecutionService,
) -> Result<ExecutionOutcome, ExecutionError> {
    info!("finishing workload capture");
    source.execute(FINISH_CAPTURE, &BindParams::new(), false).await
}

/// Writes the capture to `filename` inside `directory`, e.g. `capture01.dmp`.
pub async fn export_capture(
    source: &dyn ExecutionService,
    directory: &str,
    filename: &str,
) -> Result<ExecutionOutcome, ExecutionError> {
    info!(directory, filename, "exporting workload capture");
    let params = BindParams::new()
        .with("dir", directory)
        .with("filename", filename);
    source.execute(EXPORT_CAPTURE, &params, false).await
}
