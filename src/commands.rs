use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::{Result, WrapErr};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use obreplay_app::ports::{ActivityCatalog, ExecutionService};
use obreplay_app::{
    CaptureOptions, CaptureStreamer, CompatibilityClassifier, PercentileBenchmarker,
    ReplayOptions, ReplayOrchestrator, StatementFilter, capture_control, report,
};
use obreplay_domain::connection::CaptureName;
use obreplay_domain::{ReplayMode, StatementSource, ToolConfig};
use obreplay_infra::adapters::{
    JsonlCaptureWriter, ObClientAdapter, OmaCli, OmaRequest, OracleCatalog, SqlPlusAdapter,
};

use crate::cli::{
    BenchmarkArgs, CaptureArgs, CompatArgs, DbReplayAction, DbReplayArgs, OmaArgs, OutputFormat,
    ReplayArgs, SourceType, SqlInput,
};

/// Engine connections shared by every subcommand.
pub struct Services {
    pub target: Arc<dyn ExecutionService>,
    pub source: Arc<dyn ExecutionService>,
    pub catalog: Arc<dyn ActivityCatalog>,
}

impl Services {
    pub fn from_config(config: &ToolConfig) -> Self {
        let source: Arc<dyn ExecutionService> =
            Arc::new(SqlPlusAdapter::new(config.source.clone()));
        Self {
            target: Arc::new(ObClientAdapter::new(config.target.clone())),
            catalog: Arc::new(OracleCatalog::new(Arc::clone(&source))),
            source,
        }
    }
}

async fn read_sql(input: &SqlInput) -> Result<String> {
    match (&input.sql, &input.sql_file) {
        (Some(sql), _) => Ok(sql.trim().to_string()),
        (None, Some(path)) => {
            let content = tokio::fs::read_to_string(path)
                .await
                .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
            Ok(content.trim().to_string())
        }
        (None, None) => Err(color_eyre::eyre::eyre!("Provide --sql or --sql-file")),
    }
}

/// Exit code 1 when the statement is unsupported.
pub async fn compat(services: &Services, args: &CompatArgs, out: &mut dyn Write) -> Result<u8> {
    let sql = read_sql(&args.input).await?;
    let verdict = CompatibilityClassifier::new(Arc::clone(&services.target))
        .classify(&sql, args.execute)
        .await?;

    writeln!(out, "{}", report::format_compatibility(&verdict))?;
    Ok(u8::from(!verdict.supported))
}

/// Exit code 1 when any execution failed. A missing baseline only warns.
pub async fn benchmark(
    services: &Services,
    args: &BenchmarkArgs,
    out: &mut dyn Write,
) -> Result<u8> {
    let sql = read_sql(&args.input).await?;

    let baseline_ms = match &args.oracle_sql_id {
        Some(sql_id) => match services.catalog.fetch_baseline_ms(sql_id).await {
            Ok(baseline) => baseline,
            Err(e) => {
                warn!(sql_id = %sql_id, error = %e, "unable to fetch source baseline");
                None
            }
        },
        None => None,
    };

    let summary = PercentileBenchmarker::new(Arc::clone(&services.target))
        .benchmark(&sql, args.iterations, args.concurrency, baseline_ms)
        .await?;

    writeln!(out, "{}", report::format_benchmark(&summary))?;
    Ok(u8::from(summary.failure_count > 0))
}

fn replay_source(args: &ReplayArgs) -> Result<StatementSource> {
    let path = || {
        args.source_path
            .clone()
            .ok_or_else(|| color_eyre::eyre::eyre!("--source-path is required for this source type"))
    };
    Ok(match args.source_type {
        SourceType::Dbreplay => StatementSource::CaptureDir {
            path: path()?,
            extra_args: args.oma_args.clone(),
        },
        SourceType::Jsonl => StatementSource::CaptureLog(path()?),
        SourceType::Lines => StatementSource::SqlFile(path()?),
        SourceType::Online => StatementSource::Online {
            limit: args.limit,
            schemas: args.schemas.clone(),
            modules: args.modules.clone(),
            store_file: args.store_file.clone(),
        },
    })
}

pub async fn replay(
    services: &Services,
    config: &ToolConfig,
    args: &ReplayArgs,
    out: &mut dyn Write,
) -> Result<u8> {
    let source = replay_source(args)?;

    let mut orchestrator = ReplayOrchestrator::new(Arc::clone(&services.target))
        .with_catalog(Arc::clone(&services.catalog));
    let tool_program = args.oma_cli.clone().or_else(|| config.oma.start_script.clone());
    if let Some(program) = tool_program {
        orchestrator =
            orchestrator.with_analysis_tool(Arc::new(OmaCli::new(&config.oma).with_program(program)));
    }

    let mode: ReplayMode = args.mode.into();
    let options = ReplayOptions {
        mode,
        iterations: args.iterations,
        concurrency: args.concurrency,
    };
    let result = orchestrator.run(&source, options).await?;

    match args.format {
        OutputFormat::Text => writeln!(out, "{}", report::format_replay(&result, mode))?,
        OutputFormat::Json => writeln!(out, "{}", report::to_json(&result)?)?,
    }
    Ok(0)
}

/// CLI schemas, plus the config's when asked. Empty means capture everything.
pub fn capture_schemas(args: &CaptureArgs, config: &ToolConfig) -> Vec<String> {
    let mut schemas = args.schemas.clone();
    if args.respect_config_schemas {
        schemas.extend(config.capture_schemas.iter().cloned());
    }
    schemas
}

pub async fn capture(
    services: &Services,
    config: &ToolConfig,
    args: &CaptureArgs,
    cancel: &CancellationToken,
    out: &mut dyn Write,
) -> Result<u8> {
    let schemas = capture_schemas(args, config);
    let options = CaptureOptions {
        duration: Duration::from_secs(args.duration_seconds),
        poll_interval: Duration::from_secs(args.interval_seconds),
        limit_per_poll: args.limit_per_interval,
        include_binds: !args.no_binds,
        dedup: args.dedup,
        filter: StatementFilter::new(&schemas, &args.modules, schemas.is_empty()),
    };

    let mut sink = JsonlCaptureWriter::open(&args.output)
        .wrap_err_with(|| format!("Failed to open {}", args.output.display()))?;
    let written = CaptureStreamer::new(Arc::clone(&services.catalog))
        .stream(&mut sink, &options, cancel)
        .await?;

    writeln!(
        out,
        "Capture finished: {} statements written to {}",
        written,
        args.output.display()
    )?;
    Ok(0)
}

pub async fn dbreplay(services: &Services, args: &DbReplayArgs, out: &mut dyn Write) -> Result<u8> {
    let source = services.source.as_ref();
    let dir = args.dir.as_deref().unwrap_or_default();

    let (action, outcome) = match args.action {
        DbReplayAction::Start => {
            let name = CaptureName::new(args.name.clone().unwrap_or_default())?;
            ("start", capture_control::start_capture(source, dir, &name).await?)
        }
        DbReplayAction::Finish => ("finish", capture_control::finish_capture(source).await?),
        DbReplayAction::Export => {
            let filename = args.filename.as_deref().unwrap_or_default();
            ("export", capture_control::export_capture(source, dir, filename).await?)
        }
    };

    if outcome.succeeded {
        writeln!(out, "DB Replay {} succeeded in {:.2} ms", action, outcome.elapsed_ms)?;
        Ok(0)
    } else {
        writeln!(
            out,
            "DB Replay {} failed: {}",
            action,
            outcome.error_text.as_deref().unwrap_or("unknown error")
        )?;
        Ok(1)
    }
}

/// Exit code is the tool's own.
pub async fn oma(config: &ToolConfig, args: &OmaArgs, out: &mut dyn Write) -> Result<u8> {
    let request = OmaRequest {
        mode: args.mode.into(),
        from_type: args.from_type.into(),
        source_file: args.source_file.clone(),
        schemas: args.schemas.clone(),
        replay_mode: args.replay_mode.clone(),
        evaluate_mode: args.evaluate_mode.clone(),
        performance_mode: args.performance_mode,
        max_parallel: args.max_parallel,
        replay_scale: args.replay_scale,
        report_root: args.report_root.clone(),
        extra_args: args.extra_args.clone(),
    };
    let tool = OmaCli::new(&config.oma);
    for warning in tool.warnings(&request) {
        writeln!(out, "Warning: {}", warning)?;
    }
    let output = tool.assess(&request, config).await?;

    writeln!(out, "Command: {}", output.command_line)?;
    if !output.stdout.is_empty() {
        writeln!(out, "STDOUT:\n{}", output.stdout)?;
    }
    if !output.stderr.is_empty() {
        writeln!(out, "STDERR:\n{}", output.stderr)?;
    }
    Ok(output
        .exit_code
        .and_then(|code| u8::try_from(code).ok())
        .unwrap_or(1))
}
