use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use obreplay_domain::ReplayMode;
use obreplay_infra::adapters::{OmaMode, OmaSourceType};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: $OBREPLAY_CONFIG, ./obreplay.toml, then the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug-level logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check one statement against the target with EXPLAIN
    Compat(CompatArgs),
    /// Time repeated executions of one statement on the target
    Benchmark(BenchmarkArgs),
    /// Evaluate a whole workload against the target
    Replay(ReplayArgs),
    /// Poll the source engine and append active statements to a JSONL log
    Capture(CaptureArgs),
    /// Start, finish or export a DB Replay workload capture on the source
    Dbreplay(DbReplayArgs),
    /// Run the external assessment tool
    Oma(OmaArgs),
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct SqlInput {
    /// Statement text
    #[arg(long)]
    pub sql: Option<String>,

    /// Read the statement from a file
    #[arg(long)]
    pub sql_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CompatArgs {
    #[command(flatten)]
    pub input: SqlInput,

    /// Execute the statement after a successful EXPLAIN (read-only statements only)
    #[arg(long)]
    pub execute: bool,
}

#[derive(Args, Debug)]
pub struct BenchmarkArgs {
    #[command(flatten)]
    pub input: SqlInput,

    #[arg(long, default_value_t = 3)]
    pub iterations: usize,

    #[arg(long, default_value_t = 1)]
    pub concurrency: usize,

    /// Fetch the source baseline for this SQL_ID
    #[arg(long)]
    pub oracle_sql_id: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    /// DB Replay capture directory
    Dbreplay,
    /// Capture log written by `capture`
    Jsonl,
    /// One statement per line
    Lines,
    /// Recently active statements on the source
    Online,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    Compat,
    Perf,
}

impl From<ModeArg> for ReplayMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Compat => ReplayMode::Compat,
            ModeArg::Perf => ReplayMode::Perf,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    #[arg(long, value_enum)]
    pub source_type: SourceType,

    /// Directory or file, required unless the source is online
    #[arg(long, required_if_eq_any([("source_type", "dbreplay"), ("source_type", "jsonl"), ("source_type", "lines")]))]
    pub source_path: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = ModeArg::Compat)]
    pub mode: ModeArg,

    #[arg(long, default_value_t = 1)]
    pub concurrency: usize,

    #[arg(long, default_value_t = 1)]
    pub iterations: usize,

    /// Online only: statements to fetch
    #[arg(long, default_value_t = 20)]
    pub limit: usize,

    /// Online only: schema filter, repeatable
    #[arg(long = "schema")]
    pub schemas: Vec<String>,

    /// Online only: module filter, repeatable
    #[arg(long = "module")]
    pub modules: Vec<String>,

    /// Online only: save fetched statements here, one per line
    #[arg(long)]
    pub store_file: Option<PathBuf>,

    /// DB Replay only: analysis tool to run first (default: [oma].start_script)
    #[arg(long)]
    pub oma_cli: Option<PathBuf>,

    /// DB Replay only: extra argument for the analysis tool, repeatable
    #[arg(long = "oma-arg", allow_hyphen_values = true)]
    pub oma_args: Vec<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct CaptureArgs {
    /// JSON Lines output, appended to
    #[arg(long, default_value = "captured_sqls.jsonl")]
    pub output: PathBuf,

    #[arg(long, default_value_t = 3600)]
    pub duration_seconds: u64,

    #[arg(long, default_value_t = 5)]
    pub interval_seconds: u64,

    /// Maximum rows per poll
    #[arg(long, default_value_t = 200)]
    pub limit_per_interval: usize,

    /// Skip bind-value lookups
    #[arg(long)]
    pub no_binds: bool,

    /// Write each (sql_id, child_number, last_active_time) once
    #[arg(long)]
    pub dedup: bool,

    /// Only capture these schemas, repeatable
    #[arg(long = "schema")]
    pub schemas: Vec<String>,

    /// Only capture these modules, repeatable
    #[arg(long = "module")]
    pub modules: Vec<String>,

    /// Add the config file's [capture].schemas to the schema filter
    #[arg(long)]
    pub respect_config_schemas: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbReplayAction {
    Start,
    Finish,
    Export,
}

#[derive(Args, Debug)]
pub struct DbReplayArgs {
    #[arg(long, value_enum)]
    pub action: DbReplayAction,

    /// Directory object name (start, export)
    #[arg(long, required_if_eq_any([("action", "start"), ("action", "export")]))]
    pub dir: Option<String>,

    /// Capture name (start)
    #[arg(long, required_if_eq("action", "start"))]
    pub name: Option<String>,

    /// Export file name such as capture01.dmp (export)
    #[arg(long, required_if_eq("action", "export"))]
    pub filename: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OmaModeArg {
    #[value(name = "ANALYZE")]
    Analyze,
    #[value(name = "REPLAY")]
    Replay,
}

impl From<OmaModeArg> for OmaMode {
    fn from(mode: OmaModeArg) -> Self {
        match mode {
            OmaModeArg::Analyze => OmaMode::Analyze,
            OmaModeArg::Replay => OmaMode::Replay,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OmaFromArg {
    #[value(name = "DB_REPLAY")]
    DbReplay,
    #[value(name = "TEXT")]
    Text,
    #[value(name = "DB")]
    Db,
}

impl From<OmaFromArg> for OmaSourceType {
    fn from(from: OmaFromArg) -> Self {
        match from {
            OmaFromArg::DbReplay => OmaSourceType::DbReplay,
            OmaFromArg::Text => OmaSourceType::Text,
            OmaFromArg::Db => OmaSourceType::Db,
        }
    }
}

#[derive(Args, Debug)]
pub struct OmaArgs {
    #[arg(long, value_enum)]
    pub mode: OmaModeArg,

    #[arg(long, value_enum)]
    pub from_type: OmaFromArg,

    /// Input path for DB_REPLAY and TEXT
    #[arg(long)]
    pub source_file: Option<String>,

    /// Comma-separated schema list
    #[arg(long)]
    pub schemas: Option<String>,

    #[arg(long, value_parser = ["READ", "WRITE", "READ_WRITE", "PL", "ALL"])]
    pub replay_mode: Option<String>,

    #[arg(long, value_parser = [
        "NOOP", "ONLY_SOURCE", "ONLY_TARGET", "ONLY_INSTANCE",
        "SOURCE_TARGET", "SOURCE_INSTANCE", "APPLICATION_CODE",
    ])]
    pub evaluate_mode: Option<String>,

    /// Static performance assessment during ANALYZE
    #[arg(long)]
    pub performance_mode: bool,

    #[arg(long)]
    pub max_parallel: Option<u32>,

    #[arg(long)]
    pub replay_scale: Option<f64>,

    /// Overrides [oma].report_root
    #[arg(long)]
    pub report_root: Option<PathBuf>,

    /// Passed through to the tool, repeatable
    #[arg(long = "extra-arg", allow_hyphen_values = true)]
    pub extra_args: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("obreplay").chain(args.iter().copied()))
    }

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn compat_requires_exactly_one_input() {
        assert!(parse(&["compat"]).is_err());
        assert!(parse(&["compat", "--sql", "SELECT 1 FROM dual", "--sql-file", "a.sql"]).is_err());
        assert!(parse(&["compat", "--sql", "SELECT 1 FROM dual"]).is_ok());
    }

    #[rstest]
    #[case("dbreplay", true)]
    #[case("jsonl", true)]
    #[case("lines", true)]
    #[case("online", false)]
    fn replay_source_path_requirement(#[case] source_type: &str, #[case] needs_path: bool) {
        assert_eq!(
            parse(&["replay", "--source-type", source_type]).is_err(),
            needs_path
        );
        assert!(parse(&["replay", "--source-type", source_type, "--source-path", "x"]).is_ok());
    }

    #[test]
    fn replay_collects_repeated_filters() {
        let cli = parse(&[
            "replay", "--source-type", "online", "--schema", "APP", "--schema", "HR",
            "--oma-arg", "--fast", "--mode", "perf",
        ])
        .unwrap();

        let Command::Replay(args) = cli.command else {
            panic!("expected replay");
        };
        assert_eq!(args.schemas, vec!["APP", "HR"]);
        assert_eq!(args.oma_args, vec!["--fast"]);
        assert_eq!(args.mode, ModeArg::Perf);
        assert_eq!(args.limit, 20);
    }

    #[test]
    fn dbreplay_start_requires_dir_and_name() {
        assert!(parse(&["dbreplay", "--action", "start", "--dir", "DBR_DIR"]).is_err());
        assert!(parse(&["dbreplay", "--action", "start", "--dir", "DBR_DIR", "--name", "CAP1"]).is_ok());
        assert!(parse(&["dbreplay", "--action", "finish"]).is_ok());
    }

    #[test]
    fn capture_defaults() {
        let cli = parse(&["capture"]).unwrap();

        let Command::Capture(args) = cli.command else {
            panic!("expected capture");
        };
        assert_eq!(args.output, PathBuf::from("captured_sqls.jsonl"));
        assert_eq!(args.duration_seconds, 3600);
        assert_eq!(args.interval_seconds, 5);
        assert_eq!(args.limit_per_interval, 200);
        assert!(!args.no_binds);
    }

    #[test]
    fn oma_uses_tool_spelling() {
        let cli = parse(&["oma", "--mode", "ANALYZE", "--from-type", "DB_REPLAY", "--replay-mode", "READ"])
            .unwrap();

        let Command::Oma(args) = cli.command else {
            panic!("expected oma");
        };
        assert_eq!(OmaSourceType::from(args.from_type), OmaSourceType::DbReplay);
        assert_eq!(args.replay_mode.as_deref(), Some("READ"));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = parse(&["compat", "--sql", "SELECT 1 FROM dual", "--verbose", "--config", "x.toml"]).unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
    }
}
