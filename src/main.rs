use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use color_eyre::eyre::Result;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use obreplay::cli::{Cli, Command};
use obreplay::commands::{self, Services};
use obreplay::error;
use obreplay::infra::config::{load_config, resolve_config_path};

fn init_logging(verbose: bool) {
    let default = if verbose { "obreplay=debug" } else { "obreplay=info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Cancelled on the first Ctrl-C; a running capture stops before its next poll.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping after the current poll");
            child.cancel();
        }
    });
    token
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    error::install_hooks()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let lookup = |key: &str| std::env::var(key).ok();
    let config_path = resolve_config_path(
        cli.config.as_deref(),
        lookup,
        &std::env::current_dir()?,
        dirs::config_dir(),
    )?;
    let config = load_config(&config_path, lookup)?;
    info!(path = %config_path.display(), "config loaded");

    let services = Services::from_config(&config);
    let mut buffer = Vec::new();

    let code = match &cli.command {
        Command::Compat(args) => commands::compat(&services, args, &mut buffer).await?,
        Command::Benchmark(args) => commands::benchmark(&services, args, &mut buffer).await?,
        Command::Replay(args) => commands::replay(&services, &config, args, &mut buffer).await?,
        Command::Capture(args) => {
            let cancel = cancel_on_ctrl_c();
            commands::capture(&services, &config, args, &cancel, &mut buffer).await?
        }
        Command::Dbreplay(args) => commands::dbreplay(&services, args, &mut buffer).await?,
        Command::Oma(args) => commands::oma(&config, args, &mut buffer).await?,
    };

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&buffer)?;
    stdout.flush()?;
    Ok(ExitCode::from(code))
}
