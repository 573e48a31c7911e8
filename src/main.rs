#![forbid(unsafe_code)]

//! `agentize-server`: fleet poller binary.
//!
//! Loads configuration, prepares the worker pool, and polls the project
//! board until SIGINT or SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use agentize_fleet::config::{CliOverrides, ConfigLoader, FreshConfigLoader};
use agentize_fleet::notify::{Notifier, TelegramNotifier};
use agentize_fleet::orchestrator::{Poller, ShellTask};
use agentize_fleet::source::GitHubSource;
use agentize_fleet::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "agentize-server", about = "Agent fleet poller", version, long_about = None)]
struct Cli {
    /// Explicit `.agentize.local.toml`; searched upward from the cwd otherwise.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Poll period such as `5m` or `30s`.
    #[arg(long)]
    period: Option<String>,

    /// Worker pool size; `0` dispatches without a bound.
    #[arg(long)]
    num_workers: Option<usize>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("agentize-server bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    let cwd = std::env::current_dir()
        .map_err(|err| AppError::Config(format!("cannot resolve working directory: {err}")))?;
    let mut loader = FreshConfigLoader::new(cwd)
        .with_cli(CliOverrides {
            period: args.period,
            num_workers: args.num_workers,
        })
        .with_keychain(true);
    if let Some(path) = args.config {
        loader = loader.with_path(path);
    }
    let loader: Arc<dyn ConfigLoader> = Arc::new(loader);

    let config = loader.load()?;
    info!(
        base_dir = %config.base_dir.display(),
        num_workers = config.server.num_workers,
        period = ?config.server.period,
        telegram = config.telegram.is_some(),
        "configuration loaded"
    );

    let source = Arc::new(GitHubSource::new(&config));
    let task = Arc::new(ShellTask::new(&config));
    let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::new(&config)?);

    let mut poller = Poller::new(loader, source, task, Some(notifier))?;
    poller.startup()?;

    let ct = CancellationToken::new();
    let poll_ct = ct.clone();
    let poll_handle = tokio::spawn(poller.run(poll_ct));

    shutdown_signal().await;
    info!("shutdown signal received");
    ct.cancel();

    if let Err(err) = poll_handle.await {
        error!(%err, "poller task failed");
    }
    info!("agentize-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
