#![forbid(unsafe_code)]

//! `agentize-hook`: host hook entry point for hands-off continuation.
//!
//! Reads the hook payload from stdin and always writes a valid JSON answer
//! to stdout. Diagnostics go to stderr only, so stdout stays parseable.

use std::io::{Read, Write};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

use agentize_fleet::audit::{DecisionLogger, JsonlDecisionWriter};
use agentize_fleet::config::{
    process_env, ConfigLoader, ConfigScope, FleetConfig, FreshConfigLoader, HandsoffSection,
    MemoizedConfigLoader,
};
use agentize_fleet::continuation::{ContinuationEngine, HookInput};

#[derive(Debug, Parser)]
#[command(
    name = "agentize-hook",
    about = "Hands-off continuation hook",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    event: Event,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Event {
    /// Handle a prompt submission.
    PromptSubmit,
    /// Decide whether the agent may stop.
    Stop,
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let mut raw = String::new();
    if let Err(err) = std::io::stdin().read_to_string(&mut raw) {
        warn!(%err, "failed to read hook payload");
    }
    let input = HookInput::from_json(&raw).unwrap_or_else(|err| {
        warn!(%err, "unusable hook payload");
        HookInput::default()
    });

    let engine = load_engine();
    let body = match cli.event {
        Event::PromptSubmit => to_json(&engine.on_prompt_submit(&input)),
        Event::Stop => to_json(&engine.on_stop(&input)),
    };

    let mut stdout = std::io::stdout().lock();
    if let Err(err) = writeln!(stdout, "{body}").and_then(|()| stdout.flush()) {
        warn!(%err, "failed to write hook response");
    }
}

/// Engine for the current directory. Only `[handsoff]` and `AGENTIZE_HOME`
/// are read; an unreadable config file falls back to the environment alone.
fn load_engine() -> ContinuationEngine {
    let config = current_config().unwrap_or_else(|| {
        Arc::new(FleetConfig::handsoff_only(
            &HandsoffSection::default(),
            &process_env(),
        ))
    });

    let engine = ContinuationEngine::new(&config);
    if !config.handsoff.debug {
        return engine;
    }
    match JsonlDecisionWriter::new(config.store_paths().logs_dir()) {
        Ok(writer) => {
            let logger: Arc<dyn DecisionLogger> = Arc::new(writer);
            engine.with_decision_log(logger)
        }
        Err(err) => {
            warn!(%err, "decision log unavailable");
            engine
        }
    }
}

fn current_config() -> Option<Arc<FleetConfig>> {
    let cwd = std::env::current_dir().ok()?;
    let loader = MemoizedConfigLoader::new(
        FreshConfigLoader::new(cwd).with_scope(ConfigScope::Handsoff),
    );
    match loader.load() {
        Ok(config) => Some(config),
        Err(err) => {
            warn!(%err, "config file unusable, falling back to environment");
            None
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_owned())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // A second subscriber only fails in tests; stdout must stay clean either way.
    let _ = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}
