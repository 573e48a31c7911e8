//! Agent launching through configured shell command templates.

use std::collections::BTreeMap;
use std::process::Stdio;
use std::sync::{LazyLock, RwLock};
use std::time::Duration;

use regex::Regex;
use tokio::process::Command;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::{env_keys, AgentModel, FleetConfig, SpawnerConfig};
use crate::models::work_item::{Category, UnitOfWork};
use crate::{AppError, BoxFuture, Result};

use super::liveness::probe_pid;

/// Upper bound on how long a launch command may take to hand back a pid.
const SPAWN_TIMEOUT: Duration = Duration::from_mins(5);

static PID_LINE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?m)PID[:\s]+(\d+)").ok());

/// Launches and probes agent processes.
pub trait TaskRunner: Send + Sync {
    /// Start an agent for `unit`; resolves to its pid when one was reported.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Spawn` when the launch fails.
    fn spawn(&self, unit: UnitOfWork) -> BoxFuture<'_, Result<Option<u32>>>;

    /// Whether work for `unit` already exists outside the pool, e.g. a
    /// worktree left by an earlier run.
    fn exists(&self, unit: UnitOfWork) -> BoxFuture<'_, bool>;

    /// Whether `pid` is still running.
    fn is_alive(&self, pid: u32) -> bool;

    /// Pick up a fresh configuration snapshot.
    fn reconfigure(&self, _config: &FleetConfig) {}
}

#[derive(Debug, Clone)]
struct Templates {
    spawner: SpawnerConfig,
    models: BTreeMap<Category, AgentModel>,
    home: String,
}

/// Runs `{shell} -c <template>` with `{number}` substituted.
pub struct ShellTask {
    templates: RwLock<Templates>,
}

impl ShellTask {
    /// Task runner using the templates in `config`.
    #[must_use]
    pub fn new(config: &FleetConfig) -> Self {
        Self {
            templates: RwLock::new(Templates::from(config)),
        }
    }

    fn templates(&self) -> Result<Templates> {
        self.templates
            .read()
            .map(|guard| guard.clone())
            .map_err(|err| AppError::Spawn(format!("template lock poisoned: {err}")))
    }
}

impl From<&FleetConfig> for Templates {
    fn from(config: &FleetConfig) -> Self {
        Self {
            spawner: config.spawner.clone(),
            models: config.models.clone(),
            home: config.base_dir.display().to_string(),
        }
    }
}

/// Expand a template for `unit`, appending `--model` when one is configured
/// for its category.
#[must_use]
pub fn render_command(template: &str, unit: UnitOfWork, model: Option<AgentModel>) -> String {
    let mut command = template.replace("{number}", &unit.number.to_string());
    if let Some(model) = model {
        command.push_str(" --model ");
        command.push_str(model.as_str());
    }
    command
}

/// Pid reported on a `PID: <n>` line of launcher output.
#[must_use]
pub fn parse_pid(output: &str) -> Option<u32> {
    PID_LINE
        .as_ref()?
        .captures(output)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

fn shell_command(templates: &Templates, command: &str) -> Command {
    let mut cmd = Command::new(&templates.spawner.shell);
    cmd.arg("-c")
        .arg(command)
        .env(env_keys::HOME, &templates.home)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

impl TaskRunner for ShellTask {
    fn spawn(&self, unit: UnitOfWork) -> BoxFuture<'_, Result<Option<u32>>> {
        let span = info_span!("spawn", %unit);
        Box::pin(
            async move {
                let templates = self.templates()?;
                let model = templates.models.get(&unit.category).copied();
                let command =
                    render_command(templates.spawner.command_for(unit.category), unit, model);
                debug!(command, "launching agent");

                let output = tokio::time::timeout(
                    SPAWN_TIMEOUT,
                    shell_command(&templates, &command).output(),
                )
                .await
                .map_err(|_| AppError::Spawn(format!("launch of {unit} timed out")))?
                .map_err(|err| AppError::Spawn(format!("failed to run launcher: {err}")))?;

                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    return Err(AppError::Spawn(format!(
                        "launcher for {unit} exited with {}: {}",
                        output.status,
                        stderr.trim()
                    )));
                }

                let stdout = String::from_utf8_lossy(&output.stdout);
                let pid = parse_pid(&stdout);
                if pid.is_none() {
                    warn!("launcher reported no pid; slot will not be reclaimed automatically");
                }
                info!(?pid, "agent launched");
                Ok(pid)
            }
            .instrument(span),
        )
    }

    fn exists(&self, unit: UnitOfWork) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            let templates = match self.templates() {
                Ok(templates) => templates,
                Err(err) => {
                    warn!(%err, "cannot check existing work");
                    return false;
                }
            };
            let Some(template) = templates.spawner.exists_for(unit.category) else {
                return false;
            };
            let command = render_command(template, unit, None);
            match shell_command(&templates, &command).output().await {
                Ok(output) => output.status.success(),
                Err(err) => {
                    warn!(%unit, %err, "existence check failed to run");
                    false
                }
            }
        })
    }

    fn is_alive(&self, pid: u32) -> bool {
        probe_pid(pid)
    }

    fn reconfigure(&self, config: &FleetConfig) {
        match self.templates.write() {
            Ok(mut guard) => *guard = Templates::from(config),
            Err(err) => warn!(%err, "template lock poisoned"),
        }
    }
}
