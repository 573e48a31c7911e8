#![allow(dead_code)]

//! Shared fakes and fixtures for integration tests.
//!
//! `FakeTask`, `RecordingNotifier`, and `StaticSource` stand in for the
//! shell launcher, Telegram, and GitHub so the poller and worker pool can
//! run against a temporary state store.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use agentize_fleet::config::{CliOverrides, EnvLookup, FleetConfig, LocalConfigFile};
use agentize_fleet::models::work_item::{UnitOfWork, WorkItem};
use agentize_fleet::notify::Notifier;
use agentize_fleet::orchestrator::TaskRunner;
use agentize_fleet::source::WorkSource;
use agentize_fleet::{AppError, BoxFuture, Result};

/// Resolve `toml` with `base` as the state store and no process environment.
pub fn test_config(base: &Path, toml: &str) -> FleetConfig {
    let base = base.display().to_string();
    let env: EnvLookup = Arc::new(move |key| (key == "AGENTIZE_HOME").then(|| base.clone()));
    let file = LocalConfigFile::from_toml_str(toml).expect("valid test config");
    FleetConfig::resolve(file, &CliOverrides::default(), &env).expect("resolvable test config")
}

/// Config with hands-off on and a `max` continuation budget.
pub fn handsoff_config(base: &Path, max: u32) -> FleetConfig {
    test_config(
        base,
        &format!("[handsoff]\nenabled = true\nmax_continuations = {max}\n"),
    )
}

/// Config with a pool of `workers` slots and Telegram credentials.
pub fn pool_config(base: &Path, workers: usize) -> FleetConfig {
    test_config(
        base,
        &format!(
            "[server]\nnum_workers = {workers}\nrepo_slug = \"acme/widgets\"\n\
             [telegram]\ntoken = \"t\"\nchat_id = \"1\"\n"
        ),
    )
}

/// Scriptable [`TaskRunner`].
#[derive(Default)]
pub struct FakeTask {
    next_pid: Mutex<u32>,
    /// Units handed to `spawn`, in call order.
    pub spawned: Mutex<Vec<UnitOfWork>>,
    /// Numbers whose launch fails.
    pub fail_numbers: Mutex<HashSet<u64>>,
    /// Numbers reported as already existing.
    pub existing: Mutex<HashSet<u64>>,
    /// Pids reported alive.
    pub alive: Mutex<HashSet<u32>>,
    /// Launches that report no pid.
    pub pidless: Mutex<HashSet<u64>>,
    /// Worker status directory read at the start of every `spawn`.
    pub watch_workers: Mutex<Option<PathBuf>>,
    /// `(number, slot file contents)` seen while each launch was running.
    pub slots_during_spawn: Mutex<Vec<(u64, Vec<String>)>>,
}

impl FakeTask {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_pid: Mutex::new(1000),
            ..Self::default()
        })
    }

    pub fn spawned_numbers(&self) -> Vec<u64> {
        self.spawned.lock().unwrap().iter().map(|u| u.number).collect()
    }

    pub fn kill(&self, pid: u32) {
        self.alive.lock().unwrap().remove(&pid);
    }

    pub fn fail(&self, number: u64) {
        self.fail_numbers.lock().unwrap().insert(number);
    }

    /// Record every slot file under `workers_dir` at the start of each launch.
    pub fn watch(&self, workers_dir: &Path) {
        *self.watch_workers.lock().unwrap() = Some(workers_dir.to_path_buf());
    }

    fn snapshot_slots(&self, number: u64) {
        let Some(dir) = self.watch_workers.lock().unwrap().clone() else {
            return;
        };
        let mut files: Vec<_> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "status"))
            .collect();
        files.sort();
        let contents = files
            .iter()
            .map(|path| std::fs::read_to_string(path).unwrap())
            .collect();
        self.slots_during_spawn
            .lock()
            .unwrap()
            .push((number, contents));
    }
}

impl TaskRunner for FakeTask {
    fn spawn(&self, unit: UnitOfWork) -> BoxFuture<'_, Result<Option<u32>>> {
        Box::pin(async move {
            self.snapshot_slots(unit.number);
            self.spawned.lock().unwrap().push(unit);
            if self.fail_numbers.lock().unwrap().contains(&unit.number) {
                return Err(AppError::Spawn(format!("scripted failure for {unit}")));
            }
            if self.pidless.lock().unwrap().contains(&unit.number) {
                return Ok(None);
            }
            let pid = {
                let mut next = self.next_pid.lock().unwrap();
                *next += 1;
                *next
            };
            self.alive.lock().unwrap().insert(pid);
            Ok(Some(pid))
        })
    }

    fn exists(&self, unit: UnitOfWork) -> BoxFuture<'_, bool> {
        Box::pin(async move { self.existing.lock().unwrap().contains(&unit.number) })
    }

    fn is_alive(&self, pid: u32) -> bool {
        self.alive.lock().unwrap().contains(&pid)
    }
}

/// [`Notifier`] that records every message.
#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<String>>,
    pub fail: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn send<'a>(&'a self, message: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if *self.fail.lock().unwrap() {
                return Err(AppError::Notify("scripted failure".into()));
            }
            self.messages.lock().unwrap().push(message.to_owned());
            Ok(())
        })
    }
}

/// [`WorkSource`] serving a fixed item list.
#[derive(Default)]
pub struct StaticSource {
    pub items: Mutex<Vec<WorkItem>>,
    pub prs: Mutex<HashMap<u64, u64>>,
    pub fail_fetch: Mutex<bool>,
    pub pr_lookups: Mutex<u32>,
}

impl StaticSource {
    pub fn with_items(items: Vec<WorkItem>) -> Arc<Self> {
        Arc::new(Self {
            items: Mutex::new(items),
            ..Self::default()
        })
    }

    pub fn set_items(&self, items: Vec<WorkItem>) {
        *self.items.lock().unwrap() = items;
    }
}

impl WorkSource for StaticSource {
    fn fetch_items(&self) -> BoxFuture<'_, Result<Vec<WorkItem>>> {
        Box::pin(async move {
            if *self.fail_fetch.lock().unwrap() {
                return Err(AppError::Source("scripted outage".into()));
            }
            Ok(self.items.lock().unwrap().clone())
        })
    }

    fn find_pr_for_issue(&self, issue_no: u64) -> BoxFuture<'_, Result<Option<u64>>> {
        Box::pin(async move {
            *self.pr_lookups.lock().unwrap() += 1;
            Ok(self.prs.lock().unwrap().get(&issue_no).copied())
        })
    }
}
