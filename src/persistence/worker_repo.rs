//! Worker status file repository over `workers/worker-<i>.status`.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::models::worker::WorkerSlot;
use crate::{AppError, Result};

use super::atomic::atomic_write;
use super::StorePaths;

/// Raw access to worker status files. Only the poller writes these.
#[derive(Debug, Clone)]
pub struct WorkerRepo {
    paths: StorePaths,
}

impl WorkerRepo {
    /// Create a repository rooted at `paths`.
    #[must_use]
    pub fn new(paths: StorePaths) -> Self {
        Self { paths }
    }

    /// Path of the status file for `slot`.
    #[must_use]
    pub fn path_for(&self, slot: usize) -> PathBuf {
        self.paths.workers_dir().join(format!("worker-{slot}.status"))
    }

    /// Parse the status file for `slot`; `Ok(None)` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Store` if the file cannot be read or is structurally invalid.
    pub fn load(&self, slot: usize) -> Result<Option<WorkerSlot>> {
        let path = self.path_for(slot);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(AppError::Store(format!(
                    "failed to read {}: {err}",
                    path.display()
                )))
            }
        };
        WorkerSlot::parse(&raw)
            .map(Some)
            .map_err(|err| AppError::Store(format!("{}: {err}", path.display())))
    }

    /// Atomically replace the status file for `slot`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` on write failure.
    pub fn save(&self, slot: usize, status: &WorkerSlot) -> Result<()> {
        atomic_write(&self.path_for(slot), status.render().as_bytes())
    }
}
