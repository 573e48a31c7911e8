//! Flat-file state store shared by the hook and the poller.
//!
//! Layout under the base directory (`AGENTIZE_HOME`):
//!
//! ```text
//! .tmp/hooked-sessions/<session_id>.json     session records
//! .tmp/hooked-sessions/by-issue/<n>.json     issue -> session index
//! .tmp/workers/worker-<i>.status             worker slot status
//! .tmp/logs/hook-<date>.jsonl                hook decision log
//! ```
//!
//! There are no locks. Every write goes through [`atomic::atomic_write`] so
//! readers only ever see a complete old or new file.

pub mod atomic;
pub mod issue_index_repo;
pub mod session_repo;
pub mod worker_repo;

use std::path::{Path, PathBuf};

use crate::{AppError, Result};

/// Resolved directory layout of the state store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    base: PathBuf,
}

impl StorePaths {
    /// Layout rooted at `base`.
    #[must_use]
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Base directory.
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Directory holding session records.
    #[must_use]
    pub fn sessions_dir(&self) -> PathBuf {
        self.base.join(".tmp").join("hooked-sessions")
    }

    /// Directory holding issue index entries.
    #[must_use]
    pub fn issue_index_dir(&self) -> PathBuf {
        self.sessions_dir().join("by-issue")
    }

    /// Directory holding worker status files.
    #[must_use]
    pub fn workers_dir(&self) -> PathBuf {
        self.base.join(".tmp").join("workers")
    }

    /// Directory holding the hook decision log.
    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        self.base.join(".tmp").join("logs")
    }
}

/// Reject identifiers that would escape their directory when used as a file name.
pub(crate) fn validate_file_stem(kind: &str, stem: &str) -> Result<()> {
    if stem.is_empty()
        || stem == "."
        || stem == ".."
        || stem.contains(['/', '\\', '\0'])
    {
        return Err(AppError::Store(format!("invalid {kind} identifier `{stem}`")));
    }
    Ok(())
}
