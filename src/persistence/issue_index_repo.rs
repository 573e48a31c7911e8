//! Issue index repository over `hooked-sessions/by-issue/<issue_no>.json`.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::debug;

use crate::models::issue_index::IssueIndexEntry;
use crate::{AppError, Result};

use super::atomic::atomic_write_json;
use super::StorePaths;

/// Reads, writes, and removes issue index entries.
#[derive(Debug, Clone)]
pub struct IssueIndexRepo {
    paths: StorePaths,
}

impl IssueIndexRepo {
    /// Create a repository rooted at `paths`.
    #[must_use]
    pub fn new(paths: StorePaths) -> Self {
        Self { paths }
    }

    /// Path of the entry for `issue_no`.
    #[must_use]
    pub fn path_for(&self, issue_no: u64) -> PathBuf {
        self.paths.issue_index_dir().join(format!("{issue_no}.json"))
    }

    /// Load the entry for `issue_no`; `Ok(None)` when absent.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Store` if the file exists but cannot be read or parsed.
    pub fn load(&self, issue_no: u64) -> Result<Option<IssueIndexEntry>> {
        let path = self.path_for(issue_no);
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

        serde_json::from_str(&raw).map(Some).map_err(|err| {
            AppError::Store(format!("malformed issue index {}: {err}", path.display()))
        })
    }

    /// Write or overwrite the entry for `issue_no`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` on write failure.
    pub fn save(&self, issue_no: u64, entry: &IssueIndexEntry) -> Result<()> {
        debug!(issue_no, session_id = entry.session_id, "writing issue index");
        atomic_write_json(&self.path_for(issue_no), entry)
    }

    /// Remove the entry for `issue_no`. Removing a missing entry succeeds.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the file exists and cannot be removed.
    pub fn remove(&self, issue_no: u64) -> Result<()> {
        let path = self.path_for(issue_no);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AppError::Io(format!(
                "failed to remove {}: {err}",
                path.display()
            ))),
        }
    }
}
