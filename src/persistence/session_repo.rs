//! Session record repository over `hooked-sessions/<session_id>.json`.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::models::session::SessionState;
use crate::{AppError, Result};

use super::atomic::atomic_write_json;
use super::issue_index_repo::IssueIndexRepo;
use super::{validate_file_stem, StorePaths};

/// Reads and writes per-session JSON records.
#[derive(Debug, Clone)]
pub struct SessionRepo {
    paths: StorePaths,
}

impl SessionRepo {
    /// Create a repository rooted at `paths`.
    #[must_use]
    pub fn new(paths: StorePaths) -> Self {
        Self { paths }
    }

    /// Path of the record for `session_id`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Store` if `session_id` is not a safe file name.
    pub fn path_for(&self, session_id: &str) -> Result<PathBuf> {
        validate_file_stem("session", session_id)?;
        Ok(self.paths.sessions_dir().join(format!("{session_id}.json")))
    }

    /// Load the record for `session_id`; `Ok(None)` when no file exists.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Store` if the file exists but cannot be read or
    /// parsed. Callers on the hook path treat that as "no state".
    pub fn load(&self, session_id: &str) -> Result<Option<SessionState>> {
        let path = self.path_for(session_id)?;
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
            AppError::Store(format!("malformed session file {}: {err}", path.display()))
        })
    }

    /// Atomically replace the record for `session_id`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Store` for an unsafe id, or `AppError::Io` on write failure.
    pub fn save(&self, session_id: &str, state: &SessionState) -> Result<()> {
        let path = self.path_for(session_id)?;
        debug!(session_id, path = %path.display(), ?state, "writing session state");
        atomic_write_json(&path, state)
    }

    /// Resolve `issue_no` through the issue index and load that session.
    ///
    /// Missing index, missing session, or unreadable files all yield `None`.
    #[must_use]
    pub fn state_for_issue(
        &self,
        index: &IssueIndexRepo,
        issue_no: u64,
    ) -> Option<(String, SessionState)> {
        let entry = match index.load(issue_no) {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(err) => {
                warn!(issue_no, %err, "unreadable issue index entry");
                return None;
            }
        };

        match self.load(&entry.session_id) {
            Ok(Some(state)) => Some((entry.session_id, state)),
            Ok(None) => None,
            Err(err) => {
                warn!(issue_no, session_id = entry.session_id, %err, "unreadable session state");
                None
            }
        }
    }

    /// Attach `pr_no` to the session that owns `issue_no`, keeping all other fields.
    ///
    /// Returns `false` when the index entry or the session file is missing.
    /// This races with the owning agent's hook; the last writer wins.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the rewrite fails.
    pub fn set_pr_number_for_issue(
        &self,
        index: &IssueIndexRepo,
        issue_no: u64,
        pr_no: u64,
    ) -> Result<bool> {
        let Some((session_id, mut state)) = self.state_for_issue(index, issue_no) else {
            return Ok(false);
        };
        state.pr_no = Some(pr_no);
        self.save(&session_id, &state)?;
        Ok(true)
    }
}
