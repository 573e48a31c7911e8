//! Reverse lookup from a tracker issue to the session that owns it.

use serde::{Deserialize, Serialize};

use super::session::Workflow;

/// Entry persisted at `hooked-sessions/by-issue/<issue_no>.json`.
///
/// While present it names the single session considered responsible for
/// the issue. Removal means completion has been reported.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct IssueIndexEntry {
    /// Owning session identifier.
    pub session_id: String,
    /// Workflow the session was started with.
    pub workflow: Workflow,
}

impl IssueIndexEntry {
    /// Construct an entry for `session_id`.
    #[must_use]
    pub fn new(session_id: impl Into<String>, workflow: Workflow) -> Self {
        Self {
            session_id: session_id.into(),
            workflow,
        }
    }
}
