//! Hands-off session record and workflow lifecycle helpers.

use serde::{Deserialize, Serialize};

/// Automation workflow a session is running.
///
/// Unknown workflow names found on disk normalize to
/// [`Workflow::Unrecognized`], which never earns a continuation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Workflow {
    /// Multi-agent debate-based planning.
    UltraPlanner,
    /// Complete development cycle from issue to PR.
    IssueToImpl,
    /// Create `[plan]` issues from a user-provided plan.
    PlanToIssue,
    /// GitHub Projects v2 board setup.
    SetupViewboard,
    /// Sync local main/master with upstream and force-push the PR branch.
    SyncMaster,
    /// Any workflow name this build does not know.
    #[serde(other)]
    Unrecognized,
}

impl Workflow {
    /// Every workflow that can be triggered from a prompt.
    pub const TRIGGERABLE: [Self; 5] = [
        Self::UltraPlanner,
        Self::IssueToImpl,
        Self::PlanToIssue,
        Self::SetupViewboard,
        Self::SyncMaster,
    ];

    /// Stable on-disk name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UltraPlanner => "ultra-planner",
            Self::IssueToImpl => "issue-to-impl",
            Self::PlanToIssue => "plan-to-issue",
            Self::SetupViewboard => "setup-viewboard",
            Self::SyncMaster => "sync-master",
            Self::Unrecognized => "unrecognized",
        }
    }

    /// Slash command that starts this workflow, if any.
    #[must_use]
    pub fn command(self) -> Option<&'static str> {
        match self {
            Self::UltraPlanner => Some("/ultra-planner"),
            Self::IssueToImpl => Some("/issue-to-impl"),
            Self::PlanToIssue => Some("/plan-to-issue"),
            Self::SetupViewboard => Some("/setup-viewboard"),
            Self::SyncMaster => Some("/sync-master"),
            Self::Unrecognized => None,
        }
    }
}

impl std::fmt::Display for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of a workflow within a session.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    /// Freshly (re)started by a workflow command.
    #[default]
    Initial,
    /// Agent declared the workflow finished. Terminal.
    Done,
    /// Any non-terminal state the agent wrote itself.
    #[serde(other)]
    InProgress,
}

/// Per-session record persisted at `hooked-sessions/<session_id>.json`.
///
/// The agent may rewrite this file itself (for example with `jq` to mark it
/// `done`), so unknown keys are carried through in [`SessionState::extra`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct SessionState {
    /// Active workflow; `None` means no automation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<Workflow>,
    /// Workflow progress.
    #[serde(default)]
    pub state: WorkflowState,
    /// Number of stop events converted into continuations.
    #[serde(default)]
    pub continuation_count: u32,
    /// Tracker issue this session works on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_no: Option<u64>,
    /// Pull request this session works on or produced.
    #[serde(
        default,
        alias = "pr_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub pr_no: Option<u64>,
    /// Fields written by other tools; preserved on rewrite.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SessionState {
    /// Fresh record for a workflow command seen at prompt submission.
    #[must_use]
    pub fn start(workflow: Workflow, issue_no: Option<u64>, pr_no: Option<u64>) -> Self {
        Self {
            workflow: Some(workflow),
            state: WorkflowState::Initial,
            continuation_count: 0,
            issue_no,
            pr_no,
            extra: serde_json::Map::new(),
        }
    }

    /// Whether the agent has marked this workflow finished.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state == WorkflowState::Done
    }
}
