//! Hook decision log.
//!
//! When `handsoff.debug` is on, every prompt-submit and stop decision is
//! recorded through the [`DecisionLogger`] trait. The primary
//! implementation, [`JsonlDecisionWriter`], appends JSONL records to
//! daily-rotating files in `.tmp/logs/`.

pub mod writer;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hook event that produced a log entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HookEvent {
    /// Prompt submission.
    PromptSubmit,
    /// Agent stop request.
    Stop,
}

/// Outcome recorded for a hook event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    /// Prompt passed through untouched.
    PassThrough,
    /// Prompt started or restarted a workflow.
    WorkflowStarted,
    /// Stop allowed.
    Allow,
    /// Stop blocked with a continuation prompt.
    Block,
}

/// A structured record of one hook decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionEntry {
    /// ISO 8601 timestamp.
    pub timestamp: DateTime<Utc>,
    /// Session the hook ran for.
    pub session_id: String,
    /// Triggering event.
    pub event: HookEvent,
    /// Outcome.
    pub decision: DecisionKind,
    /// Workflow involved, if any.
    pub workflow: Option<String>,
    /// Continuation count after the decision.
    pub continuation_count: Option<u32>,
    /// Why the decision was made.
    pub reason: Option<String>,
}

impl DecisionEntry {
    /// Construct a minimal entry.
    #[must_use]
    pub fn new(session_id: impl Into<String>, event: HookEvent, decision: DecisionKind) -> Self {
        Self {
            timestamp: Utc::now(),
            session_id: session_id.into(),
            event,
            decision,
            workflow: None,
            continuation_count: None,
            reason: None,
        }
    }

    /// Set the workflow name.
    #[must_use]
    pub fn with_workflow(mut self, workflow: impl Into<String>) -> Self {
        self.workflow = Some(workflow.into());
        self
    }

    /// Set the continuation count.
    #[must_use]
    pub fn with_count(mut self, count: u32) -> Self {
        self.continuation_count = Some(count);
        self
    }

    /// Set the reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Persists hook decisions.
///
/// Implementations must be [`Send`] and [`Sync`] so the engine can hold
/// them behind an [`std::sync::Arc`].
pub trait DecisionLogger: Send + Sync {
    /// Record a single entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying write fails.
    fn log_entry(&self, entry: DecisionEntry) -> crate::Result<()>;
}

pub use writer::JsonlDecisionWriter;
