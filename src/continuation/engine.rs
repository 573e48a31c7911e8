//! Two-event continuation state machine.
//!
//! ```text
//! prompt-submit (workflow command) ──> initial, count = 0
//! stop, count < max, not done      ──> block, count + 1
//! stop, done | count >= max | fatal transcript error ──> allow
//! ```
//!
//! Every failure path fails open: a corrupt or unreadable session file
//! allows the stop instead of stranding the agent.

use std::sync::Arc;

use tracing::{debug, info, info_span, warn};

use crate::audit::{DecisionEntry, DecisionKind, DecisionLogger, HookEvent};
use crate::config::{FleetConfig, HandsoffConfig};
use crate::models::issue_index::IssueIndexEntry;
use crate::models::session::{SessionState, Workflow};
use crate::persistence::issue_index_repo::IssueIndexRepo;
use crate::persistence::session_repo::SessionRepo;

use super::protocol::{HookInput, PromptSubmitResponse, StopResponse};
use super::transcript::has_fatal_provider_error;
use super::workflow::{
    continuation_prompt, detect_workflow, extract_issue_no, extract_pr_no, PromptContext,
};

/// Hook-side decision maker bound to one configuration snapshot.
pub struct ContinuationEngine {
    settings: HandsoffConfig,
    sessions: SessionRepo,
    index: IssueIndexRepo,
    decisions: Option<Arc<dyn DecisionLogger>>,
}

impl ContinuationEngine {
    /// Build an engine over the state store described by `config`.
    #[must_use]
    pub fn new(config: &FleetConfig) -> Self {
        let paths = config.store_paths();
        Self {
            settings: config.handsoff.clone(),
            sessions: SessionRepo::new(paths.clone()),
            index: IssueIndexRepo::new(paths),
            decisions: None,
        }
    }

    /// Record every decision through `logger`.
    #[must_use]
    pub fn with_decision_log(mut self, logger: Arc<dyn DecisionLogger>) -> Self {
        self.decisions = Some(logger);
        self
    }

    fn record(&self, entry: DecisionEntry) {
        if let Some(logger) = &self.decisions {
            if let Err(err) = logger.log_entry(entry) {
                warn!(%err, "failed to record hook decision");
            }
        }
    }

    /// Handle a prompt submission. Never blocks the prompt.
    pub fn on_prompt_submit(&self, input: &HookInput) -> PromptSubmitResponse {
        let session_id = input.session_key();
        let _span = info_span!("prompt_submit", session_id).entered();

        if !self.settings.enabled {
            debug!("handsoff mode disabled, passing prompt through");
            return PromptSubmitResponse::proceed();
        }

        let prompt = input.prompt.as_deref().unwrap_or_default();
        let Some(workflow) = detect_workflow(prompt) else {
            debug!("no workflow matched");
            self.record(
                DecisionEntry::new(session_id, HookEvent::PromptSubmit, DecisionKind::PassThrough)
                    .with_reason("no workflow command"),
            );
            return PromptSubmitResponse::proceed();
        };

        let issue_no = extract_issue_no(prompt);
        let pr_no = if workflow == Workflow::SyncMaster {
            extract_pr_no(prompt)
        } else {
            None
        };
        let state = SessionState::start(workflow, issue_no, pr_no);

        if let Err(err) = self.sessions.save(session_id, &state) {
            warn!(%err, "failed to persist session state");
            return PromptSubmitResponse::proceed();
        }

        if let Some(issue_no) = issue_no {
            let entry = IssueIndexEntry::new(session_id, workflow);
            if let Err(err) = self.index.save(issue_no, &entry) {
                warn!(issue_no, %err, "failed to write issue index");
            }
        }

        info!(%workflow, ?issue_no, ?pr_no, "workflow started");
        self.record(
            DecisionEntry::new(
                session_id,
                HookEvent::PromptSubmit,
                DecisionKind::WorkflowStarted,
            )
            .with_workflow(workflow.as_str())
            .with_count(0),
        );
        PromptSubmitResponse::proceed()
    }

    /// Decide whether the agent may stop.
    pub fn on_stop(&self, input: &HookInput) -> StopResponse {
        let session_id = input.session_key();
        let _span = info_span!("stop", session_id).entered();

        if !self.settings.enabled {
            debug!("handsoff mode disabled, allowing stop");
            return StopResponse::allow();
        }

        let allow = |reason: &str, count: Option<u32>| {
            info!(reason, "allowing stop");
            let mut entry = DecisionEntry::new(session_id, HookEvent::Stop, DecisionKind::Allow)
                .with_reason(reason);
            if let Some(count) = count {
                entry = entry.with_count(count);
            }
            self.record(entry);
            StopResponse::allow()
        };

        if input
            .transcript_path
            .as_deref()
            .is_some_and(has_fatal_provider_error)
        {
            return allow("fatal provider error in transcript", None);
        }

        let mut state = match self.sessions.load(session_id) {
            Ok(Some(state)) => state,
            Ok(None) => return allow("no session state", None),
            Err(err) => {
                warn!(%err, "unreadable session state, failing open");
                return allow("unreadable session state", None);
            }
        };

        if state.is_done() {
            return allow("workflow done", Some(state.continuation_count));
        }

        let max = self.settings.max_continuations;
        if state.continuation_count >= max {
            return allow("continuation budget exhausted", Some(state.continuation_count));
        }

        let Some(workflow) = state.workflow else {
            return allow("no workflow", Some(state.continuation_count));
        };

        let state_file = match self.sessions.path_for(session_id) {
            Ok(path) => path,
            Err(err) => {
                warn!(%err, "unusable session id");
                return allow("unusable session id", None);
            }
        };
        let next = state.continuation_count + 1;
        let ctx = PromptContext {
            session_id,
            state_file: &state_file,
            count: next,
            max_count: max,
            pr_no: state.pr_no,
        };
        let Some(message) = continuation_prompt(workflow, &ctx) else {
            return allow("workflow has no continuation prompt", Some(state.continuation_count));
        };

        state.continuation_count = next;
        if let Err(err) = self.sessions.save(session_id, &state) {
            warn!(%err, "failed to persist continuation count, failing open");
            return allow("could not persist continuation", None);
        }

        info!(%workflow, count = next, max, "blocking stop with continuation");
        self.record(
            DecisionEntry::new(session_id, HookEvent::Stop, DecisionKind::Block)
                .with_workflow(workflow.as_str())
                .with_count(next),
        );
        StopResponse::block(message)
    }
}
