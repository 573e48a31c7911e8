//! Host hook wire format: JSON on stdin, JSON on stdout.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{AppError, Result};

/// Session id used when the host sends none.
pub const UNKNOWN_SESSION: &str = "unknown";

/// Payload the host writes to the hook's stdin.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct HookInput {
    /// Session identifier (stop events).
    #[serde(default)]
    pub session_id: Option<String>,
    /// Conversation identifier (prompt-submit events).
    #[serde(default)]
    pub conversation_id: Option<String>,
    /// Generation identifier, used when nothing better is present.
    #[serde(default)]
    pub generation_id: Option<String>,
    /// Submitted prompt text.
    #[serde(default)]
    pub prompt: Option<String>,
    /// JSONL transcript of the conversation.
    #[serde(default)]
    pub transcript_path: Option<PathBuf>,
}

impl HookInput {
    /// Parse stdin.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Hook` if the payload is not a JSON object of this shape.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|err| AppError::Hook(format!("invalid hook input: {err}")))
    }

    /// First non-empty of `session_id`, `conversation_id`, `generation_id`, else `unknown`.
    #[must_use]
    pub fn session_key(&self) -> &str {
        [&self.session_id, &self.conversation_id, &self.generation_id]
            .into_iter()
            .filter_map(|id| id.as_deref())
            .find(|id| !id.is_empty())
            .unwrap_or(UNKNOWN_SESSION)
    }
}

/// Prompt-submit answer. This stage never blocks the prompt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptSubmitResponse {
    /// Always `true`.
    #[serde(rename = "continue")]
    pub proceed: bool,
}

impl PromptSubmitResponse {
    /// Let the prompt through.
    #[must_use]
    pub fn proceed() -> Self {
        Self { proceed: true }
    }
}

/// Stop decision keyword.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Let the agent terminate.
    Allow,
    /// Keep the agent running with `reason` injected.
    Block,
}

/// Stop answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StopResponse {
    /// Allow or block.
    pub decision: Decision,
    /// Continuation prompt when blocking.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl StopResponse {
    /// Let the agent stop.
    #[must_use]
    pub fn allow() -> Self {
        Self {
            decision: Decision::Allow,
            reason: None,
        }
    }

    /// Keep the agent working with `reason` as its next instruction.
    #[must_use]
    pub fn block(reason: String) -> Self {
        Self {
            decision: Decision::Block,
            reason: Some(reason),
        }
    }

    /// Whether this is a block.
    #[must_use]
    pub fn is_block(&self) -> bool {
        self.decision == Decision::Block
    }
}
