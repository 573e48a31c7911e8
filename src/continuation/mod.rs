//! Hook-side continuation engine.
//!
//! Runs inside each agent invocation on prompt-submit and stop events and
//! decides whether a hands-off workflow keeps going.

pub mod engine;
pub mod protocol;
pub mod transcript;
pub mod workflow;

pub use engine::ContinuationEngine;
pub use protocol::{Decision, HookInput, PromptSubmitResponse, StopResponse};
