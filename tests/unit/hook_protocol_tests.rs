//! Unit tests for the hook stdin/stdout wire format.

use agentize_fleet::continuation::{HookInput, PromptSubmitResponse, StopResponse};
use agentize_fleet::AppError;

#[test]
fn session_key_prefers_session_id() {
    let input = HookInput::from_json(
        r#"{"session_id":"s1","conversation_id":"c1","generation_id":"g1"}"#,
    )
    .unwrap();
    assert_eq!(input.session_key(), "s1");
}

#[test]
fn session_key_falls_back_in_order() {
    let input = HookInput::from_json(r#"{"session_id":"","conversation_id":"c1"}"#).unwrap();
    assert_eq!(input.session_key(), "c1");

    let input = HookInput::from_json(r#"{"generation_id":"g1","prompt":"x"}"#).unwrap();
    assert_eq!(input.session_key(), "g1");

    let input = HookInput::from_json("{}").unwrap();
    assert_eq!(input.session_key(), "unknown");
}

#[test]
fn unknown_fields_are_ignored() {
    let input = HookInput::from_json(
        r#"{"session_id":"s1","hook_event_name":"Stop","transcript_path":"/tmp/t.jsonl"}"#,
    )
    .unwrap();
    assert_eq!(
        input.transcript_path.as_deref(),
        Some(std::path::Path::new("/tmp/t.jsonl"))
    );
}

#[test]
fn non_object_payload_is_a_hook_error() {
    assert!(matches!(HookInput::from_json("[1,2]"), Err(AppError::Hook(_))));
    assert!(matches!(HookInput::from_json(""), Err(AppError::Hook(_))));
}

#[test]
fn responses_have_host_field_names() {
    let proceed = serde_json::to_string(&PromptSubmitResponse::proceed()).unwrap();
    assert_eq!(proceed, r#"{"continue":true}"#);

    let allow = serde_json::to_string(&StopResponse::allow()).unwrap();
    assert_eq!(allow, r#"{"decision":"allow"}"#);

    let block = serde_json::to_value(StopResponse::block("keep going".into())).unwrap();
    assert_eq!(block["decision"], "block");
    assert_eq!(block["reason"], "keep going");
}
