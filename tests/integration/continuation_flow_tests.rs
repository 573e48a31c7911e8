//! End-to-end continuation scenarios through `ContinuationEngine`.
//!
//! | Scenario | Expectation |
//! |----------|-------------|
//! | workflow prompt | session reset to `initial`, count 0, issue indexed |
//! | stop under budget | block, count + 1 persisted |
//! | last continuation | header reads `10/10`, next stop allowed |
//! | agent marks done | allow without touching the file |
//! | corrupt or missing state | allow |
//! | fatal provider error | allow before any state is read |
//! | hands-off off | hooks are inert |

use std::fs;
use std::sync::Arc;

use agentize_fleet::audit::JsonlDecisionWriter;
use agentize_fleet::continuation::{ContinuationEngine, HookInput};
use agentize_fleet::models::session::{SessionState, Workflow, WorkflowState};
use agentize_fleet::persistence::issue_index_repo::IssueIndexRepo;
use agentize_fleet::persistence::session_repo::SessionRepo;
use agentize_fleet::persistence::StorePaths;

use super::test_helpers::{handsoff_config, test_config};

fn prompt(session: &str, text: &str) -> HookInput {
    HookInput {
        conversation_id: Some(session.into()),
        prompt: Some(text.into()),
        ..HookInput::default()
    }
}

fn stop(session: &str) -> HookInput {
    HookInput {
        session_id: Some(session.into()),
        ..HookInput::default()
    }
}

fn sessions(base: &std::path::Path) -> SessionRepo {
    SessionRepo::new(StorePaths::new(base))
}

#[test]
fn workflow_prompt_starts_fresh_session() {
    let temp = tempfile::tempdir().unwrap();
    let engine = ContinuationEngine::new(&handsoff_config(temp.path(), 10));

    let resp = engine.on_prompt_submit(&prompt("s1", "/issue-to-impl 42"));

    assert!(resp.proceed);
    let state = sessions(temp.path()).load("s1").unwrap().unwrap();
    assert_eq!(state.workflow, Some(Workflow::IssueToImpl));
    assert_eq!(state.state, WorkflowState::Initial);
    assert_eq!(state.continuation_count, 0);
    assert_eq!(state.issue_no, Some(42));

    let entry = IssueIndexRepo::new(StorePaths::new(temp.path()))
        .load(42)
        .unwrap()
        .unwrap();
    assert_eq!(entry.session_id, "s1");
}

#[test]
fn repeated_workflow_prompt_resets_count() {
    let temp = tempfile::tempdir().unwrap();
    let engine = ContinuationEngine::new(&handsoff_config(temp.path(), 10));
    let repo = sessions(temp.path());
    let mut state = SessionState::start(Workflow::UltraPlanner, None, None);
    state.continuation_count = 6;
    state.state = WorkflowState::Done;
    repo.save("s1", &state).unwrap();

    engine.on_prompt_submit(&prompt("s1", "/ultra-planner again"));

    let state = repo.load("s1").unwrap().unwrap();
    assert_eq!(state.continuation_count, 0);
    assert_eq!(state.state, WorkflowState::Initial);
}

#[test]
fn plain_prompt_writes_nothing() {
    let temp = tempfile::tempdir().unwrap();
    let engine = ContinuationEngine::new(&handsoff_config(temp.path(), 10));

    assert!(engine.on_prompt_submit(&prompt("s1", "fix the bug")).proceed);

    assert_eq!(sessions(temp.path()).load("s1").unwrap(), None);
}

#[test]
fn stop_under_budget_blocks_and_counts() {
    let temp = tempfile::tempdir().unwrap();
    let engine = ContinuationEngine::new(&handsoff_config(temp.path(), 10));
    engine.on_prompt_submit(&prompt("s1", "/issue-to-impl 42"));

    let first = engine.on_stop(&stop("s1"));
    let second = engine.on_stop(&stop("s1"));

    assert!(first.is_block());
    assert!(second.is_block());
    assert!(second.reason.unwrap().contains("currently 2/10 continuations"));
    assert_eq!(
        sessions(temp.path()).load("s1").unwrap().unwrap().continuation_count,
        2
    );
}

#[test]
fn final_continuation_then_allow() {
    let temp = tempfile::tempdir().unwrap();
    let engine = ContinuationEngine::new(&handsoff_config(temp.path(), 10));
    let repo = sessions(temp.path());
    let mut state = SessionState::start(Workflow::IssueToImpl, Some(42), None);
    state.continuation_count = 9;
    repo.save("s1", &state).unwrap();

    let last = engine.on_stop(&stop("s1"));
    assert!(last.is_block());
    assert!(last
        .reason
        .unwrap()
        .starts_with("This is an auto-continuation prompt for handsoff mode, it is currently 10/10 continuations."));
    assert_eq!(repo.load("s1").unwrap().unwrap().continuation_count, 10);

    let after = engine.on_stop(&stop("s1"));
    assert!(!after.is_block());
    assert_eq!(repo.load("s1").unwrap().unwrap().continuation_count, 10);
}

#[test]
fn done_session_is_allowed_untouched() {
    let temp = tempfile::tempdir().unwrap();
    let engine = ContinuationEngine::new(&handsoff_config(temp.path(), 10));
    let repo = sessions(temp.path());
    engine.on_prompt_submit(&prompt("s1", "/issue-to-impl 42"));
    let path = repo.path_for("s1").unwrap();
    // The agent edits the file itself, as the continuation prompt instructs.
    fs::write(
        &path,
        r#"{"workflow":"issue-to-impl","state":"done","continuation_count":3,"issue_no":42}"#,
    )
    .unwrap();
    let before = fs::read_to_string(&path).unwrap();

    assert!(!engine.on_stop(&stop("s1")).is_block());
    assert_eq!(fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn corrupt_or_missing_state_fails_open() {
    let temp = tempfile::tempdir().unwrap();
    let engine = ContinuationEngine::new(&handsoff_config(temp.path(), 10));
    let repo = sessions(temp.path());

    assert!(!engine.on_stop(&stop("nobody")).is_block());

    let path = repo.path_for("s1").unwrap();
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "{{{{").unwrap();
    assert!(!engine.on_stop(&stop("s1")).is_block());
}

#[test]
fn unusable_session_id_fails_open() {
    let temp = tempfile::tempdir().unwrap();
    let engine = ContinuationEngine::new(&handsoff_config(temp.path(), 10));

    assert!(!engine.on_stop(&stop("../escape")).is_block());
}

#[test]
fn fatal_transcript_error_allows_stop() {
    let temp = tempfile::tempdir().unwrap();
    let engine = ContinuationEngine::new(&handsoff_config(temp.path(), 10));
    engine.on_prompt_submit(&prompt("s1", "/issue-to-impl 42"));
    let transcript = temp.path().join("t.jsonl");
    fs::write(
        &transcript,
        r#"{"isApiErrorMessage":true,"message":{"content":"Insufficient credit"}}"#,
    )
    .unwrap();

    let resp = engine.on_stop(&HookInput {
        session_id: Some("s1".into()),
        transcript_path: Some(transcript),
        ..HookInput::default()
    });

    assert!(!resp.is_block());
    assert_eq!(
        sessions(temp.path()).load("s1").unwrap().unwrap().continuation_count,
        0
    );
}

#[test]
fn unrecognized_workflow_on_disk_is_allowed() {
    let temp = tempfile::tempdir().unwrap();
    let engine = ContinuationEngine::new(&handsoff_config(temp.path(), 10));
    let path = sessions(temp.path()).path_for("s1").unwrap();
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, r#"{"workflow":"retired-flow","state":"initial"}"#).unwrap();

    assert!(!engine.on_stop(&stop("s1")).is_block());
}

#[test]
fn disabled_handsoff_is_inert() {
    let temp = tempfile::tempdir().unwrap();
    let engine = ContinuationEngine::new(&test_config(temp.path(), "[handsoff]\nenabled = false\n"));

    assert!(engine.on_prompt_submit(&prompt("s1", "/issue-to-impl 42")).proceed);
    assert_eq!(sessions(temp.path()).load("s1").unwrap(), None);

    sessions(temp.path())
        .save("s1", &SessionState::start(Workflow::IssueToImpl, None, None))
        .unwrap();
    assert!(!engine.on_stop(&stop("s1")).is_block());
}

#[test]
fn decisions_are_logged_when_enabled() {
    let temp = tempfile::tempdir().unwrap();
    let config = handsoff_config(temp.path(), 2);
    let logs = config.store_paths().logs_dir();
    let engine = ContinuationEngine::new(&config)
        .with_decision_log(Arc::new(JsonlDecisionWriter::new(logs.clone()).unwrap()));

    engine.on_prompt_submit(&prompt("s1", "/sync-master 17"));
    engine.on_stop(&stop("s1"));

    let path = JsonlDecisionWriter::path_for(&logs, chrono::Utc::now().date_naive());
    let lines: Vec<serde_json::Value> = fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["decision"], "workflow_started");
    assert_eq!(lines[1]["decision"], "block");
    assert_eq!(lines[1]["continuation_count"], 1);
}
