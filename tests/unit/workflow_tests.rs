//! Unit tests for workflow detection and continuation prompts.

use std::path::Path;

use agentize_fleet::continuation::workflow::{
    continuation_prompt, detect_workflow, extract_issue_no, extract_pr_no, PromptContext,
};
use agentize_fleet::models::session::Workflow;

fn ctx(count: u32, max: u32, pr_no: Option<u64>) -> PromptContext<'static> {
    PromptContext {
        session_id: "sess-1",
        state_file: Path::new("/tmp/store/.tmp/hooked-sessions/sess-1.json"),
        count,
        max_count: max,
        pr_no,
    }
}

#[test]
fn detects_each_workflow_command() {
    let cases = [
        ("/ultra-planner build a cache", Workflow::UltraPlanner),
        ("/issue-to-impl 42", Workflow::IssueToImpl),
        ("/plan-to-issue my plan", Workflow::PlanToIssue),
        ("/setup-viewboard", Workflow::SetupViewboard),
        ("/sync-master 17", Workflow::SyncMaster),
    ];
    for (prompt, expected) in cases {
        assert_eq!(detect_workflow(prompt), Some(expected), "{prompt}");
    }
}

#[test]
fn ordinary_prompts_match_nothing() {
    assert_eq!(detect_workflow("please fix the tests"), None);
    assert_eq!(detect_workflow("run /issue-to-impl 42 later"), None);
    assert_eq!(detect_workflow(""), None);
}

#[test]
fn issue_number_sources() {
    assert_eq!(extract_issue_no("/issue-to-impl 42"), Some(42));
    assert_eq!(extract_issue_no("/ultra-planner --refine 15"), Some(15));
    assert_eq!(extract_issue_no("/ultra-planner --from-issue 8"), Some(8));
    assert_eq!(extract_issue_no("/ultra-planner build it"), None);
}

#[test]
fn pr_number_from_sync_master() {
    assert_eq!(extract_pr_no("/sync-master 17"), Some(17));
    assert_eq!(extract_pr_no("/sync-master"), None);
}

#[test]
fn prompt_header_reports_progress() {
    let text = continuation_prompt(Workflow::IssueToImpl, &ctx(10, 10, None)).unwrap();
    assert!(text.starts_with(
        "This is an auto-continuation prompt for handsoff mode, it is currently 10/10 continuations."
    ));
}

#[test]
fn prompt_carries_stop_command_and_session() {
    let text = continuation_prompt(Workflow::UltraPlanner, &ctx(1, 10, None)).unwrap();
    assert!(text.contains("jq '.state = \"done\"' /tmp/store/.tmp/hooked-sessions/sess-1.json"));
    assert!(text.contains("sess-1"));
}

#[test]
fn sync_master_prompt_names_pr() {
    let known = continuation_prompt(Workflow::SyncMaster, &ctx(1, 5, Some(17))).unwrap();
    assert!(known.contains("Confirm the PR number: 17"));
    let unknown = continuation_prompt(Workflow::SyncMaster, &ctx(1, 5, None)).unwrap();
    assert!(unknown.contains("Confirm the PR number: unknown"));
}

#[test]
fn every_triggerable_workflow_has_a_prompt() {
    for workflow in Workflow::TRIGGERABLE {
        assert!(continuation_prompt(workflow, &ctx(1, 3, None)).is_some(), "{workflow}");
    }
    assert!(continuation_prompt(Workflow::Unrecognized, &ctx(1, 3, None)).is_none());
}
