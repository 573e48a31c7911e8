//! Unit tests for the issue-to-session index.

use agentize_fleet::models::issue_index::IssueIndexEntry;
use agentize_fleet::models::session::Workflow;
use agentize_fleet::persistence::issue_index_repo::IssueIndexRepo;
use agentize_fleet::persistence::StorePaths;

#[test]
fn entry_lives_under_by_issue() {
    let temp = tempfile::tempdir().unwrap();
    let repo = IssueIndexRepo::new(StorePaths::new(temp.path()));

    repo.save(42, &IssueIndexEntry::new("s1", Workflow::IssueToImpl))
        .unwrap();

    let path = temp.path().join(".tmp/hooked-sessions/by-issue/42.json");
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(value["session_id"], "s1");
    assert_eq!(value["workflow"], "issue-to-impl");
}

#[test]
fn later_writer_wins() {
    let temp = tempfile::tempdir().unwrap();
    let repo = IssueIndexRepo::new(StorePaths::new(temp.path()));

    repo.save(42, &IssueIndexEntry::new("s1", Workflow::IssueToImpl))
        .unwrap();
    repo.save(42, &IssueIndexEntry::new("s2", Workflow::UltraPlanner))
        .unwrap();

    let entry = repo.load(42).unwrap().unwrap();
    assert_eq!(entry.session_id, "s2");
}

#[test]
fn remove_is_idempotent() {
    let temp = tempfile::tempdir().unwrap();
    let repo = IssueIndexRepo::new(StorePaths::new(temp.path()));
    repo.save(1, &IssueIndexEntry::new("s1", Workflow::IssueToImpl))
        .unwrap();

    repo.remove(1).unwrap();
    repo.remove(1).unwrap();

    assert_eq!(repo.load(1).unwrap(), None);
}
