//! Unit tests for launch command rendering and pid parsing.

use agentize_fleet::config::AgentModel;
use agentize_fleet::models::work_item::{Category, UnitOfWork};
use agentize_fleet::orchestrator::task::{parse_pid, render_command};

#[test]
fn number_placeholder_is_substituted() {
    let unit = UnitOfWork::new(Category::Implement, 42);
    assert_eq!(
        render_command("wt spawn {number} --headless", unit, None),
        "wt spawn 42 --headless"
    );
}

#[test]
fn model_flag_is_appended() {
    let unit = UnitOfWork::new(Category::Refine, 5);
    assert_eq!(
        render_command("wt spawn {number} --refine", unit, Some(AgentModel::Sonnet)),
        "wt spawn 5 --refine --model sonnet"
    );
}

#[test]
fn pid_is_read_from_launcher_output() {
    assert_eq!(parse_pid("Spawned worktree issue-42\nPID: 12345\n"), Some(12345));
    assert_eq!(parse_pid("PID 777"), Some(777));
    assert_eq!(parse_pid("started in background"), None);
}
