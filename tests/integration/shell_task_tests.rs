//! `ShellTask` against real `sh` invocations.

#![cfg(unix)]

use agentize_fleet::models::work_item::{Category, UnitOfWork};
use agentize_fleet::orchestrator::{ShellTask, TaskRunner};
use agentize_fleet::AppError;

use super::test_helpers::test_config;

fn task(base: &std::path::Path, spawner: &str) -> ShellTask {
    ShellTask::new(&test_config(base, &format!("[spawner]\nshell = \"sh\"\n{spawner}")))
}

#[tokio::test]
async fn pid_line_is_returned() {
    let temp = tempfile::tempdir().unwrap();
    let task = task(temp.path(), "impl = \"echo launching {number}; echo PID: 4242\"\n");

    let pid = task
        .spawn(UnitOfWork::new(Category::Implement, 42))
        .await
        .unwrap();

    assert_eq!(pid, Some(4242));
}

#[tokio::test]
async fn model_flag_reaches_the_command() {
    let temp = tempfile::tempdir().unwrap();
    let out = temp.path().join("args.txt");
    let config = test_config(
        temp.path(),
        &format!(
            "[spawner]\nshell = \"sh\"\nrefine = \"echo {{number}} > {}; true\"\n[workflows.refine]\nmodel = \"opus\"\n",
            out.display()
        ),
    );
    let task = ShellTask::new(&config);

    let pid = task
        .spawn(UnitOfWork::new(Category::Refine, 8))
        .await
        .unwrap();

    assert_eq!(pid, None);
    assert_eq!(std::fs::read_to_string(out).unwrap().trim(), "8");
}

#[tokio::test]
async fn non_zero_exit_is_a_spawn_error() {
    let temp = tempfile::tempdir().unwrap();
    let task = task(temp.path(), "rebase = \"echo nope >&2; exit 3\"\n");

    let err = task
        .spawn(UnitOfWork::new(Category::Rebase, 1))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Spawn(ref msg) if msg.contains("nope")));
}

#[tokio::test]
async fn exists_follows_exit_status() {
    let temp = tempfile::tempdir().unwrap();
    let marker = temp.path().join("wt-42");
    std::fs::create_dir(&marker).unwrap();
    let task = task(
        temp.path(),
        &format!("impl_exists = \"test -d {}/wt-{{number}}\"\n", temp.path().display()),
    );

    assert!(task.exists(UnitOfWork::new(Category::Implement, 42)).await);
    assert!(!task.exists(UnitOfWork::new(Category::Implement, 43)).await);
    // No existence check is configured for refinement.
    assert!(!task.exists(UnitOfWork::new(Category::Refine, 42)).await);
}

#[tokio::test]
async fn state_store_home_is_exported() {
    let temp = tempfile::tempdir().unwrap();
    let task = task(temp.path(), "impl = \"echo PID: $(test -n \\\"$AGENTIZE_HOME\\\" && echo 1 || echo 0)\"\n");

    let pid = task
        .spawn(UnitOfWork::new(Category::Implement, 1))
        .await
        .unwrap();

    assert_eq!(pid, Some(1));
}
