//! Unit tests for notification message formatting.

use std::sync::Arc;

use agentize_fleet::config::{CliOverrides, EnvLookup, FleetConfig, LocalConfigFile};
use agentize_fleet::models::work_item::{Category, UnitOfWork};
use agentize_fleet::notify::{assignment_message, completion_message};

fn config(slug: Option<&str>) -> FleetConfig {
    let raw = slug.map_or_else(String::new, |s| format!("[server]\nrepo_slug = \"{s}\"\n"));
    let file = LocalConfigFile::from_toml_str(&raw).unwrap();
    let env: EnvLookup = Arc::new(|_| None);
    FleetConfig::resolve(file, &CliOverrides::default(), &env).unwrap()
}

#[test]
fn completion_links_issue_and_pr() {
    let msg = completion_message(&config(Some("acme/w")), 2, 42, Some(99));
    assert!(msg.contains("Worker 2 finished issue #42"));
    assert!(msg.contains("https://github.com/acme/w/issues/42"));
    assert!(msg.contains("https://github.com/acme/w/pull/99"));
}

#[test]
fn completion_without_slug_names_numbers() {
    let msg = completion_message(&config(None), 0, 42, Some(99));
    assert!(msg.contains("#42"));
    assert!(msg.contains("PR: #99"));
    assert!(!msg.contains("https://"));
}

#[test]
fn assignment_links_pr_for_pr_categories() {
    let cfg = config(Some("acme/w"));
    let msg = assignment_message(&cfg, UnitOfWork::new(Category::Rebase, 77), Some(1));
    assert!(msg.contains("Worker 1 picked up rebase #77"));
    assert!(msg.contains("/pull/77"));

    let msg = assignment_message(&cfg, UnitOfWork::new(Category::Implement, 42), None);
    assert!(msg.contains("Dispatched impl #42"));
    assert!(msg.contains("/issues/42"));
}
