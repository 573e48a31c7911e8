//! `agentize-hook` process-level behaviour: stdin in, one JSON line out.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

fn run_hook(event: &str, base: &Path, payload: &str) -> serde_json::Value {
    run_hook_with_env(
        event,
        base,
        payload,
        &[("HANDSOFF_MODE", "1"), ("HANDSOFF_MAX_CONTINUATIONS", "2")],
    )
}

fn run_hook_with_env(
    event: &str,
    base: &Path,
    payload: &str,
    vars: &[(&str, &str)],
) -> serde_json::Value {
    let mut child = Command::new(env!("CARGO_BIN_EXE_agentize-hook"))
        .arg(event)
        .current_dir(base)
        .env_clear()
        .env("AGENTIZE_HOME", base)
        .envs(vars.iter().copied())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn hook");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(payload.as_bytes())
        .expect("write payload");
    let output = child.wait_with_output().expect("hook output");
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).expect("stdout is one JSON document")
}

#[test]
fn prompt_then_stops_until_budget() {
    let temp = tempfile::tempdir().unwrap();
    let base = temp.path();

    let resp = run_hook(
        "prompt-submit",
        base,
        r#"{"conversation_id":"s1","prompt":"/issue-to-impl 42"}"#,
    );
    assert_eq!(resp["continue"], true);

    let first = run_hook("stop", base, r#"{"session_id":"s1"}"#);
    assert_eq!(first["decision"], "block");
    assert!(first["reason"].as_str().unwrap().contains("1/2"));

    let second = run_hook("stop", base, r#"{"session_id":"s1"}"#);
    assert_eq!(second["decision"], "block");

    let third = run_hook("stop", base, r#"{"session_id":"s1"}"#);
    assert_eq!(third["decision"], "allow");
}

#[test]
fn garbage_stdin_still_answers() {
    let temp = tempfile::tempdir().unwrap();

    let resp = run_hook("stop", temp.path(), "this is not json");
    assert_eq!(resp["decision"], "allow");

    let resp = run_hook("prompt-submit", temp.path(), "");
    assert_eq!(resp["continue"], true);
}

#[test]
fn broken_config_file_falls_back_to_environment() {
    let temp = tempfile::tempdir().unwrap();
    std::fs::write(temp.path().join(".agentize.local.toml"), "[bogus\n").unwrap();

    let resp = run_hook(
        "prompt-submit",
        temp.path(),
        r#"{"conversation_id":"s9","prompt":"/ultra-planner x"}"#,
    );
    assert_eq!(resp["continue"], true);
    assert!(temp.path().join(".tmp/hooked-sessions/s9.json").is_file());
}

#[test]
fn invalid_server_settings_do_not_disable_continuation() {
    let temp = tempfile::tempdir().unwrap();
    let base = temp.path();
    std::fs::write(
        base.join(".agentize.local.toml"),
        "[handsoff]\nenabled = true\n\n[server]\nperiod = \"5h\"\n",
    )
    .unwrap();
    let vars = [("AGENTIZE_PERIOD", "soon")];

    let resp = run_hook_with_env(
        "prompt-submit",
        base,
        r#"{"conversation_id":"s5","prompt":"/issue-to-impl 42"}"#,
        &vars,
    );
    assert_eq!(resp["continue"], true);
    assert!(base.join(".tmp/hooked-sessions/s5.json").is_file());

    let stop = run_hook_with_env("stop", base, r#"{"session_id":"s5"}"#, &vars);
    assert_eq!(stop["decision"], "block");
}
