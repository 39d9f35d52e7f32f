//! CLI E2E tests.
//!
//! Each test runs the built binary against its own data directory, so
//! timer state persists across invocations exactly as it would between
//! separate shell commands.

use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(data_dir: &TempDir, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_studytrack"))
        .args(args)
        .env("STUDYTRACK_DATA_DIR", data_dir.path())
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

/// Run a CLI command, expect success, and parse every JSON document printed.
fn run_json(data_dir: &TempDir, args: &[&str]) -> Vec<Value> {
    let (code, stdout, stderr) = run_cli(data_dir, args);
    assert_eq!(code, 0, "CLI command failed: {args:?}\n{stderr}");
    serde_json::Deserializer::from_str(&stdout)
        .into_iter::<Value>()
        .collect::<Result<_, _>>()
        .expect("Failed to parse JSON output")
}

fn last(docs: &[Value]) -> &Value {
    docs.last().expect("expected JSON output")
}

#[test]
fn config_list_shows_defaults() {
    let dir = TempDir::new().unwrap();
    let docs = run_json(&dir, &["config", "list"]);
    let cfg = last(&docs);
    assert_eq!(cfg["tools"]["pomodoro"]["work_secs"], 1500);
    assert_eq!(cfg["tools"]["eye_rest"]["short_break_secs"], 20);
    assert_eq!(cfg["ticker"]["interval_ms"], 1000);
    assert!(dir.path().join("config.toml").exists());
}

#[test]
fn config_set_then_get() {
    let dir = TempDir::new().unwrap();
    let (code, _, _) = run_cli(&dir, &["config", "set", "tools.pomodoro.work_secs", "3000"]);
    assert_eq!(code, 0);
    let (code, stdout, _) = run_cli(&dir, &["config", "get", "tools.pomodoro.work_secs"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "3000");
}

#[test]
fn config_rejects_unknown_key() {
    let dir = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(&dir, &["config", "get", "tools.nope"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("unknown config key: tools.nope"));
    let (code, _, _) = run_cli(&dir, &["config", "set", "tools.nope", "1"]);
    assert_ne!(code, 0);
}

#[test]
fn start_then_status_reports_running_work() {
    let dir = TempDir::new().unwrap();
    let started = run_json(&dir, &["timer", "start"]);
    assert_eq!(last(&started)["type"], "TimerStarted");
    assert_eq!(last(&started)["duration_ms"], 1_500_000);

    let status = run_json(&dir, &["timer", "status"]);
    let snap = last(&status);
    assert_eq!(snap["type"], "StateSnapshot");
    assert_eq!(snap["status"], "Running");
    assert_eq!(snap["phase"], "work");
    assert_eq!(snap["completed_work_sessions"], 0);
    assert!(snap["remaining_ms"].as_u64().unwrap() <= 1_500_000);
}

#[test]
fn start_twice_is_rejected() {
    let dir = TempDir::new().unwrap();
    run_json(&dir, &["timer", "start"]);
    let (code, _, stderr) = run_cli(&dir, &["timer", "start"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("already running"), "stderr: {stderr}");
}

#[test]
fn pause_and_resume_persist_between_runs() {
    let dir = TempDir::new().unwrap();
    run_json(&dir, &["timer", "start", "--tool", "deep-focus"]);

    let paused = run_json(&dir, &["timer", "pause", "--tool", "deep-focus"]);
    assert_eq!(last(&paused)["type"], "TimerPaused");

    let again = run_json(&dir, &["timer", "pause", "--tool", "deep-focus"]);
    assert_eq!(last(&again)["type"], "StateSnapshot");
    assert_eq!(last(&again)["status"], "Paused");

    let resumed = run_json(&dir, &["timer", "resume", "--tool", "deep-focus"]);
    assert_eq!(last(&resumed)["type"], "TimerResumed");
    assert_eq!(
        last(&resumed)["remaining_ms"],
        last(&paused)["remaining_ms"]
    );
}

#[test]
fn tools_are_independent() {
    let dir = TempDir::new().unwrap();
    run_json(&dir, &["timer", "start"]);
    let status = run_json(&dir, &["timer", "status", "--tool", "eye-rest"]);
    assert_eq!(last(&status)["status"], "Idle");
    assert_eq!(last(&status)["total_ms"], 1_200_000);
}

#[test]
fn skip_to_break_starts_it() {
    let dir = TempDir::new().unwrap();
    run_json(&dir, &["timer", "start"]);
    let skipped = run_json(&dir, &["timer", "skip", "--to", "short-break"]);
    let event = last(&skipped);
    assert_eq!(event["type"], "PhaseChanged");
    assert_eq!(event["from"], "work");
    assert_eq!(event["to"], "short_break");
    assert_eq!(event["completed_work_sessions"], 0);
    assert_eq!(event["started"], true);

    let status = run_json(&dir, &["timer", "status"]);
    assert_eq!(last(&status)["phase"], "short_break");
}

#[test]
fn counted_skip_increments_sessions() {
    let dir = TempDir::new().unwrap();
    let skipped = run_json(&dir, &["timer", "skip", "--count"]);
    assert_eq!(last(&skipped)["completed_work_sessions"], 1);
    assert_eq!(last(&skipped)["to"], "short_break");
}

#[test]
fn reset_cycle_returns_to_work() {
    let dir = TempDir::new().unwrap();
    run_json(&dir, &["timer", "skip", "--count"]);
    let reset = run_json(&dir, &["timer", "reset", "--cycle"]);
    assert_eq!(last(&reset)["type"], "TimerReset");
    let status = run_json(&dir, &["timer", "status"]);
    assert_eq!(last(&status)["status"], "Idle");
    assert_eq!(last(&status)["phase"], "work");
    assert_eq!(last(&status)["completed_work_sessions"], 0);
}

#[test]
fn meditation_completes_and_is_recorded() {
    let dir = TempDir::new().unwrap();
    run_json(&dir, &["timer", "start", "--tool", "meditation", "--secs", "0"]);

    let status = run_json(&dir, &["timer", "status", "--tool", "meditation"]);
    assert_eq!(status.len(), 2);
    assert_eq!(status[0]["type"], "TimerCompleted");
    assert_eq!(status[1]["status"], "Completed");

    let again = run_json(&dir, &["timer", "status", "--tool", "meditation"]);
    assert_eq!(again.len(), 1);

    let stats = run_json(&dir, &["stats", "all"]);
    assert_eq!(last(&stats)["total_sessions"], 1);
    assert_eq!(last(&stats)["work_sessions"], 0);
}

#[test]
fn meditation_rejects_skip_and_pomodoro_rejects_secs() {
    let dir = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(&dir, &["timer", "skip", "--tool", "meditation"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("no phases"));

    let (code, _, stderr) = run_cli(&dir, &["timer", "start", "--secs", "10"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("--secs"));
}

#[test]
fn watch_runs_short_countdown_to_completion() {
    let dir = TempDir::new().unwrap();
    for (key, value) in [("ticker.interval_ms", "10"), ("tools.meditation.duration_secs", "1")] {
        let (code, _, stderr) = run_cli(&dir, &["config", "set", key, value]);
        assert_eq!(code, 0, "{stderr}");
    }

    let docs = run_json(&dir, &["timer", "watch", "--tool", "meditation"]);
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0]["type"], "TimerStarted");
    assert_eq!(docs[1]["type"], "TimerCompleted");

    let stats = run_json(&dir, &["stats", "recent", "--limit", "1"]);
    assert_eq!(last(&stats)[0]["tool"], "meditation");
    assert_eq!(last(&stats)[0]["duration_secs"], 1);
}
