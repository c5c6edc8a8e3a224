use std::process::Command;

use assert_cmd::prelude::*;
use serde_json::Value;

fn soulresearch(dir: &std::path::Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("soulresearch"));
    cmd.current_dir(dir)
        .env_remove("SOULRESEARCH_PROVIDER")
        .env_remove("SOULRESEARCH_MODEL")
        .env_remove("OPENAI_API_KEY")
        .env_remove("OPENAI_API_KEYS")
        .env_remove("RUST_LOG");
    cmd
}

fn stdout_json(output: std::process::Output) -> Value {
    let stdout = String::from_utf8(output.stdout).expect("utf8 stdout");
    serde_json::from_str(&stdout).expect("stdout is JSON")
}

#[test]
fn schema_action_lists_tools() {
    let dir = tempfile::tempdir().unwrap();
    let output = soulresearch(dir.path())
        .args(["schema", "action"])
        .assert()
        .success()
        .get_output()
        .clone();
    let schema = stdout_json(output);
    let text = schema.to_string();
    for tool in ["performSearch", "saveFinding", "finishTask", "replan"] {
        assert!(text.contains(tool), "schema is missing {tool}");
    }
}

#[test]
fn schema_plan_describes_search_queries() {
    let dir = tempfile::tempdir().unwrap();
    let output = soulresearch(dir.path())
        .args(["--output", "json", "schema", "plan"])
        .assert()
        .success()
        .get_output()
        .clone();
    let schema = stdout_json(output);
    assert!(schema["properties"]["searchQueries"].is_object());
}

#[test]
fn plan_with_mock_backend_prints_queries() {
    let dir = tempfile::tempdir().unwrap();
    let output = soulresearch(dir.path())
        .args([
            "--output",
            "json",
            "plan",
            "rust async runtimes",
            "--provider",
            "mock",
            "--max-findings",
            "4",
            "--engine",
            "bing",
        ])
        .assert()
        .success()
        .get_output()
        .clone();
    let plan = stdout_json(output);
    let queries = plan["searchQueries"].as_array().expect("queries");
    assert!(!queries.is_empty());
    assert_eq!(queries[0]["query"], "rust async runtimes");
    assert_eq!(queries[0]["engine"], "bing");
    assert_eq!(plan["expectedFindings"], 4);
}

#[test]
fn plan_without_api_key_fails() {
    let dir = tempfile::tempdir().unwrap();
    soulresearch(dir.path())
        .args(["plan", "rust", "--provider", "openai"])
        .assert()
        .failure();
}

#[test]
fn research_rejects_blank_task_before_launching() {
    let dir = tempfile::tempdir().unwrap();
    soulresearch(dir.path())
        .args(["research", "   ", "--provider", "mock"])
        .assert()
        .failure();
}

#[test]
fn config_reads_file_and_env_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("soul.yaml");
    std::fs::write(&path, "research:\n  max_steps: 7\nllm:\n  provider: mock\n").unwrap();

    let output = soulresearch(dir.path())
        .env("SOULRESEARCH_MODEL", "env-model")
        .args(["--output", "json", "--config"])
        .arg(&path)
        .arg("config")
        .assert()
        .success()
        .get_output()
        .clone();
    let config = stdout_json(output);
    assert_eq!(config["research"]["max_steps"], 7);
    assert_eq!(config["research"]["max_findings"], 10);
    assert_eq!(config["llm"]["provider"], "mock");
    assert_eq!(config["llm"]["model"], "env-model");
    assert!(config["llm"].get("api_keys").is_none());
}

#[test]
fn config_set_then_get() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("soul.yaml");

    soulresearch(dir.path())
        .arg("--config")
        .arg(&path)
        .args(["config", "set", "research.performance_mode", "fast"])
        .assert()
        .success();

    let output = soulresearch(dir.path())
        .arg("--config")
        .arg(&path)
        .args(["config", "get", "research.performance_mode"])
        .assert()
        .success()
        .get_output()
        .clone();
    assert_eq!(String::from_utf8(output.stdout).unwrap().trim(), "fast");

    soulresearch(dir.path())
        .arg("--config")
        .arg(&path)
        .args(["config", "validate"])
        .assert()
        .success();
}
