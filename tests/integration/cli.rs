use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

use jbs_controller::models::{ArtifactBuildState, Resource};
use jbs_controller::naming::{coordinate_key, generate_resource_name, source_identity};
use jbs_controller::store::StoreSnapshot;

/// `jbs` with a private home directory, so no user config is picked up.
fn jbs(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("jbs").unwrap();
    cmd.env("HOME", home).env("NO_COLOR", "1").env_remove("JBS_CONFIG").env_remove("RUST_LOG");
    cmd
}

async fn load(path: &Path) -> StoreSnapshot {
    StoreSnapshot::load(path).await.unwrap()
}

#[test]
fn test_name_prints_name_and_key() {
    let temp = TempDir::new().unwrap();
    jbs(temp.path())
        .args(["name", "org.foo:bar:1.2.3"])
        .assert()
        .success()
        .stdout(predicate::str::contains(generate_resource_name("org.foo:bar:1.2.3")))
        .stdout(predicate::str::contains(coordinate_key("org.foo:bar:1.2.3")))
        .stdout(predicate::str::contains("bar.1.2.3-"));
}

#[test]
fn test_name_json() {
    let temp = TempDir::new().unwrap();
    let output = jbs(temp.path())
        .args(["name", "--json", "org.foo:bar:1.2.3", "org.foo:baz:2.0"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entries = parsed.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1]["gav"], "org.foo:baz:2.0");
    assert_eq!(entries[1]["name"], generate_resource_name("org.foo:baz:2.0"));
    assert_eq!(entries[1]["coordinate_key"], coordinate_key("org.foo:baz:2.0"));
}

#[test]
fn test_source_id() {
    let temp = TempDir::new().unwrap();
    jbs(temp.path())
        .args(["source-id", "--url", "https://example/repo", "--tag", "v1", "--path", "core"])
        .assert()
        .success()
        .stdout(predicate::str::diff(format!(
            "{}\n",
            source_identity("https://example/repo", "v1", "core")
        )));
}

#[tokio::test]
async fn test_request_creates_state_file_and_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let state = temp.path().join("state.yaml");
    let state_arg = state.to_str().unwrap();

    jbs(temp.path())
        .args(["request", state_arg, "org.foo:bar:1.2.3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Requested"));

    let first = load(&state).await;
    assert_eq!(first.artifact_builds.len(), 1);
    let abr = &first.artifact_builds[0];
    assert_eq!(abr.namespace(), "default");
    assert_eq!(abr.name(), generate_resource_name("org.foo:bar:1.2.3"));

    jbs(temp.path())
        .args(["request", state_arg, "org.foo:bar:1.2.3", "org.foo:baz:1.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Exists"));

    let second = load(&state).await;
    assert_eq!(second.artifact_builds.len(), 2);
    let kept = second.artifact_builds.iter().find(|b| b.name() == abr.name()).unwrap();
    assert_eq!(kept.meta().uid, abr.meta().uid);
}

#[tokio::test]
async fn test_reconcile_and_status_through_discovery() {
    let temp = TempDir::new().unwrap();
    let state = temp.path().join("state.yaml");
    let state_arg = state.to_str().unwrap();

    jbs(temp.path()).args(["request", state_arg, "org.foo:bar:1.2.3"]).assert().success();
    jbs(temp.path())
        .args(["reconcile", state_arg])
        .assert()
        .success()
        .stdout(predicate::str::contains("settled"));

    let mut snapshot = load(&state).await;
    assert_eq!(snapshot.artifact_builds[0].state(), &ArtifactBuildState::Discovering);
    assert_eq!(snapshot.discovery_tasks.len(), 1);

    snapshot.discovery_tasks[0].complete_with([("scm-url", "https://example/bar"), ("scm-tag", "v1.2.3")]);
    snapshot.save(&state).await.unwrap();

    jbs(temp.path()).args(["reconcile", state_arg]).assert().success();
    let snapshot = load(&state).await;
    assert_eq!(snapshot.artifact_builds[0].state(), &ArtifactBuildState::Building);
    assert_eq!(snapshot.dependency_builds.len(), 1);

    let output = jbs(temp.path()).args(["status", state_arg, "--json"]).output().unwrap();
    assert!(output.status.success());
    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows[0]["state"], "Building");
    assert_eq!(rows[0]["gav"], "org.foo:bar:1.2.3");
    assert_eq!(rows[0]["scm"], "https://example/bar@v1.2.3");

    jbs(temp.path())
        .args(["status", state_arg])
        .assert()
        .success()
        .stdout(predicate::str::contains("Building"))
        .stdout(predicate::str::contains("https://example/bar@v1.2.3"));
}

#[tokio::test]
async fn test_reconcile_output_leaves_input_untouched() {
    let temp = TempDir::new().unwrap();
    let state = temp.path().join("state.yaml");
    let out = temp.path().join("out.yaml");

    jbs(temp.path())
        .args(["request", state.to_str().unwrap(), "org.foo:bar:1.0"])
        .assert()
        .success();
    let before = std::fs::read_to_string(&state).unwrap();

    jbs(temp.path())
        .args(["reconcile", state.to_str().unwrap(), "--output", out.to_str().unwrap()])
        .assert()
        .success();

    assert_eq!(std::fs::read_to_string(&state).unwrap(), before);
    assert_eq!(load(&out).await.discovery_tasks.len(), 1);
}

#[tokio::test]
async fn test_reconcile_prints_missing_task_event() {
    let temp = TempDir::new().unwrap();
    let state = temp.path().join("state.yaml");
    let state_arg = state.to_str().unwrap();

    jbs(temp.path()).args(["request", state_arg, "org.foo:bar:1.0"]).assert().success();
    let mut snapshot = load(&state).await;
    snapshot.artifact_builds[0].status.state = ArtifactBuildState::Discovering;
    snapshot.save(&state).await.unwrap();

    jbs(temp.path())
        .args(["reconcile", state_arg])
        .assert()
        .success()
        .stdout(predicate::str::contains("Events:"))
        .stdout(predicate::str::contains("MissingTaskLink"))
        .stdout(predicate::str::contains("Requeue"));
}

#[test]
fn test_reconcile_missing_state_file_fails() {
    let temp = TempDir::new().unwrap();
    jbs(temp.path())
        .args(["reconcile", temp.path().join("absent.yaml").to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_explicit_missing_config_fails() {
    let temp = TempDir::new().unwrap();
    let state = temp.path().join("state.yaml");
    jbs(temp.path())
        .args(["request", state.to_str().unwrap(), "org.foo:bar:1.0"])
        .arg("--config")
        .arg(temp.path().join("nope.toml"))
        .assert()
        .failure();
    assert!(!state.exists());
}

#[tokio::test]
async fn test_configured_namespace_is_used() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("jbs.toml");
    std::fs::write(&config, "namespace = \"builds\"\n").unwrap();
    let state = temp.path().join("state.yaml");

    jbs(temp.path())
        .env("JBS_CONFIG", &config)
        .args(["request", state.to_str().unwrap(), "org.foo:bar:1.0"])
        .assert()
        .success();
    assert_eq!(load(&state).await.artifact_builds[0].namespace(), "builds");

    jbs(temp.path())
        .args(["status", state.to_str().unwrap(), "--namespace", "default"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No artifact builds"));
}
