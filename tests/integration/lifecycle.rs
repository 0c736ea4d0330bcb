use std::sync::Arc;

use jbs_controller::config::ControllerConfig;
use jbs_controller::controller::Controller;
use jbs_controller::models::{
    ArtifactBuild, ArtifactBuildState, DependencyBuild, DependencyBuildState, Resource,
};
use jbs_controller::naming::{coordinate_key, generate_resource_name, source_identity};
use jbs_controller::reconciler::{ArtifactBuildReconciler, ReconcilerConfig};
use jbs_controller::store::events::reasons;
use jbs_controller::store::{InMemoryStore, LabelSelector, ObjectStore, StoreSnapshot};
use jbs_controller::test_utils::{TEST_NAMESPACE, TestHarness, init_test_logging, scm};

fn controller_for(h: &TestHarness) -> Controller<InMemoryStore> {
    Controller::with_reconciler(ArtifactBuildReconciler::new(
        h.store.clone(),
        h.recorder.clone(),
        ReconcilerConfig::default(),
    ))
}

/// A single request travels New -> Discovering -> Building -> Complete.
#[tokio::test]
async fn test_single_request_lifecycle() {
    let h = TestHarness::new();
    let controller = controller_for(&h);
    let repo = scm("https://github.com/foo/bar.git", "bar-1.2.3", "");

    let abr = h.request("org.foo:bar:1.2.3").await;
    assert!(abr.name().starts_with("bar.1.2.3-"));
    assert_eq!(abr.name(), generate_resource_name("org.foo:bar:1.2.3"));

    controller.run_until_settled(TEST_NAMESPACE).await.unwrap();
    assert_eq!(h.state_of(&abr).await, ArtifactBuildState::Discovering);

    let tasks = h.discovery_tasks(&abr).await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].metadata.labels["artifact-build-id"], coordinate_key("org.foo:bar:1.2.3"));

    h.complete_discovery(&abr, &repo).await;
    controller.run_until_settled(TEST_NAMESPACE).await.unwrap();
    assert_eq!(h.state_of(&abr).await, ArtifactBuildState::Building);

    let builds = h.dependency_builds(&repo).await;
    assert_eq!(builds.len(), 1);
    assert_eq!(
        builds[0].metadata.labels["dependency-build-id"],
        source_identity("https://github.com/foo/bar.git", "bar-1.2.3", "")
    );

    h.set_build_state(builds[0].name(), DependencyBuildState::Complete, &[]).await;
    let summary = controller.run_until_settled(TEST_NAMESPACE).await.unwrap();
    assert!(summary.settled);
    assert_eq!(h.state_of(&abr).await, ArtifactBuildState::Complete);
}

/// Two coordinates from the same repository and tag share one build.
#[tokio::test]
async fn test_two_gavs_share_one_dependency_build() {
    let h = TestHarness::new();
    let controller = controller_for(&h);
    let repo = scm("https://github.com/foo/multi.git", "v2.0", "");

    let api = h.request("org.foo:multi-api:2.0").await;
    let core = h.request("org.foo:multi-core:2.0").await;
    controller.run_until_settled(TEST_NAMESPACE).await.unwrap();
    h.complete_discovery(&api, &repo).await;
    h.complete_discovery(&core, &repo).await;
    controller.run_until_settled(TEST_NAMESPACE).await.unwrap();

    let builds = h.dependency_builds(&repo).await;
    assert_eq!(builds.len(), 1, "one build per source identity");
    let build = &builds[0];
    assert!(build.metadata.is_owned_by(&api.metadata.uid));
    assert!(build.metadata.is_owned_by(&core.metadata.uid));

    h.set_build_state(build.name(), DependencyBuildState::Failed, &[]).await;
    controller.run_until_settled(TEST_NAMESPACE).await.unwrap();
    assert_eq!(h.state_of(&api).await, ArtifactBuildState::Failed);
    assert_eq!(h.state_of(&core).await, ArtifactBuildState::Failed);
}

/// Different context paths in one repository are different builds.
#[tokio::test]
async fn test_distinct_paths_get_distinct_builds() {
    let h = TestHarness::new();
    let controller = controller_for(&h);
    let client = scm("https://github.com/foo/mono.git", "v1", "client");
    let server = scm("https://github.com/foo/mono.git", "v1", "server");

    let a = h.request("org.foo:client:1").await;
    let b = h.request("org.foo:server:1").await;
    controller.run_until_settled(TEST_NAMESPACE).await.unwrap();
    h.complete_discovery(&a, &client).await;
    h.complete_discovery(&b, &server).await;
    controller.run_until_settled(TEST_NAMESPACE).await.unwrap();

    assert_eq!(h.dependency_builds(&client).await.len(), 1);
    assert_eq!(h.dependency_builds(&server).await.len(), 1);
    let all: Vec<DependencyBuild> =
        h.store.list(TEST_NAMESPACE, &LabelSelector::everything()).await.unwrap();
    assert_eq!(all.len(), 2);
}

/// Discovery without a tag leaves the request Missing with a warning.
#[tokio::test]
async fn test_untagged_source_is_missing() {
    let h = TestHarness::new();
    let controller = controller_for(&h);

    let abr = h.request("org.foo:untagged:0.1").await;
    controller.run_until_settled(TEST_NAMESPACE).await.unwrap();
    h.complete_discovery(&abr, &scm("https://github.com/foo/untagged.git", "", "")).await;
    let summary = controller.run_until_settled(TEST_NAMESPACE).await.unwrap();

    assert!(summary.settled);
    assert_eq!(h.state_of(&abr).await, ArtifactBuildState::Missing);
    assert_eq!(h.recorder.with_reason(reasons::MISSING_TAG).len(), 1);
}

/// Rebuilding a contaminating artifact removes it from the contaminated build.
#[tokio::test]
async fn test_contamination_cleared_after_rebuild() {
    let h = TestHarness::new();
    let controller = controller_for(&h);
    let upstream = scm("https://github.com/foo/upstream.git", "v1", "");
    let downstream = scm("https://github.com/foo/downstream.git", "v3", "");

    // The downstream build pulled in an upstream artifact that was never built
    // from source.
    let lib = h.request("org.foo:upstream-lib:1").await;
    let app = h.request("org.foo:downstream-app:3").await;
    controller.run_until_settled(TEST_NAMESPACE).await.unwrap();
    h.complete_discovery(&app, &downstream).await;
    controller.run_until_settled(TEST_NAMESPACE).await.unwrap();
    let polluted = h.dependency_builds(&downstream).await.remove(0);
    h.set_build_state(polluted.name(), DependencyBuildState::Contaminated, &[lib.name()]).await;

    // The upstream request is marked and then built.
    let mut marked = h.artifact_build(&lib).await;
    marked.metadata.annotations.insert("contaminated-by-0".into(), polluted.name().to_string());
    h.store.update(&marked).await.unwrap();
    h.complete_discovery(&lib, &upstream).await;
    controller.run_until_settled(TEST_NAMESPACE).await.unwrap();
    let lib_build = h.dependency_builds(&upstream).await.remove(0);
    h.set_build_state(lib_build.name(), DependencyBuildState::Complete, &[]).await;

    let summary = controller.run_until_settled(TEST_NAMESPACE).await.unwrap();
    assert!(summary.settled);
    assert_eq!(h.state_of(&lib).await, ArtifactBuildState::Complete);
    assert_eq!(h.state_of(&app).await, ArtifactBuildState::Failed);

    let polluted: DependencyBuild = h.store.get(TEST_NAMESPACE, polluted.name()).await.unwrap();
    assert!(polluted.status.contaminants.is_empty());
}

/// Requests survive a save/load cycle mid-lifecycle.
#[tokio::test]
async fn test_resume_from_state_file() {
    init_test_logging(None);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.yaml");
    let config = ControllerConfig::default();
    let ns = config.namespace.clone();

    let store = Arc::new(InMemoryStore::new());
    store.create(&ArtifactBuild::new(ns.as_str(), "org.foo:bar:1.2.3")).await.unwrap();
    let controller =
        Controller::new(store.clone(), Arc::new(jbs_controller::store::LoggingRecorder), &config);
    controller.run_until_settled(&ns).await.unwrap();
    store.snapshot().unwrap().save(&path).await.unwrap();

    // Finish discovery in the file, the way an external task runner would.
    let mut snapshot = StoreSnapshot::load(&path).await.unwrap();
    assert_eq!(snapshot.discovery_tasks.len(), 1);
    snapshot.discovery_tasks[0].complete_with([("scm-url", "https://example/bar"), ("scm-tag", "v1")]);
    snapshot.save(&path).await.unwrap();

    let resumed = Arc::new(InMemoryStore::from_snapshot(&StoreSnapshot::load(&path).await.unwrap()).unwrap());
    let controller =
        Controller::new(resumed.clone(), Arc::new(jbs_controller::store::LoggingRecorder), &config);
    let summary = controller.run_until_settled(&ns).await.unwrap();
    assert!(summary.settled);

    let builds: Vec<ArtifactBuild> = resumed.list(&ns, &LabelSelector::everything()).await.unwrap();
    assert_eq!(builds[0].state(), &ArtifactBuildState::Building);
    let dbs: Vec<DependencyBuild> = resumed.list(&ns, &LabelSelector::everything()).await.unwrap();
    assert_eq!(dbs.len(), 1);
    assert!(dbs[0].metadata.is_owned_by(&builds[0].metadata.uid));
}
