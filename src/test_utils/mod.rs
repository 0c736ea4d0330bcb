//! Test utilities for the controller
//!
//! Fixtures that put an [`InMemoryStore`] into the situations the reconciler
//! has to handle: discovery finishing with a given result, dependency builds
//! created in a chosen order, builds finishing or getting contaminated.
//!
//! # Example
//!
//! ```rust,no_run
//! use jbs_controller::test_utils::{TestHarness, scm};
//!
//! # async fn example() {
//! let harness = TestHarness::new();
//! let abr = harness.request("org.foo:bar:1.0").await;
//! harness.reconcile(&abr).await;
//! harness.complete_discovery(&abr, &scm("https://example/repo", "v1", "")).await;
//! harness.reconcile(&abr).await;
//! # }
//! ```

use chrono::{DateTime, Utc};
use std::sync::{Arc, Once};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::constants::{
    ARTIFACT_BUILD_ID_LABEL, DEPENDENCY_BUILD_ID_LABEL, TASK_RESULT_CONTEXT_PATH,
    TASK_RESULT_SCM_TAG, TASK_RESULT_SCM_TYPE, TASK_RESULT_SCM_URL,
};
use crate::models::{
    ArtifactBuild, ArtifactBuildState, DependencyBuild, DependencyBuildState, DiscoveryTask,
    ObjectMeta, Resource, ScmInfo,
};
use crate::naming::coordinate_key;
use crate::reconciler::dedup::most_recent;
use crate::reconciler::{ArtifactBuildReconciler, ReconcileOutcome, ReconcilerConfig};
use crate::store::{InMemoryStore, LabelSelector, ObjectStore, RecordingRecorder};

/// Namespace used by fixtures.
pub const TEST_NAMESPACE: &str = "test";

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` if given, otherwise
/// `RUST_LOG`; with neither, tests run without a subscriber.
///
/// ```bash
/// RUST_LOG=jbs_controller=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// Build an [`ScmInfo`] for a git location.
#[must_use]
pub fn scm(url: &str, tag: &str, path: &str) -> ScmInfo {
    ScmInfo {
        scm_url: url.to_string(),
        tag: tag.to_string(),
        path: path.to_string(),
        scm_type: "git".to_string(),
    }
}

/// A dependency build for `scm_info` with a fixed name and creation time,
/// ready for [`InMemoryStore::seed`].
#[must_use]
pub fn dependency_build_at(
    name: &str,
    scm_info: &ScmInfo,
    state: DependencyBuildState,
    created: DateTime<Utc>,
) -> DependencyBuild {
    let mut build = DependencyBuild::default();
    build.metadata = ObjectMeta::named(TEST_NAMESPACE, name)
        .with_label(DEPENDENCY_BUILD_ID_LABEL, scm_info.source_identity());
    build.metadata.creation_timestamp = Some(created);
    build.spec.scm_info = scm_info.clone();
    build.status.state = state;
    build
}

/// Store, recorder and reconciler wired together in [`TEST_NAMESPACE`].
pub struct TestHarness {
    pub store: Arc<InMemoryStore>,
    pub recorder: Arc<RecordingRecorder>,
    pub reconciler: ArtifactBuildReconciler<InMemoryStore>,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ReconcilerConfig::default())
    }

    #[must_use]
    pub fn with_config(config: ReconcilerConfig) -> Self {
        init_test_logging(None);
        let store = Arc::new(InMemoryStore::new());
        let recorder = Arc::new(RecordingRecorder::new());
        let reconciler = ArtifactBuildReconciler::new(store.clone(), recorder.clone(), config);
        Self {
            store,
            recorder,
            reconciler,
        }
    }

    /// Create a fresh artifact build request for `gav`.
    pub async fn request(&self, gav: &str) -> ArtifactBuild {
        self.store.create(&ArtifactBuild::new(TEST_NAMESPACE, gav)).await.expect("create artifact build")
    }

    /// Reconcile `abr` once, panicking on error.
    pub async fn reconcile(&self, abr: &ArtifactBuild) -> ReconcileOutcome {
        self.reconciler.reconcile(&abr.key()).await.expect("reconcile")
    }

    /// Current stored form of `abr`.
    pub async fn artifact_build(&self, abr: &ArtifactBuild) -> ArtifactBuild {
        self.store.get(abr.namespace(), abr.name()).await.expect("get artifact build")
    }

    /// Current state of `abr`.
    pub async fn state_of(&self, abr: &ArtifactBuild) -> ArtifactBuildState {
        self.artifact_build(abr).await.status.state
    }

    /// Discovery tasks created for `abr`'s coordinate.
    pub async fn discovery_tasks(&self, abr: &ArtifactBuild) -> Vec<DiscoveryTask> {
        let selector = LabelSelector::eq(ARTIFACT_BUILD_ID_LABEL, coordinate_key(abr.gav()));
        self.store.list(TEST_NAMESPACE, &selector).await.expect("list discovery tasks")
    }

    /// Every dependency build for `scm_info`.
    pub async fn dependency_builds(&self, scm_info: &ScmInfo) -> Vec<DependencyBuild> {
        let selector = LabelSelector::eq(DEPENDENCY_BUILD_ID_LABEL, scm_info.source_identity());
        self.store.list(TEST_NAMESPACE, &selector).await.expect("list dependency builds")
    }

    /// Finish the latest discovery task of `abr` with `scm_info` as its result.
    pub async fn complete_discovery(&self, abr: &ArtifactBuild, scm_info: &ScmInfo) -> DiscoveryTask {
        let mut task =
            most_recent(self.discovery_tasks(abr).await).expect("discovery task should exist");
        task.complete_with([
            (TASK_RESULT_SCM_URL, scm_info.scm_url.as_str()),
            (TASK_RESULT_SCM_TAG, scm_info.tag.as_str()),
            (TASK_RESULT_SCM_TYPE, scm_info.scm_type.as_str()),
            (TASK_RESULT_CONTEXT_PATH, scm_info.path.as_str()),
        ]);
        self.store.update_status(&task).await.expect("complete discovery task")
    }

    /// Set the state of a stored dependency build, the way the build pipeline would.
    pub async fn set_build_state(
        &self,
        name: &str,
        state: DependencyBuildState,
        contaminants: &[&str],
    ) -> DependencyBuild {
        let mut build: DependencyBuild =
            self.store.get(TEST_NAMESPACE, name).await.expect("get dependency build");
        build.status.state = state;
        build.status.contaminants = contaminants.iter().map(|c| (*c).to_string()).collect();
        self.store.update_status(&build).await.expect("update dependency build")
    }

    /// Drive `abr` from `New` to the state following discovery of `scm_info`.
    pub async fn discover(&self, abr: &ArtifactBuild, scm_info: &ScmInfo) -> ArtifactBuildState {
        self.reconcile(abr).await;
        self.complete_discovery(abr, scm_info).await;
        self.reconcile(abr).await;
        self.state_of(abr).await
    }
}
