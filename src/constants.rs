//! Global constants used throughout the controller.
//!
//! Label keys, annotation prefixes, discovery result names and the default
//! timings live here so the reconciler, the store fixtures and the CLI agree
//! on a single spelling.

use std::time::Duration;

/// Label placed on discovery tasks; value is the coordinate key of the GAV.
pub const ARTIFACT_BUILD_ID_LABEL: &str = "artifact-build-id";

/// Label placed on dependency builds; value is the source identity hash.
pub const DEPENDENCY_BUILD_ID_LABEL: &str = "dependency-build-id";

/// Marker label placed on every discovery task created by the reconciler.
pub const TASK_RUN_LABEL: &str = "taskrun";

/// Annotation prefix on artifact builds naming a dependency build they contaminated.
///
/// The full key is `contaminated-by-<N>`; the value is the dependency build name.
pub const CONTAMINATED_BY_ANNOTATION_PREFIX: &str = "contaminated-by-";

/// Name of the single parameter passed to a discovery task.
pub const GAV_PARAM: &str = "GAV";

/// Discovery task result: SCM repository URL.
pub const TASK_RESULT_SCM_URL: &str = "scm-url";

/// Discovery task result: SCM tag.
pub const TASK_RESULT_SCM_TAG: &str = "scm-tag";

/// Discovery task result: SCM type (usually `git`).
pub const TASK_RESULT_SCM_TYPE: &str = "scm-type";

/// Discovery task result: path of the build context inside the repository.
pub const TASK_RESULT_CONTEXT_PATH: &str = "context";

/// Discovery task result: free-form diagnostic message.
pub const TASK_RESULT_MESSAGE: &str = "message";

/// API group/version stamped on owner references.
pub const API_VERSION: &str = "jvmbuildservice.io/v1alpha1";

/// Default name of the discovery task definition.
pub const DEFAULT_DISCOVERY_TASK_NAME: &str = "lookup-artifact-location";

/// Default kind of the discovery task definition.
pub const DEFAULT_DISCOVERY_TASK_KIND: &str = "ClusterTask";

/// Infix used when generating discovery task names: `<abr>-scm-discovery-<suffix>`.
pub const DISCOVERY_TASK_NAME_INFIX: &str = "-scm-discovery-";

/// Length of the random suffix appended to `generateName` prefixes.
pub const GENERATED_NAME_SUFFIX_LEN: usize = 5;

/// Number of SHA-1 hex characters appended to generated artifact build names.
pub const RESOURCE_NAME_HASH_LEN: usize = 8;

/// Default namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Upper bound on a single reconciliation (300 seconds).
///
/// A reconcile that exceeds this budget is abandoned and surfaces a retryable
/// timeout error.
pub fn default_reconcile_timeout() -> Duration {
    Duration::from_secs(300)
}

/// Delay before re-checking an artifact build whose discovery task is not yet visible.
pub fn default_missing_task_requeue() -> Duration {
    Duration::from_secs(60)
}

/// Starting delay for exponential backoff when a reconcile hits a conflict (10ms).
pub const STARTING_BACKOFF_DELAY_MS: u64 = 10;

/// Maximum backoff delay between conflict retries (500ms).
pub const MAX_BACKOFF_DELAY_MS: u64 = 500;

/// Default bound on concurrently running reconciles in one driver round.
pub const DEFAULT_MAX_PARALLEL: usize = 10;

/// Default bound on driver rounds before giving up on convergence.
pub const DEFAULT_MAX_ROUNDS: usize = 25;

/// Default number of retries of a reconcile that failed with a retryable error.
pub const DEFAULT_CONFLICT_RETRIES: usize = 5;
