//! `ArtifactBuild` reconciliation
//!
//! [`ArtifactBuildReconciler::reconcile`] is level-triggered: every call
//! re-reads the artifact build, dispatches on its state and performs at most
//! one step of progress. Nothing is remembered between calls, so a call can be
//! repeated or interrupted at any point; every write is either idempotent or
//! guarded by the store's resource-version check.
//!
//! # States
//!
//! | State | Handler | Progress |
//! |-------|---------|----------|
//! | `New` | `discovery` | create a discovery task, move to `Discovering` |
//! | `Discovering` | `discovery` | read task results; find or create the dependency build |
//! | `Building` | `building` | follow the dependency build to `Complete` / `Failed` |
//! | `Complete` | `contamination` | clear this build from contaminated dependency builds |
//! | `Failed`, `Missing` | - | nothing |
//!
//! Store conflicts and timeouts are returned to the caller, which retries the
//! whole reconcile from a fresh read.

mod building;
mod contamination;
pub mod dedup;
mod discovery;


use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::config::ControllerConfig;
use crate::constants::{
    DEFAULT_DISCOVERY_TASK_KIND, DEFAULT_DISCOVERY_TASK_NAME, default_missing_task_requeue,
    default_reconcile_timeout,
};
use crate::core::{JbsError, Result};
use crate::models::{ArtifactBuild, ArtifactBuildState, ObjectKey, TaskRef};
use crate::store::{EventRecorder, ObjectStore};

/// Knobs of a single reconcile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Budget for one reconcile, after which it fails with a retryable timeout.
    pub reconcile_timeout: Duration,
    /// Requeue delay when a `Discovering` build has no visible discovery task.
    pub missing_task_requeue: Duration,
    /// Task definition run by new discovery tasks.
    pub discovery_task: TaskRef,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            reconcile_timeout: default_reconcile_timeout(),
            missing_task_requeue: default_missing_task_requeue(),
            discovery_task: TaskRef {
                name: DEFAULT_DISCOVERY_TASK_NAME.to_string(),
                kind: DEFAULT_DISCOVERY_TASK_KIND.to_string(),
            },
        }
    }
}

impl From<&ControllerConfig> for ReconcilerConfig {
    fn from(config: &ControllerConfig) -> Self {
        Self {
            reconcile_timeout: config.reconcile_timeout(),
            missing_task_requeue: config.missing_task_requeue(),
            discovery_task: TaskRef {
                name: config.discovery_task_name.clone(),
                kind: config.discovery_task_kind.clone(),
            },
        }
    }
}

/// Result of a successful reconcile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Reconcile again after this delay even if nothing changes.
    pub requeue_after: Option<Duration>,
}

impl ReconcileOutcome {
    /// Nothing more to do until the object changes.
    #[must_use]
    pub const fn done() -> Self {
        Self {
            requeue_after: None,
        }
    }

    /// Look again after `delay`.
    #[must_use]
    pub const fn requeue_after(delay: Duration) -> Self {
        Self {
            requeue_after: Some(delay),
        }
    }
}

/// Drives [`ArtifactBuild`]s through their lifecycle.
pub struct ArtifactBuildReconciler<S> {
    store: Arc<S>,
    recorder: Arc<dyn EventRecorder>,
    config: ReconcilerConfig,
}

impl<S: ObjectStore> ArtifactBuildReconciler<S> {
    pub fn new(store: Arc<S>, recorder: Arc<dyn EventRecorder>, config: ReconcilerConfig) -> Self {
        Self {
            store,
            recorder,
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    #[must_use]
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Run one reconcile of the artifact build at `key`.
    ///
    /// A missing artifact build is not an error. Exceeding the configured
    /// budget yields [`JbsError::ReconcileTimeout`].
    #[instrument(skip(self, key), fields(namespace = %key.namespace, artifact_build = %key.name))]
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<ReconcileOutcome> {
        let budget = self.config.reconcile_timeout;
        tokio::time::timeout(budget, self.reconcile_once(key)).await.map_err(|_| {
            JbsError::ReconcileTimeout {
                namespace: key.namespace.clone(),
                name: key.name.clone(),
                timeout_secs: budget.as_secs(),
            }
        })?
    }

    async fn reconcile_once(&self, key: &ObjectKey) -> Result<ReconcileOutcome> {
        let abr = match self.store.get::<ArtifactBuild>(&key.namespace, &key.name).await {
            Ok(abr) => abr,
            Err(e) if e.is_not_found() => {
                debug!("artifact build no longer exists");
                return Ok(ReconcileOutcome::done());
            }
            Err(e) => return Err(e),
        };

        debug!(state = %abr.state(), "reconciling");
        match abr.state().clone() {
            ArtifactBuildState::New => self.handle_new(abr).await,
            ArtifactBuildState::Discovering => self.handle_discovering(abr).await,
            ArtifactBuildState::Building => self.handle_building(abr).await,
            ArtifactBuildState::Complete => self.handle_complete(abr).await,
            ArtifactBuildState::Failed | ArtifactBuildState::Missing => Ok(ReconcileOutcome::done()),
            ArtifactBuildState::Unknown(state) => {
                debug!(%state, "unrecognized state, leaving untouched");
                Ok(ReconcileOutcome::done())
            }
        }
    }
}
