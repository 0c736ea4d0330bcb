//! Reconcile driver
//!
//! Stands in for a watch-driven work queue: each round reconciles every
//! artifact build of a namespace once, concurrently, and rounds repeat until
//! one of them changes nothing in the store.
//!
//! A reconcile failing with a retryable error (conflict, storage, timeout) is
//! re-run from a fresh read with exponential backoff: 10ms, 20ms, 40ms...
//! capped at 500ms. Requeue delays requested by the reconciler are reported,
//! not slept on.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::Retry;
use tokio_retry::strategy::ExponentialBackoff;
use tracing::{debug, info, warn};

use crate::config::ControllerConfig;
use crate::constants::{
    DEFAULT_CONFLICT_RETRIES, DEFAULT_MAX_PARALLEL, DEFAULT_MAX_ROUNDS, MAX_BACKOFF_DELAY_MS,
    STARTING_BACKOFF_DELAY_MS,
};
use crate::core::Result;
use crate::models::{ArtifactBuild, ObjectKey, Resource};
use crate::reconciler::{ArtifactBuildReconciler, ReconcileOutcome, ReconcilerConfig};
use crate::store::{EventRecorder, LabelSelector, ObjectStore};

/// An artifact build that asked to be looked at again later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requeue {
    pub key: ObjectKey,
    pub after: Duration,
}

/// An artifact build whose reconcile failed after all retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub key: ObjectKey,
    pub error: String,
}

/// Outcome of one round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundReport {
    /// Artifact builds reconciled.
    pub reconciled: usize,
    pub requeues: Vec<Requeue>,
    pub failures: Vec<Failure>,
}

/// Outcome of [`Controller::run_until_settled`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Rounds run.
    pub rounds: usize,
    /// Whether the last round left the store unchanged.
    pub settled: bool,
    /// Reconciles run across all rounds.
    pub reconciles: usize,
    /// Requeues requested in the last round.
    pub requeues: Vec<Requeue>,
    /// Failures in the last round.
    pub failures: Vec<Failure>,
}

/// Bounded, concurrent reconcile loop over one store.
pub struct Controller<S> {
    store: Arc<S>,
    reconciler: ArtifactBuildReconciler<S>,
    max_parallel: usize,
    max_rounds: usize,
    conflict_retries: usize,
}

impl<S: ObjectStore> Controller<S> {
    pub fn new(store: Arc<S>, recorder: Arc<dyn EventRecorder>, config: &ControllerConfig) -> Self {
        let reconciler =
            ArtifactBuildReconciler::new(store.clone(), recorder, ReconcilerConfig::from(config));
        Self {
            store,
            reconciler,
            max_parallel: config.max_parallel.max(1),
            max_rounds: config.max_rounds.max(1),
            conflict_retries: config.conflict_retries,
        }
    }

    /// Controller with default limits around an existing reconciler.
    pub fn with_reconciler(reconciler: ArtifactBuildReconciler<S>) -> Self {
        Self {
            store: reconciler.store().clone(),
            reconciler,
            max_parallel: DEFAULT_MAX_PARALLEL,
            max_rounds: DEFAULT_MAX_ROUNDS,
            conflict_retries: DEFAULT_CONFLICT_RETRIES,
        }
    }

    /// Override the round limit.
    #[must_use]
    pub fn max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    #[must_use]
    pub const fn reconciler(&self) -> &ArtifactBuildReconciler<S> {
        &self.reconciler
    }

    /// Reconcile, re-running from scratch on retryable errors.
    pub async fn reconcile_with_retry(&self, key: &ObjectKey) -> Result<ReconcileOutcome> {
        let strategy = ExponentialBackoff::from_millis(STARTING_BACKOFF_DELAY_MS)
            .factor(2)
            .max_delay(Duration::from_millis(MAX_BACKOFF_DELAY_MS))
            .take(self.conflict_retries);

        // Only retryable errors surface as `Err` to the retry loop; the rest
        // come back as `Ok(Err(_))` and end it.
        let reconciler = &self.reconciler;
        Retry::spawn(strategy, || async move {
            match reconciler.reconcile(key).await {
                Err(error) if error.is_retryable() => {
                    debug!(artifact_build = %key, %error, "retrying reconcile");
                    Err(error)
                }
                other => Ok(other),
            }
        })
        .await
        .and_then(|result| result)
    }

    /// Reconcile every artifact build in `namespace` once.
    pub async fn run_round(&self, namespace: &str) -> Result<RoundReport> {
        let builds: Vec<ArtifactBuild> =
            self.store.list(namespace, &LabelSelector::everything()).await?;
        let keys: Vec<ObjectKey> = builds.iter().map(Resource::key).collect();

        let mut results: Vec<(ObjectKey, Result<ReconcileOutcome>)> = stream::iter(keys)
            .map(|key| async move {
                let result = self.reconcile_with_retry(&key).await;
                (key, result)
            })
            .buffer_unordered(self.max_parallel)
            .collect()
            .await;
        results.sort_by(|(a, _), (b, _)| a.cmp(b));

        let mut report = RoundReport {
            reconciled: results.len(),
            ..RoundReport::default()
        };
        for (key, result) in results {
            match result {
                Ok(ReconcileOutcome {
                    requeue_after: Some(after),
                }) => report.requeues.push(Requeue {
                    key,
                    after,
                }),
                Ok(_) => {}
                Err(error) => {
                    warn!(artifact_build = %key, %error, "reconcile failed");
                    report.failures.push(Failure {
                        key,
                        error: error.to_string(),
                    });
                }
            }
        }
        Ok(report)
    }

    /// Run rounds until one leaves the store revision unchanged, or the round
    /// limit is hit.
    pub async fn run_until_settled(&self, namespace: &str) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        for round in 1..=self.max_rounds {
            let before = self.store.revision();
            let report = self.run_round(namespace).await?;
            let after = self.store.revision();

            summary.rounds = round;
            summary.reconciles += report.reconciled;
            summary.requeues = report.requeues;
            summary.failures = report.failures;
            debug!(round, before, after, "round finished");

            if after == before {
                summary.settled = true;
                break;
            }
        }

        if summary.settled {
            info!(namespace, rounds = summary.rounds, "namespace settled");
        } else {
            warn!(namespace, rounds = summary.rounds, "round limit reached before settling");
        }
        Ok(summary)
    }
}
