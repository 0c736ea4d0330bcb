//! `New` and `Discovering`: resolve the GAV to a source location and bind the
//! artifact build to the dependency build of that location.

use tracing::{debug, info};

use super::dedup::{current_dependency_build, ensure_owner, most_recent};
use super::{ArtifactBuildReconciler, ReconcileOutcome};
use crate::constants::ARTIFACT_BUILD_ID_LABEL;
use crate::core::Result;
use crate::models::{
    ArtifactBuild, ArtifactBuildState, DependencyBuild, DiscoveryOutcome, DiscoveryTask, Resource,
};
use crate::naming::coordinate_key;
use crate::store::events::reasons;
use crate::store::{Event, LabelSelector, ObjectStore};

impl<S: ObjectStore> ArtifactBuildReconciler<S> {
    /// Start discovery.
    ///
    /// The state is persisted before the task is created. If the create fails
    /// the build sits in `Discovering` without a task, which the next
    /// reconcile reports and requeues.
    pub(super) async fn handle_new(&self, mut abr: ArtifactBuild) -> Result<ReconcileOutcome> {
        let task = DiscoveryTask::for_artifact_build(&abr, self.config.discovery_task.clone());

        abr.status.state = ArtifactBuildState::Discovering;
        let abr = self.store.update_status(&abr).await?;

        let task = self.store.create(&task).await?;
        info!(
            artifact_build = %abr.name(),
            discovery_task = %task.name(),
            gav = %abr.gav(),
            "started discovery"
        );
        Ok(ReconcileOutcome::done())
    }

    pub(super) async fn handle_discovering(&self, mut abr: ArtifactBuild) -> Result<ReconcileOutcome> {
        let selector = LabelSelector::eq(ARTIFACT_BUILD_ID_LABEL, coordinate_key(abr.gav()));
        let tasks: Vec<DiscoveryTask> = self.store.list(abr.namespace(), &selector).await?;

        let Some(task) = most_recent(tasks) else {
            self.recorder.record(Event::warning(
                &abr,
                reasons::MISSING_TASK_LINK,
                format!("no discovery task found for {}", abr.gav()),
            ));
            return Ok(ReconcileOutcome::requeue_after(self.config.missing_task_requeue));
        };

        if !task.is_complete() {
            debug!(discovery_task = %task.name(), "discovery still running");
            return Ok(ReconcileOutcome::done());
        }

        let DiscoveryOutcome {
            scm_info,
            message,
        } = task.outcome();
        abr.status.scm_info = scm_info;
        abr.status.message = message;

        if !abr.status.scm_info.has_tag() {
            self.recorder.record(Event::warning(
                &abr,
                reasons::MISSING_TAG,
                format!("discovery of {} did not resolve a source tag", abr.gav()),
            ));
            abr.status.state = ArtifactBuildState::Missing;
            self.store.update_status(&abr).await?;
            info!(artifact_build = %abr.name(), "no source tag, marked Missing");
            return Ok(ReconcileOutcome::done());
        }

        let source_identity = abr.status.scm_info.source_identity();
        match current_dependency_build(&*self.store, abr.namespace(), &source_identity).await? {
            None => {
                // Build first, status second: a retry must find this build.
                let build = DependencyBuild::for_artifact_build(&abr, abr.status.scm_info.clone());
                let build = self.store.create(&build).await?;
                abr.status.state = ArtifactBuildState::Building;
                self.store.update_status(&abr).await?;
                info!(
                    artifact_build = %abr.name(),
                    dependency_build = %build.name(),
                    source_identity = %source_identity,
                    "created dependency build"
                );
            }
            Some(build) => {
                let build = ensure_owner(&*self.store, build, &abr).await?;
                abr.status.state = ArtifactBuildState::mirror_dependency_state(build.state())
                    .unwrap_or(ArtifactBuildState::Building);
                self.store.update_status(&abr).await?;
                info!(
                    artifact_build = %abr.name(),
                    dependency_build = %build.name(),
                    state = %abr.state(),
                    "joined existing dependency build"
                );
            }
        }
        Ok(ReconcileOutcome::done())
    }
}
