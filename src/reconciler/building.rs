//! `Building`: follow the shared dependency build until it finishes.

use tracing::{debug, info};

use super::dedup::{current_dependency_build, ensure_owner};
use super::{ArtifactBuildReconciler, ReconcileOutcome};
use crate::core::Result;
use crate::models::{ArtifactBuild, ArtifactBuildState, Resource};
use crate::store::events::reasons;
use crate::store::{Event, ObjectStore};

impl<S: ObjectStore> ArtifactBuildReconciler<S> {
    /// Re-resolve the dependency build from the stored source location.
    ///
    /// If it has vanished the artifact build starts over from `New`.
    pub(super) async fn handle_building(&self, mut abr: ArtifactBuild) -> Result<ReconcileOutcome> {
        let source_identity = abr.status.scm_info.source_identity();
        let Some(build) =
            current_dependency_build(&*self.store, abr.namespace(), &source_identity).await?
        else {
            self.recorder.record(Event::warning(
                &abr,
                reasons::MISSING_DEPENDENCY_BUILD,
                format!("no dependency build with id {source_identity}, restarting discovery"),
            ));
            abr.status.state = ArtifactBuildState::New;
            self.store.update_status(&abr).await?;
            info!(artifact_build = %abr.name(), "dependency build missing, reset to New");
            return Ok(ReconcileOutcome::done());
        };

        let build = ensure_owner(&*self.store, build, &abr).await?;
        match ArtifactBuildState::mirror_dependency_state(build.state()) {
            Some(next) if next != *abr.state() => {
                abr.status.state = next;
                self.store.update_status(&abr).await?;
                info!(
                    artifact_build = %abr.name(),
                    dependency_build = %build.name(),
                    state = %abr.state(),
                    "dependency build finished"
                );
            }
            _ => debug!(dependency_build = %build.name(), state = %build.state(), "still building"),
        }
        Ok(ReconcileOutcome::done())
    }
}
