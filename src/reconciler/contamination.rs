//! `Complete`: contamination cleanup.
//!
//! A completed artifact build annotated `contaminated-by-<N> = <build>` has
//! been rebuilt cleanly, so it is no longer an outstanding contaminant of
//! `<build>`. The build pipeline sets `Contaminated` and the contaminant list;
//! this side only ever removes entries.

use tracing::{debug, info};

use super::{ArtifactBuildReconciler, ReconcileOutcome};
use crate::core::Result;
use crate::models::{ArtifactBuild, DependencyBuild, DependencyBuildState, Resource};
use crate::store::events::reasons;
use crate::store::{Event, ObjectStore};

impl<S: ObjectStore> ArtifactBuildReconciler<S> {
    pub(super) async fn handle_complete(&self, abr: ArtifactBuild) -> Result<ReconcileOutcome> {
        let markers: Vec<String> = abr.contamination_markers().map(str::to_string).collect();

        for build_name in markers {
            let mut build =
                match self.store.get::<DependencyBuild>(abr.namespace(), &build_name).await {
                    Ok(build) => build,
                    Err(e) if e.is_not_found() => {
                        self.recorder.record(Event::normal(
                            &abr,
                            reasons::CANNOT_GET_DEPENDENCY_BUILD,
                            format!("contaminated dependency build {build_name} not found"),
                        ));
                        continue;
                    }
                    Err(e) => return Err(e),
                };

            if *build.state() != DependencyBuildState::Contaminated {
                debug!(dependency_build = %build_name, state = %build.state(), "not contaminated");
                continue;
            }

            if build.remove_contaminant(abr.name()) {
                let build = self.store.update_status(&build).await?;
                info!(
                    artifact_build = %abr.name(),
                    dependency_build = %build.name(),
                    remaining = build.status.contaminants.len(),
                    "cleared contaminant"
                );
            }
        }
        Ok(ReconcileOutcome::done())
    }
}
