//! Typed objects held in the object store
//!
//! - [`ArtifactBuild`] - one per requested GAV, driven by the reconciler
//! - [`DependencyBuild`] - one per source identity, shared by many artifact builds
//! - [`DiscoveryTask`] - resolves a GAV to an [`ScmInfo`]
//!
//! Every kind implements [`Resource`] and serializes as
//! `{ metadata, spec, status }` with camelCase field names.

mod artifact_build;
mod dependency_build;
mod discovery_task;
mod meta;
mod scm;

pub use artifact_build::{ArtifactBuild, ArtifactBuildSpec, ArtifactBuildState, ArtifactBuildStatus};
pub use dependency_build::{
    DependencyBuild, DependencyBuildSpec, DependencyBuildState, DependencyBuildStatus,
};
pub use discovery_task::{
    DiscoveryOutcome, DiscoveryTask, DiscoveryTaskSpec, DiscoveryTaskStatus, Param, TaskRef,
    TaskResult,
};
pub use meta::{ObjectKey, ObjectMeta, OwnerReference, Resource};
pub use scm::ScmInfo;
