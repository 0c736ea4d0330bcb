//! Dependency build lookup by source identity.
//!
//! At most one dependency build per source identity is meant to exist, but
//! two artifact builds discovering the same location at the same moment can
//! both create one. Duplicates are never merged; every reader picks the same
//! winner with [`most_recent`].

use tracing::{debug, info};

use crate::constants::DEPENDENCY_BUILD_ID_LABEL;
use crate::core::Result;
use crate::models::{ArtifactBuild, DependencyBuild, Resource};
use crate::store::{LabelSelector, ObjectStore};

/// The candidate created last; equal timestamps go to the greater name.
pub fn most_recent<R: Resource>(candidates: impl IntoIterator<Item = R>) -> Option<R> {
    candidates.into_iter().max_by(|a, b| {
        a.meta()
            .creation_timestamp
            .cmp(&b.meta().creation_timestamp)
            .then_with(|| a.name().cmp(b.name()))
    })
}

/// Every dependency build labelled with `source_identity` in `namespace`.
pub async fn find_dependency_builds<S: ObjectStore>(
    store: &S,
    namespace: &str,
    source_identity: &str,
) -> Result<Vec<DependencyBuild>> {
    store.list(namespace, &LabelSelector::eq(DEPENDENCY_BUILD_ID_LABEL, source_identity)).await
}

/// The authoritative dependency build for `source_identity`, if any.
pub async fn current_dependency_build<S: ObjectStore>(
    store: &S,
    namespace: &str,
    source_identity: &str,
) -> Result<Option<DependencyBuild>> {
    let builds = find_dependency_builds(store, namespace, source_identity).await?;
    if builds.len() > 1 {
        debug!(
            namespace,
            source_identity,
            count = builds.len(),
            "duplicate dependency builds, using the most recent"
        );
    }
    Ok(most_recent(builds))
}

/// Attach `owner` to `build` unless an owner reference with its uid is present.
pub async fn ensure_owner<S: ObjectStore>(
    store: &S,
    mut build: DependencyBuild,
    owner: &ArtifactBuild,
) -> Result<DependencyBuild> {
    if build.metadata.is_owned_by(&owner.metadata.uid) {
        return Ok(build);
    }
    build.metadata.set_owner_reference(owner.owner_reference());
    let updated = store.update(&build).await?;
    info!(
        dependency_build = %updated.name(),
        artifact_build = %owner.name(),
        owners = updated.metadata.owner_references.len(),
        "attached artifact build as owner"
    );
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ObjectMeta;
    use chrono::{TimeZone, Utc};

    fn build(name: &str, secs: Option<i64>) -> DependencyBuild {
        let mut db = DependencyBuild::default();
        db.metadata = ObjectMeta::named("ns", name);
        db.metadata.creation_timestamp = secs.map(|s| Utc.timestamp_opt(s, 0).unwrap());
        db
    }

    #[test]
    fn test_most_recent_picks_latest_timestamp() {
        let winner =
            most_recent(vec![build("a", Some(10)), build("b", Some(30)), build("c", Some(20))]).unwrap();
        assert_eq!(winner.name(), "b");
    }

    #[test]
    fn test_most_recent_breaks_ties_by_name() {
        let forward = most_recent(vec![build("x", Some(5)), build("y", Some(5))]).unwrap();
        let backward = most_recent(vec![build("y", Some(5)), build("x", Some(5))]).unwrap();
        assert_eq!(forward.name(), "y");
        assert_eq!(backward.name(), "y");
    }

    #[test]
    fn test_most_recent_prefers_timestamped_over_missing() {
        let winner = most_recent(vec![build("z", None), build("a", Some(1))]).unwrap();
        assert_eq!(winner.name(), "a");
    }

    #[test]
    fn test_most_recent_of_nothing() {
        assert!(most_recent(Vec::<DependencyBuild>::new()).is_none());
    }
}
