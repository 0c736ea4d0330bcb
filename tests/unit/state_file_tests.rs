//! Unit tests for the YAML state-file format.

use anyhow::Result;
use tempfile::TempDir;

use jbs_controller::core::JbsError;
use jbs_controller::models::{ArtifactBuildState, DependencyBuildState, Resource};
use jbs_controller::store::{InMemoryStore, LabelSelector, ObjectStore, StoreSnapshot};

const HAND_WRITTEN: &str = r"
artifactBuilds:
  - metadata:
      name: bar.1.2.3-0a1b2c3d
      namespace: default
    spec:
      gav: org.foo:bar:1.2.3
    status:
      state: ArtifactBuildComplete
      scmInfo:
        scmURL: https://example/repo
        tag: v1.2.3
  - metadata:
      name: baz.1.0-11223344
      namespace: default
    spec:
      gav: org.foo:baz:1.0
dependencyBuilds:
  - metadata:
      name: shared
      namespace: default
      labels:
        dependency-build-id: d6c1a2f0
    spec:
      scmInfo:
        scmURL: https://example/repo
        tag: v1.2.3
    status:
      state: DependencyBuildStateContaminated
      contaminants:
        - bar.1.2.3-0a1b2c3d
";

#[tokio::test]
async fn test_hand_written_state_file_loads() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("state.yaml");
    tokio::fs::write(&path, HAND_WRITTEN).await?;

    let snapshot = StoreSnapshot::load(&path).await?;
    assert_eq!(snapshot.artifact_builds.len(), 2);
    assert!(snapshot.discovery_tasks.is_empty());

    let complete = &snapshot.artifact_builds[0];
    assert_eq!(complete.state(), &ArtifactBuildState::Complete);
    assert_eq!(complete.status.scm_info.scm_url, "https://example/repo");
    assert_eq!(snapshot.artifact_builds[1].state(), &ArtifactBuildState::New);

    let build = &snapshot.dependency_builds[0];
    assert_eq!(build.status.state, DependencyBuildState::Contaminated);
    assert_eq!(build.status.contaminants, vec!["bar.1.2.3-0a1b2c3d".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_loaded_objects_get_identity_and_survive_save() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("state.yaml");
    tokio::fs::write(&path, HAND_WRITTEN).await?;

    let store = InMemoryStore::from_snapshot(&StoreSnapshot::load(&path).await?)?;
    let builds: Vec<jbs_controller::models::ArtifactBuild> =
        store.list("default", &LabelSelector::everything()).await?;
    for abr in &builds {
        assert!(!abr.meta().uid.is_empty());
        assert!(abr.meta().creation_timestamp.is_some());
        assert!(abr.meta().resource_version > 0);
    }

    let out = dir.path().join("nested").join("out.yaml");
    store.snapshot()?.save(&out).await?;
    let reloaded = StoreSnapshot::load(&out).await?;
    assert_eq!(reloaded, store.snapshot()?);

    // Saved states use the canonical spelling.
    let text = tokio::fs::read_to_string(&out).await?;
    assert!(text.contains("state: Complete"));
    assert!(text.contains("state: Contaminated"));
    assert!(!dir.path().join("nested").join("out.tmp").exists());
    Ok(())
}

#[tokio::test]
async fn test_missing_state_file_is_empty_only_when_optional() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("absent.yaml");

    assert_eq!(StoreSnapshot::load_or_default(&path).await?, StoreSnapshot::default());
    assert!(StoreSnapshot::load(&path).await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_malformed_state_file_names_the_file() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("broken.yaml");
    tokio::fs::write(&path, "artifactBuilds: {not: [a list").await?;

    match StoreSnapshot::load(&path).await {
        Err(JbsError::StateFileError {
            file,
            ..
        }) => assert!(file.ends_with("broken.yaml")),
        other => panic!("expected StateFileError, got {other:?}"),
    }
    Ok(())
}
