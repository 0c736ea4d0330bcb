//! `DependencyBuild`: the single shared build of one source location.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::artifact_build::ArtifactBuild;
use super::meta::{ObjectMeta, Resource};
use super::scm::ScmInfo;
use crate::constants::DEPENDENCY_BUILD_ID_LABEL;

/// Lifecycle of a [`DependencyBuild`] as seen by the artifact reconciler.
///
/// The dependency build controller owns this field and may use states this
/// crate does not know about; those round-trip untouched through
/// [`Other`](Self::Other). The `DependencyBuildState` prefix used by older
/// writers is accepted on input.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DependencyBuildState {
    /// Created, not yet picked up.
    #[default]
    New,
    /// Build in progress.
    Building,
    /// Built successfully.
    Complete,
    /// Build failed.
    Failed,
    /// Output found to contain unbuilt upstream artifacts.
    Contaminated,
    /// A state owned by the dependency build controller.
    Other(String),
}

impl DependencyBuildState {
    /// Canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::New => "New",
            Self::Building => "Building",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
            Self::Contaminated => "Contaminated",
            Self::Other(other) => other,
        }
    }
}

impl From<String> for DependencyBuildState {
    fn from(value: String) -> Self {
        let trimmed = value.strip_prefix("DependencyBuildState").unwrap_or(&value);
        match trimmed {
            "" | "New" => Self::New,
            "Building" => Self::Building,
            "Complete" => Self::Complete,
            "Failed" => Self::Failed,
            "Contaminated" => Self::Contaminated,
            _ => Self::Other(value),
        }
    }
}

impl From<DependencyBuildState> for String {
    fn from(state: DependencyBuildState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for DependencyBuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyBuildSpec {
    /// Location being built.
    #[serde(default)]
    pub scm_info: ScmInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyBuildStatus {
    #[serde(default)]
    pub state: DependencyBuildState,

    /// Names of artifact builds whose output contaminates this build.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contaminants: Vec<String>,
}

/// One build of one `(url, tag, path)` source location, shared by every
/// [`ArtifactBuild`] that resolved to it.
///
/// Carries the `dependency-build-id` label (the source identity) and one
/// owner reference per attached artifact build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyBuild {
    pub metadata: ObjectMeta,
    pub spec: DependencyBuildSpec,
    #[serde(default)]
    pub status: DependencyBuildStatus,
}

impl DependencyBuild {
    /// Fresh dependency build for `scm_info`, owned by `owner`.
    ///
    /// The name is generated by the store from `<owner-name>-`.
    #[must_use]
    pub fn for_artifact_build(owner: &ArtifactBuild, scm_info: ScmInfo) -> Self {
        let mut metadata = ObjectMeta::generated(owner.namespace(), format!("{}-", owner.name()))
            .with_label(DEPENDENCY_BUILD_ID_LABEL, scm_info.source_identity());
        metadata.set_owner_reference(owner.owner_reference());
        Self {
            metadata,
            spec: DependencyBuildSpec {
                scm_info,
            },
            status: DependencyBuildStatus::default(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> &DependencyBuildState {
        &self.status.state
    }

    /// Value of the `dependency-build-id` label, if set.
    #[must_use]
    pub fn source_identity(&self) -> Option<&str> {
        self.metadata.labels.get(DEPENDENCY_BUILD_ID_LABEL).map(String::as_str)
    }

    /// Drop every contaminant entry equal to `name`. Returns `true` if any was removed.
    pub fn remove_contaminant(&mut self, name: &str) -> bool {
        let before = self.status.contaminants.len();
        self.status.contaminants.retain(|contaminant| contaminant != name);
        self.status.contaminants.len() != before
    }
}

impl Resource for DependencyBuild {
    const KIND: &'static str = "DependencyBuild";

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scm() -> ScmInfo {
        ScmInfo {
            scm_url: "https://github.com/foo/bar".into(),
            tag: "v1.0".into(),
            path: String::new(),
            scm_type: "git".into(),
        }
    }

    #[test]
    fn test_unknown_state_round_trips() {
        let state = DependencyBuildState::from("DependencyBuildStateAnalyzeBuild".to_string());
        assert_eq!(state, DependencyBuildState::Other("DependencyBuildStateAnalyzeBuild".into()));
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, "\"DependencyBuildStateAnalyzeBuild\"");
    }

    #[test]
    fn test_prefixed_states_parse() {
        assert_eq!(
            DependencyBuildState::from("DependencyBuildStateContaminated".to_string()),
            DependencyBuildState::Contaminated
        );
        assert_eq!(DependencyBuildState::from(String::new()), DependencyBuildState::New);
    }

    #[test]
    fn test_for_artifact_build() {
        let mut abr = ArtifactBuild::new("ns", "org.foo:bar:1.0");
        abr.metadata.uid = "abr-uid".into();

        let db = DependencyBuild::for_artifact_build(&abr, scm());
        assert!(db.metadata.name.is_empty());
        assert_eq!(db.metadata.generate_name, format!("{}-", abr.name()));
        assert_eq!(db.namespace(), "ns");
        assert_eq!(db.source_identity(), Some(scm().source_identity().as_str()));
        assert!(db.metadata.is_owned_by("abr-uid"));
        assert_eq!(db.metadata.owner_references[0].kind, "ArtifactBuild");
    }

    #[test]
    fn test_remove_contaminant_removes_all_matches() {
        let mut db = DependencyBuild::default();
        db.status.contaminants = vec!["a".into(), "b".into(), "a".into()];
        assert!(db.remove_contaminant("a"));
        assert_eq!(db.status.contaminants, vec!["b".to_string()]);
        assert!(!db.remove_contaminant("a"));
    }
}
