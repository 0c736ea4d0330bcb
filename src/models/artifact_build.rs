//! `ArtifactBuild`: one requested library coordinate and its progress.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::dependency_build::DependencyBuildState;
use super::meta::{ObjectMeta, Resource};
use super::scm::ScmInfo;
use crate::constants::CONTAMINATED_BY_ANNOTATION_PREFIX;
use crate::naming::generate_resource_name;

/// Lifecycle of an [`ArtifactBuild`].
///
/// ```text
/// New ──▶ Discovering ──▶ Building ──▶ Complete
///               │             │  ▲
///               ▼             ▼  │ (DependencyBuild vanished: back to New)
///            Missing        Failed
/// ```
///
/// An empty or absent state parses as [`New`](Self::New). State strings from
/// older writers carry an `ArtifactBuild` prefix (`ArtifactBuildComplete`);
/// both spellings parse. Anything else is kept verbatim as
/// [`Unknown`](Self::Unknown) and left alone by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ArtifactBuildState {
    /// Freshly requested; no discovery task yet.
    #[default]
    New,
    /// Discovery task created; waiting for its results.
    Discovering,
    /// Attached to a dependency build; waiting for it to finish.
    Building,
    /// The dependency build completed.
    Complete,
    /// The dependency build failed or was contaminated.
    Failed,
    /// Discovery could not resolve a source tag.
    Missing,
    /// Unrecognized state written by someone else.
    Unknown(String),
}

impl ArtifactBuildState {
    /// Canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::New => "New",
            Self::Discovering => "Discovering",
            Self::Building => "Building",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
            Self::Missing => "Missing",
            Self::Unknown(other) => other,
        }
    }

    /// Whether no further automatic progress happens from this state.
    ///
    /// `Complete` is still reconciled for contamination cleanup but never
    /// transitions anywhere else.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed | Self::Missing)
    }

    /// State an artifact build takes on when its dependency build is in `state`.
    ///
    /// Returns `None` while the dependency build is still in progress.
    #[must_use]
    pub const fn mirror_dependency_state(state: &DependencyBuildState) -> Option<Self> {
        match state {
            DependencyBuildState::Complete => Some(Self::Complete),
            DependencyBuildState::Failed | DependencyBuildState::Contaminated => Some(Self::Failed),
            _ => None,
        }
    }
}

impl From<String> for ArtifactBuildState {
    fn from(value: String) -> Self {
        let trimmed = value.strip_prefix("ArtifactBuild").unwrap_or(&value);
        match trimmed {
            "" | "New" => Self::New,
            "Discovering" => Self::Discovering,
            "Building" => Self::Building,
            "Complete" => Self::Complete,
            "Failed" => Self::Failed,
            "Missing" => Self::Missing,
            _ => Self::Unknown(value),
        }
    }
}

impl From<ArtifactBuildState> for String {
    fn from(state: ArtifactBuildState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for ArtifactBuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactBuildSpec {
    /// `group:artifact:version` coordinate.
    pub gav: String,
}

/// Reconciler-owned progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactBuildStatus {
    /// Current lifecycle state.
    #[serde(default)]
    pub state: ArtifactBuildState,

    /// Source location resolved by discovery.
    #[serde(default, skip_serializing_if = "ScmInfo::is_empty")]
    pub scm_info: ScmInfo,

    /// Diagnostic message reported by discovery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Request to build one library coordinate from source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactBuild {
    /// Object metadata.
    pub metadata: ObjectMeta,
    /// The requested coordinate.
    pub spec: ArtifactBuildSpec,
    /// Progress, written only by the reconciler.
    #[serde(default)]
    pub status: ArtifactBuildStatus,
}

impl ArtifactBuild {
    /// New request for `gav`, named with [`generate_resource_name`].
    pub fn new(namespace: impl Into<String>, gav: impl Into<String>) -> Self {
        let gav = gav.into();
        Self {
            metadata: ObjectMeta::named(namespace, generate_resource_name(&gav)),
            spec: ArtifactBuildSpec {
                gav,
            },
            status: ArtifactBuildStatus::default(),
        }
    }

    /// The requested coordinate.
    #[must_use]
    pub fn gav(&self) -> &str {
        &self.spec.gav
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> &ArtifactBuildState {
        &self.status.state
    }

    /// Names of dependency builds this artifact build is marked as contaminated by.
    pub fn contamination_markers(&self) -> impl Iterator<Item = &str> {
        self.metadata
            .annotations_with_prefix(CONTAMINATED_BY_ANNOTATION_PREFIX)
            .map(|(_, value)| value)
            .filter(|value| !value.is_empty())
    }
}

impl Resource for ArtifactBuild {
    const KIND: &'static str = "ArtifactBuild";

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}
