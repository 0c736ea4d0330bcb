//! `DiscoveryTask`: the short-lived job resolving a GAV to a source location.
//!
//! The controller creates these and reads their results; running them is
//! somebody else's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::artifact_build::ArtifactBuild;
use super::meta::{ObjectMeta, Resource};
use super::scm::ScmInfo;
use crate::constants::{
    ARTIFACT_BUILD_ID_LABEL, DISCOVERY_TASK_NAME_INFIX, GAV_PARAM, TASK_RESULT_CONTEXT_PATH,
    TASK_RESULT_MESSAGE, TASK_RESULT_SCM_TAG, TASK_RESULT_SCM_TYPE, TASK_RESULT_SCM_URL,
    TASK_RUN_LABEL,
};
use crate::naming::coordinate_key;

/// Reference to the task definition a discovery task runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRef {
    pub name: String,
    pub kind: String,
}

/// Named string input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub value: String,
}

/// Named string output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryTaskSpec {
    pub task_ref: TaskRef,
    #[serde(default)]
    pub params: Vec<Param>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryTaskStatus {
    /// Set once the task has finished, successfully or not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<TaskResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryTask {
    pub metadata: ObjectMeta,
    pub spec: DiscoveryTaskSpec,
    #[serde(default)]
    pub status: DiscoveryTaskStatus,
}

/// What a completed discovery task reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryOutcome {
    pub scm_info: ScmInfo,
    pub message: Option<String>,
}

impl DiscoveryTask {
    /// Discovery task for `owner`, running `task_ref`.
    ///
    /// Named `<owner>-scm-discovery-<suffix>` by the store, labelled with the
    /// coordinate key of the GAV and the `taskrun` marker, owned by `owner`.
    #[must_use]
    pub fn for_artifact_build(owner: &ArtifactBuild, task_ref: TaskRef) -> Self {
        let mut metadata = ObjectMeta::generated(
            owner.namespace(),
            format!("{}{DISCOVERY_TASK_NAME_INFIX}", owner.name()),
        )
        .with_label(ARTIFACT_BUILD_ID_LABEL, coordinate_key(owner.gav()))
        .with_label(TASK_RUN_LABEL, "");
        metadata.set_owner_reference(owner.owner_reference());

        Self {
            metadata,
            spec: DiscoveryTaskSpec {
                task_ref,
                params: vec![Param {
                    name: GAV_PARAM.to_string(),
                    value: owner.gav().to_string(),
                }],
            },
            status: DiscoveryTaskStatus::default(),
        }
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.status.completion_time.is_some()
    }

    /// Value of the named result; empty values count as absent.
    #[must_use]
    pub fn result(&self, name: &str) -> Option<&str> {
        self.status
            .results
            .iter()
            .find(|result| result.name == name)
            .map(|result| result.value.as_str())
            .filter(|value| !value.is_empty())
    }

    /// Value of the named parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.spec.params.iter().find(|param| param.name == name).map(|param| param.value.as_str())
    }

    /// Read the well-known results into a fresh [`DiscoveryOutcome`].
    #[must_use]
    pub fn outcome(&self) -> DiscoveryOutcome {
        let text = |name: &str| self.result(name).unwrap_or_default().to_string();
        DiscoveryOutcome {
            scm_info: ScmInfo {
                scm_url: text(TASK_RESULT_SCM_URL),
                tag: text(TASK_RESULT_SCM_TAG),
                path: text(TASK_RESULT_CONTEXT_PATH),
                scm_type: text(TASK_RESULT_SCM_TYPE),
            },
            message: self.result(TASK_RESULT_MESSAGE).map(str::to_string),
        }
    }

    /// Mark the task finished with `results`, the way a task runner would.
    pub fn complete_with<I, K, V>(&mut self, results: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.status.completion_time = Some(Utc::now());
        self.status.results = results
            .into_iter()
            .map(|(name, value)| TaskResult {
                name: name.into(),
                value: value.into(),
            })
            .collect();
    }
}

impl Resource for DiscoveryTask {
    const KIND: &'static str = "DiscoveryTask";

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}
