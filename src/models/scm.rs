use serde::{Deserialize, Serialize};

use crate::naming::source_identity;

/// Source location of a library, as resolved by discovery.
///
/// Missing fields deserialize as empty strings; an empty `tag` means
/// discovery could not pin the source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScmInfo {
    /// Repository URL.
    #[serde(rename = "scmURL", default)]
    pub scm_url: String,

    /// Tag or revision to build.
    #[serde(default)]
    pub tag: String,

    /// Sub-directory holding the build, empty for the repository root.
    #[serde(default)]
    pub path: String,

    /// Repository type (`git`, ...).
    #[serde(rename = "scmType", default)]
    pub scm_type: String,
}

impl ScmInfo {
    /// Whether every field is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scm_url.is_empty() && self.tag.is_empty() && self.path.is_empty() && self.scm_type.is_empty()
    }

    /// Whether discovery pinned a tag.
    #[must_use]
    pub fn has_tag(&self) -> bool {
        !self.tag.is_empty()
    }

    /// Deduplication key of this location; see [`source_identity`].
    #[must_use]
    pub fn source_identity(&self) -> String {
        source_identity(&self.scm_url, &self.tag, &self.path)
    }
}
