//! Object metadata and ownership references shared by every stored kind.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::API_VERSION;

/// Identity and bookkeeping fields of a stored object.
///
/// `uid`, `resource_version` and `creation_timestamp` are owned by the store:
/// callers leave them empty on create and must send back the
/// `resource_version` they read when updating.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Object name, unique per kind and namespace.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Prefix used by the store to generate a name when `name` is empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub generate_name: String,

    /// Namespace the object lives in.
    #[serde(default)]
    pub namespace: String,

    /// Store-assigned unique identifier.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,

    /// Store-assigned version used for compare-and-set updates.
    #[serde(default)]
    pub resource_version: u64,

    /// Store-assigned creation time; the tie-break key for duplicate lookups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,

    /// Indexing labels (equality-queryable).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Free-form annotations.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    /// Objects this one depends on for its lifetime.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
}

impl ObjectMeta {
    /// Metadata for an object with a fixed name.
    pub fn named(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// Metadata for an object whose name the store generates from `prefix`.
    pub fn generated(namespace: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            generate_name: prefix.into(),
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// Builder-style label insertion.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Builder-style annotation insertion.
    #[must_use]
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Whether an owner reference with this uid is present.
    #[must_use]
    pub fn is_owned_by(&self, uid: &str) -> bool {
        self.owner_references.iter().any(|owner| owner.uid == uid)
    }

    /// Add or refresh an owner reference.
    ///
    /// A reference to the same kind and name is replaced (its uid may have
    /// changed if the owner was recreated); otherwise the reference is
    /// appended. Returns `true` if the metadata changed.
    pub fn set_owner_reference(&mut self, owner: OwnerReference) -> bool {
        if let Some(existing) = self
            .owner_references
            .iter_mut()
            .find(|existing| existing.kind == owner.kind && existing.name == owner.name)
        {
            if *existing == owner {
                return false;
            }
            *existing = owner;
            return true;
        }
        self.owner_references.push(owner);
        true
    }

    /// Annotations whose key starts with `prefix`, in key order.
    pub fn annotations_with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.annotations
            .iter()
            .filter(move |(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

/// Back-reference from a dependent object to one of its owners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    /// API group/version of the owner.
    pub api_version: String,
    /// Kind of the owner.
    pub kind: String,
    /// Name of the owner.
    pub name: String,
    /// Uid of the owner; the identity used for "already owned" checks.
    pub uid: String,
}

/// Namespace + name pair addressing one object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    /// Namespace of the object.
    pub namespace: String,
    /// Name of the object.
    pub name: String,
}

impl ObjectKey {
    /// Build a key.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A kind of object the store can hold.
///
/// Implementors serialize as `{ metadata, spec, status }`; the store relies on
/// those three top-level keys to keep spec and status writes apart.
pub trait Resource: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Kind name, used in errors, events and owner references.
    const KIND: &'static str;

    /// Object metadata.
    fn meta(&self) -> &ObjectMeta;

    /// Mutable object metadata.
    fn meta_mut(&mut self) -> &mut ObjectMeta;

    /// Object name.
    fn name(&self) -> &str {
        &self.meta().name
    }

    /// Object namespace.
    fn namespace(&self) -> &str {
        &self.meta().namespace
    }

    /// Namespace + name key.
    fn key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace(), self.name())
    }

    /// Owner reference pointing at this object.
    fn owner_reference(&self) -> OwnerReference {
        OwnerReference {
            api_version: API_VERSION.to_string(),
            kind: Self::KIND.to_string(),
            name: self.name().to_string(),
            uid: self.meta().uid.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(name: &str, uid: &str) -> OwnerReference {
        OwnerReference {
            api_version: API_VERSION.to_string(),
            kind: "ArtifactBuild".to_string(),
            name: name.to_string(),
            uid: uid.to_string(),
        }
    }

    #[test]
    fn test_set_owner_reference_is_idempotent() {
        let mut meta = ObjectMeta::named("ns", "db");
        assert!(meta.set_owner_reference(owner("a", "uid-a")));
        assert!(!meta.set_owner_reference(owner("a", "uid-a")));
        assert!(meta.set_owner_reference(owner("b", "uid-b")));
        assert_eq!(meta.owner_references.len(), 2);
        assert!(meta.is_owned_by("uid-a"));
        assert!(meta.is_owned_by("uid-b"));
    }

    #[test]
    fn test_set_owner_reference_refreshes_uid_of_recreated_owner() {
        let mut meta = ObjectMeta::named("ns", "db");
        meta.set_owner_reference(owner("a", "uid-old"));
        assert!(meta.set_owner_reference(owner("a", "uid-new")));
        assert_eq!(meta.owner_references.len(), 1);
        assert!(meta.is_owned_by("uid-new"));
        assert!(!meta.is_owned_by("uid-old"));
    }

    #[test]
    fn test_annotations_with_prefix() {
        let meta = ObjectMeta::named("ns", "abr")
            .with_annotation("contaminated-by-1", "db-one")
            .with_annotation("contaminated-by-0", "db-zero")
            .with_annotation("unrelated", "x");
        let found: Vec<_> = meta.annotations_with_prefix("contaminated-by-").collect();
        assert_eq!(found, vec![("contaminated-by-0", "db-zero"), ("contaminated-by-1", "db-one")]);
    }

    #[test]
    fn test_meta_serializes_camel_case() {
        let meta = ObjectMeta::generated("ns", "bar-").with_label("dependency-build-id", "abc");
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["generateName"], "bar-");
        assert_eq!(json["labels"]["dependency-build-id"], "abc");
        assert!(json.get("ownerReferences").is_none());
    }
}
