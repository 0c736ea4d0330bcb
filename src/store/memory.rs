//! In-process [`ObjectStore`] backed by a [`DashMap`].
//!
//! Objects are held in their serialized `{ metadata, spec, status }` form so
//! one map serves every kind. Every write draws a fresh resource version from
//! a single store-wide counter; [`ObjectStore::revision`] therefore changes
//! exactly when some object changed, which the driver uses to detect
//! convergence.
//!
//! Writes that change nothing keep the stored resource version, so a
//! reconciler repeating an idempotent write does not look like progress.
//!
//! ## Limitations
//!
//! - No durability beyond [`StoreSnapshot`] files written by the caller
//! - No garbage collection through owner references

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

use super::{LabelSelector, ObjectStore};
use crate::core::{JbsError, Result};
use crate::models::{ArtifactBuild, DependencyBuild, DiscoveryTask, ObjectMeta, Resource};
use crate::naming::{generated_name_suffix, is_valid_object_name, truncate_generate_name};

/// Attempts at finding a free name for a `generateName` create.
const GENERATE_NAME_ATTEMPTS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StoreKey {
    kind: &'static str,
    namespace: String,
    name: String,
}

impl StoreKey {
    fn of<R: Resource>(namespace: &str, name: &str) -> Self {
        Self {
            kind: R::KIND,
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StoredObject {
    metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    spec: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    status: Value,
}

impl StoredObject {
    fn encode<R: Resource>(object: &R) -> Result<Self> {
        Ok(serde_json::from_value(serde_json::to_value(object)?)?)
    }

    fn decode<R: Resource>(&self) -> Result<R> {
        serde_json::from_value(serde_json::to_value(self)?).map_err(|e| JbsError::InvalidObject {
            kind: R::KIND.to_string(),
            name: self.metadata.name.clone(),
            reason: e.to_string(),
        })
    }
}

fn poison_err<T>(_: PoisonError<T>) -> JbsError {
    JbsError::storage("lock poisoned")
}

fn invalid<R: Resource>(name: &str, reason: impl Into<String>) -> JbsError {
    JbsError::InvalidObject {
        kind: R::KIND.to_string(),
        name: name.to_string(),
        reason: reason.into(),
    }
}

fn validate_meta<R: Resource>(meta: &ObjectMeta) -> Result<()> {
    if meta.namespace.is_empty() {
        return Err(invalid::<R>(&meta.name, "namespace is required"));
    }
    if !is_valid_object_name(&meta.name) {
        return Err(invalid::<R>(
            &meta.name,
            "names must be 1-253 characters of lower-case letters, digits, '.' and '-'",
        ));
    }
    Ok(())
}

/// Thread-safe in-memory object store.
///
/// ```rust
/// use jbs_controller::models::{ArtifactBuild, Resource};
/// use jbs_controller::store::{InMemoryStore, ObjectStore};
///
/// # async fn example() -> jbs_controller::core::Result<()> {
/// let store = InMemoryStore::new();
/// let created = store.create(&ArtifactBuild::new("default", "org.foo:bar:1.0")).await?;
/// assert!(!created.meta().uid.is_empty());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    objects: DashMap<StoreKey, StoredObject>,
    revision: AtomicU64,
    last_created: Mutex<Option<DateTime<Utc>>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects across all kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn next_revision(&self) -> u64 {
        self.revision.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Strictly increasing creation time, so creation order is always
    /// recoverable from timestamps.
    fn next_creation_timestamp(&self) -> Result<DateTime<Utc>> {
        let mut last = self.last_created.lock().map_err(poison_err)?;
        let mut now = Utc::now();
        if let Some(previous) = *last {
            if now <= previous {
                now = previous + ChronoDuration::microseconds(1);
            }
        }
        *last = Some(now);
        Ok(now)
    }

    /// Insert `object` as given, replacing any object with the same name.
    ///
    /// Unlike [`ObjectStore::create`], an explicit uid, resource version or
    /// creation timestamp is kept; only missing ones are assigned. Used to load
    /// state files and to set up races (duplicate builds with chosen
    /// timestamps) that the reconciler must tolerate.
    pub fn seed<R: Resource>(&self, object: &R) -> Result<R> {
        let mut stored = StoredObject::encode(object)?;
        validate_meta::<R>(&stored.metadata)?;

        let meta = &mut stored.metadata;
        if meta.uid.is_empty() {
            meta.uid = uuid::Uuid::new_v4().to_string();
        }
        if meta.creation_timestamp.is_none() {
            meta.creation_timestamp = Some(self.next_creation_timestamp()?);
        }
        if meta.resource_version == 0 {
            meta.resource_version = self.next_revision();
        } else {
            self.revision.fetch_max(meta.resource_version, Ordering::SeqCst);
        }

        let seeded = stored.decode::<R>()?;
        self.objects.insert(StoreKey::of::<R>(&seeded.meta().namespace, &seeded.meta().name), stored);
        Ok(seeded)
    }

    /// Delete an object, returning its last stored form.
    pub fn remove<R: Resource>(&self, namespace: &str, name: &str) -> Result<R> {
        let (_, stored) = self
            .objects
            .remove(&StoreKey::of::<R>(namespace, name))
            .ok_or_else(|| JbsError::not_found(R::KIND, namespace, name))?;
        self.next_revision();
        debug!(kind = R::KIND, namespace, name, "removed");
        stored.decode()
    }

    fn list_all<R: Resource>(&self) -> Result<Vec<R>> {
        let mut objects = self
            .objects
            .iter()
            .filter(|entry| entry.key().kind == R::KIND)
            .map(|entry| entry.value().decode::<R>())
            .collect::<Result<Vec<R>>>()?;
        objects.sort_by(|a, b| a.key().cmp(&b.key()));
        Ok(objects)
    }

    /// Every stored object, grouped by kind and ordered by namespace and name.
    pub fn snapshot(&self) -> Result<StoreSnapshot> {
        Ok(StoreSnapshot {
            artifact_builds: self.list_all()?,
            dependency_builds: self.list_all()?,
            discovery_tasks: self.list_all()?,
        })
    }

    /// Build a store holding everything in `snapshot`, via [`seed`](Self::seed).
    pub fn from_snapshot(snapshot: &StoreSnapshot) -> Result<Self> {
        let store = Self::new();
        for abr in &snapshot.artifact_builds {
            store.seed(abr)?;
        }
        for db in &snapshot.dependency_builds {
            store.seed(db)?;
        }
        for task in &snapshot.discovery_tasks {
            store.seed(task)?;
        }
        Ok(store)
    }

    fn insert_new<R: Resource>(&self, mut stored: StoredObject) -> Result<R> {
        validate_meta::<R>(&stored.metadata)?;
        let key = StoreKey::of::<R>(&stored.metadata.namespace, &stored.metadata.name);
        match self.objects.entry(key) {
            Entry::Occupied(occupied) => {
                let key = occupied.key();
                Err(JbsError::AlreadyExists {
                    kind: R::KIND.to_string(),
                    namespace: key.namespace.clone(),
                    name: key.name.clone(),
                })
            }
            Entry::Vacant(slot) => {
                stored.metadata.resource_version = self.next_revision();
                let created = stored.decode::<R>()?;
                slot.insert(stored);
                debug!(
                    kind = R::KIND,
                    namespace = %created.namespace(),
                    name = %created.name(),
                    "created"
                );
                Ok(created)
            }
        }
    }

    /// Apply `merge` to the stored copy if `incoming` carries the current
    /// resource version.
    fn compare_and_swap<R: Resource>(
        &self,
        incoming: &StoredObject,
        merge: impl FnOnce(&mut StoredObject, &StoredObject),
    ) -> Result<R> {
        let meta = &incoming.metadata;
        let key = StoreKey::of::<R>(&meta.namespace, &meta.name);
        let mut entry = self
            .objects
            .get_mut(&key)
            .ok_or_else(|| JbsError::not_found(R::KIND, &meta.namespace, &meta.name))?;

        let actual = entry.value().metadata.resource_version;
        if meta.resource_version != actual {
            return Err(JbsError::Conflict {
                kind: R::KIND.to_string(),
                namespace: meta.namespace.clone(),
                name: meta.name.clone(),
                expected: meta.resource_version,
                actual,
            });
        }

        let mut next = entry.value().clone();
        merge(&mut next, incoming);
        if next == *entry.value() {
            return entry.value().decode();
        }

        next.metadata.resource_version = self.next_revision();
        let updated = next.decode::<R>()?;
        *entry.value_mut() = next;
        debug!(kind = R::KIND, namespace = %meta.namespace, name = %meta.name, "updated");
        Ok(updated)
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    async fn get<R: Resource>(&self, namespace: &str, name: &str) -> Result<R> {
        self.objects
            .get(&StoreKey::of::<R>(namespace, name))
            .ok_or_else(|| JbsError::not_found(R::KIND, namespace, name))?
            .value()
            .decode()
    }

    async fn list<R: Resource>(&self, namespace: &str, selector: &LabelSelector) -> Result<Vec<R>> {
        let mut objects = self
            .objects
            .iter()
            .filter(|entry| {
                let key = entry.key();
                key.kind == R::KIND
                    && key.namespace == namespace
                    && selector.matches(&entry.value().metadata.labels)
            })
            .map(|entry| entry.value().decode::<R>())
            .collect::<Result<Vec<R>>>()?;
        objects.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(objects)
    }

    async fn create<R: Resource>(&self, object: &R) -> Result<R> {
        let mut stored = StoredObject::encode(object)?;
        stored.metadata.uid = uuid::Uuid::new_v4().to_string();
        stored.metadata.creation_timestamp = Some(self.next_creation_timestamp()?);

        if !stored.metadata.name.is_empty() {
            return self.insert_new(stored);
        }

        let prefix = truncate_generate_name(&stored.metadata.generate_name).to_string();
        if prefix.is_empty() {
            return Err(invalid::<R>("", "either name or generateName is required"));
        }
        for _ in 0..GENERATE_NAME_ATTEMPTS {
            let mut candidate = stored.clone();
            candidate.metadata.name = format!("{prefix}{}", generated_name_suffix());
            match self.insert_new(candidate) {
                Err(JbsError::AlreadyExists {
                    ..
                }) => continue,
                other => return other,
            }
        }
        Err(JbsError::AlreadyExists {
            kind: R::KIND.to_string(),
            namespace: stored.metadata.namespace,
            name: format!("{prefix}*"),
        })
    }

    async fn update<R: Resource>(&self, object: &R) -> Result<R> {
        let incoming = StoredObject::encode(object)?;
        self.compare_and_swap::<R>(&incoming, |stored, incoming| {
            let mut metadata = incoming.metadata.clone();
            metadata.uid.clone_from(&stored.metadata.uid);
            metadata.generate_name.clone_from(&stored.metadata.generate_name);
            metadata.creation_timestamp = stored.metadata.creation_timestamp;
            stored.metadata = metadata;
            stored.spec = incoming.spec.clone();
        })
    }

    async fn update_status<R: Resource>(&self, object: &R) -> Result<R> {
        let incoming = StoredObject::encode(object)?;
        self.compare_and_swap::<R>(&incoming, |stored, incoming| {
            stored.status = incoming.status.clone();
        })
    }
}

/// Serializable contents of an [`InMemoryStore`]; the CLI state-file format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    #[serde(default)]
    pub artifact_builds: Vec<ArtifactBuild>,
    #[serde(default)]
    pub dependency_builds: Vec<DependencyBuild>,
    #[serde(default)]
    pub discovery_tasks: Vec<DiscoveryTask>,
}

impl StoreSnapshot {
    /// Read a YAML state file.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        serde_yaml::from_str(&content).map_err(|e| JbsError::StateFileError {
            file: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Read a YAML state file, or start empty if it does not exist.
    pub async fn load_or_default(path: &Path) -> Result<Self> {
        if tokio::fs::try_exists(path).await? {
            Self::load(path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Write as YAML through a temporary file and a rename.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let content = serde_yaml::to_string(self)?;
        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, content).await?;
        tokio::fs::rename(&temp_path, path).await?;
        Ok(())
    }
}
