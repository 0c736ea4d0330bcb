//! Versioned object store abstraction
//!
//! The reconciler talks to storage only through [`ObjectStore`]. Every write is
//! a compare-and-set on the object's `resourceVersion`: a caller that read a
//! stale copy gets [`JbsError::Conflict`](crate::core::JbsError::Conflict) and
//! is expected to re-read and recompute.
//!
//! Spec and status are written through separate calls:
//!
//! - [`ObjectStore::update`] replaces metadata and spec, keeping the stored status
//! - [`ObjectStore::update_status`] replaces status, keeping metadata and spec
//!
//! so a reconciler persisting progress can never clobber a concurrent spec
//! edit, and vice versa.
//!
//! [`InMemoryStore`] is the in-process implementation used by the CLI and the
//! tests; [`StoreSnapshot`] is its YAML state-file form.

pub mod events;
pub mod memory;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;

use crate::core::Result;
use crate::models::Resource;

pub use events::{Event, EventRecorder, EventType, LoggingRecorder, RecordingRecorder};
pub use memory::{InMemoryStore, StoreSnapshot};

/// Label equality query. An empty selector matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    equals: BTreeMap<String, String>,
}

impl LabelSelector {
    /// Selector matching every object.
    #[must_use]
    pub fn everything() -> Self {
        Self::default()
    }

    /// Selector requiring `key == value`.
    pub fn eq(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::everything().and(key, value)
    }

    /// Add a further `key == value` requirement.
    #[must_use]
    pub fn and(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.equals.insert(key.into(), value.into());
        self
    }

    /// Whether `labels` satisfies every requirement.
    #[must_use]
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.equals.iter().all(|(key, value)| labels.get(key) == Some(value))
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in &self.equals {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{key}={value}")?;
            first = false;
        }
        Ok(())
    }
}

/// Versioned, namespaced object storage.
///
/// Implementations must make `update` and `update_status` atomic with respect
/// to the resource-version check.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store-wide counter, bumped by every write that changed an object.
    fn revision(&self) -> u64;

    /// Fetch one object, or `NotFound`.
    async fn get<R: Resource>(&self, namespace: &str, name: &str) -> Result<R>;

    /// All objects of kind `R` in `namespace` whose labels match `selector`,
    /// ordered by name.
    async fn list<R: Resource>(&self, namespace: &str, selector: &LabelSelector) -> Result<Vec<R>>;

    /// Store a new object.
    ///
    /// Assigns uid, resource version and creation timestamp; resolves
    /// `generateName` when `name` is empty. Fails with `AlreadyExists` when the
    /// name is taken.
    async fn create<R: Resource>(&self, object: &R) -> Result<R>;

    /// Replace metadata and spec, keeping the stored status.
    async fn update<R: Resource>(&self, object: &R) -> Result<R>;

    /// Replace status, keeping the stored metadata and spec.
    async fn update_status<R: Resource>(&self, object: &R) -> Result<R>;
}
