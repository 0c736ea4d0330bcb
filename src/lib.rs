//! jbs-controller - reconciliation core of a JVM dependency build service
//!
//! A user asks for a library by GAV coordinate (`group:artifact:version`).
//! The controller resolves the coordinate to a source location through a
//! discovery task, then shares one build per distinct source location between
//! every coordinate that resolves to it, and cleans up contamination records
//! once an artifact is rebuilt.
//!
//! # Architecture Overview
//!
//! Three object kinds live in a versioned store:
//! - `ArtifactBuild` - one per requested coordinate, driven through
//!   `New -> Discovering -> Building -> Complete | Failed | Missing`
//! - `DependencyBuild` - one per source identity (hash of URL, tag and path),
//!   owned by every artifact build that needs it
//! - `DiscoveryTask` - resolves one coordinate to an SCM location
//!
//! Reconciles are level-triggered and idempotent: each one reads the current
//! state, moves it at most one step and persists the step through
//! compare-and-set writes. Concurrent reconciles that collide get a conflict
//! and are retried from a fresh read.
//!
//! # Core Modules
//!
//! - [`naming`] - coordinate keys, source identities and object names
//! - [`models`] - the stored object kinds and their state enums
//! - [`store`] - the [`store::ObjectStore`] abstraction, the in-memory store
//!   and event recording
//! - [`reconciler`] - the `ArtifactBuild` state machine
//! - [`controller`] - bounded concurrent driver with conflict retries
//!
//! ## Supporting Modules
//! - [`config`] - `~/.jbs/config.toml` controller settings
//! - [`core`] - error types and user-facing error rendering
//! - [`constants`] - label keys, task result names and defaults
//! - [`cli`] - the `jbs` command line
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use jbs_controller::config::ControllerConfig;
//! use jbs_controller::controller::Controller;
//! use jbs_controller::models::ArtifactBuild;
//! use jbs_controller::store::{InMemoryStore, LoggingRecorder, ObjectStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = Arc::new(InMemoryStore::new());
//! store.create(&ArtifactBuild::new("default", "org.foo:bar:1.2.3")).await?;
//!
//! let controller = Controller::new(store, Arc::new(LoggingRecorder), &ControllerConfig::default());
//! let summary = controller.run_until_settled("default").await?;
//! assert!(summary.settled);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod controller;
pub mod core;
pub mod models;
pub mod naming;
pub mod reconciler;
pub mod store;

// Test utilities (only available in tests or with test-utils feature)
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
