//! Fire-and-forget events about reconciled objects.
//!
//! The reconciler never reads events back; they exist for operators.

use serde::Serialize;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};

use crate::models::Resource;

/// Reasons attached to events emitted by the artifact build reconciler.
pub mod reasons {
    /// No discovery task found for an artifact build in `Discovering`.
    pub const MISSING_TASK_LINK: &str = "MissingTaskLink";
    /// Discovery completed without resolving a tag.
    pub const MISSING_TAG: &str = "MissingTag";
    /// The dependency build of a `Building` artifact build is gone.
    pub const MISSING_DEPENDENCY_BUILD: &str = "MissingDependencyBuild";
    /// A contamination marker names a dependency build that does not exist.
    pub const CANNOT_GET_DEPENDENCY_BUILD: &str = "CannotGetDependencyBuild";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventType {
    Normal,
    Warning,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => f.write_str("Normal"),
            Self::Warning => f.write_str("Warning"),
        }
    }
}

/// One event about one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub event_type: EventType,
    pub reason: String,
    pub message: String,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl Event {
    fn about<R: Resource>(
        event_type: EventType,
        object: &R,
        reason: &str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            event_type,
            reason: reason.to_string(),
            message: message.into(),
            kind: R::KIND.to_string(),
            namespace: object.namespace().to_string(),
            name: object.name().to_string(),
        }
    }

    pub fn normal<R: Resource>(object: &R, reason: &str, message: impl Into<String>) -> Self {
        Self::about(EventType::Normal, object, reason, message)
    }

    pub fn warning<R: Resource>(object: &R, reason: &str, message: impl Into<String>) -> Self {
        Self::about(EventType::Warning, object, reason, message)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}/{} {}: {}",
            self.event_type, self.kind, self.namespace, self.name, self.reason, self.message
        )
    }
}

/// Sink for events.
pub trait EventRecorder: Send + Sync {
    fn record(&self, event: Event);
}

fn log_event(event: &Event) {
    match event.event_type {
        EventType::Normal => info!(
            kind = %event.kind,
            namespace = %event.namespace,
            name = %event.name,
            reason = %event.reason,
            "{}",
            event.message
        ),
        EventType::Warning => warn!(
            kind = %event.kind,
            namespace = %event.namespace,
            name = %event.name,
            reason = %event.reason,
            "{}",
            event.message
        ),
    }
}

/// Recorder that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingRecorder;

impl EventRecorder for LoggingRecorder {
    fn record(&self, event: Event) {
        log_event(&event);
    }
}

/// Recorder that logs and keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingRecorder {
    events: Mutex<Vec<Event>>,
}

impl RecordingRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Recorded events with the given reason.
    #[must_use]
    pub fn with_reason(&self, reason: &str) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|event| event.reason == reason)
            .cloned()
            .collect()
    }
}

impl EventRecorder for RecordingRecorder {
    fn record(&self, event: Event) {
        log_event(&event);
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push(event);
    }
}
