//! Error handling for the build controller
//!
//! This module provides the typed error enum used by the store, the reconciler
//! and the driver, together with the user-facing rendering used by the `jbs`
//! binary. The error system follows two rules:
//! 1. **Strongly-typed errors** so the reconciler can tell a concurrent
//!    deletion from a version conflict from a genuine failure
//! 2. **User-friendly messages** with suggestions when an error reaches the CLI
//!
//! # Retry Classification
//!
//! Reconciles are at-least-once and level-triggered. An error returned from a
//! reconcile means "run me again from scratch later". [`JbsError::is_retryable`]
//! tells the driver which errors are worth retrying immediately (conflicts,
//! storage hiccups, timeouts) and which will fail again unchanged.
//!
//! # Examples
//!
//! ```rust,no_run
//! use jbs_controller::core::{JbsError, user_friendly_error};
//!
//! let err = JbsError::Conflict {
//!     kind: "DependencyBuild".to_string(),
//!     namespace: "default".to_string(),
//!     name: "bar.1.2.3-1a2b3c4d-x7k2p".to_string(),
//!     expected: 3,
//!     actual: 4,
//! };
//! assert!(err.is_retryable());
//!
//! let ctx = user_friendly_error(anyhow::Error::from(err));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for controller operations.
///
/// # Error Categories
///
/// ## Store
/// - [`NotFound`] - Object does not exist (possibly deleted concurrently)
/// - [`AlreadyExists`] - Create collided with an existing name
/// - [`Conflict`] - Optimistic-concurrency check failed on update
/// - [`Storage`] - Backend failure unrelated to the object itself
///
/// ## Reconciliation
/// - [`ReconcileTimeout`] - A reconcile exceeded its execution budget
/// - [`InvalidObject`] - A stored object is malformed
///
/// ## Configuration and files
/// - [`ConfigError`] - Invalid controller configuration
/// - [`StateFileError`] - State file could not be parsed
/// - [`IoError`], [`JsonError`], [`YamlError`], [`TomlError`] - wrapped library errors
///
/// [`NotFound`]: JbsError::NotFound
/// [`AlreadyExists`]: JbsError::AlreadyExists
/// [`Conflict`]: JbsError::Conflict
/// [`Storage`]: JbsError::Storage
/// [`ReconcileTimeout`]: JbsError::ReconcileTimeout
/// [`InvalidObject`]: JbsError::InvalidObject
/// [`ConfigError`]: JbsError::ConfigError
/// [`StateFileError`]: JbsError::StateFileError
/// [`IoError`]: JbsError::IoError
/// [`JsonError`]: JbsError::JsonError
/// [`YamlError`]: JbsError::YamlError
/// [`TomlError`]: JbsError::TomlError
#[derive(Error, Debug)]
pub enum JbsError {
    /// Object does not exist in the store
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        /// Kind of the missing object
        kind: String,
        /// Namespace that was searched
        namespace: String,
        /// Name that was requested
        name: String,
    },

    /// An object with the same name already exists
    #[error("{kind} {namespace}/{name} already exists")]
    AlreadyExists {
        /// Kind of the object being created
        kind: String,
        /// Namespace of the object
        namespace: String,
        /// Colliding name
        name: String,
    },

    /// Update rejected because the caller read a stale version
    ///
    /// Callers must re-read and recompute rather than re-send the same write.
    #[error(
        "Conflict updating {kind} {namespace}/{name}: resource version {expected} is stale (current is {actual})"
    )]
    Conflict {
        /// Kind of the object being updated
        kind: String,
        /// Namespace of the object
        namespace: String,
        /// Name of the object
        name: String,
        /// Resource version the caller based its write on
        expected: u64,
        /// Resource version currently stored
        actual: u64,
    },

    /// Store backend failure
    #[error("Store error: {message}")]
    Storage {
        /// Description of the failure
        message: String,
    },

    /// Reconcile exceeded its execution budget
    #[error("Reconcile of {namespace}/{name} timed out after {timeout_secs}s")]
    ReconcileTimeout {
        /// Namespace of the object being reconciled
        namespace: String,
        /// Name of the object being reconciled
        name: String,
        /// Budget that was exceeded
        timeout_secs: u64,
    },

    /// Stored object is malformed
    #[error("Invalid {kind} '{name}': {reason}")]
    InvalidObject {
        /// Kind of the object
        kind: String,
        /// Name of the object
        name: String,
        /// What is wrong with it
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// State file could not be loaded
    #[error("Invalid state file {file}")]
    StateFileError {
        /// Path to the state file
        file: String,
        /// Parse failure detail
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML (de)serialization error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl JbsError {
    /// Build a [`JbsError::NotFound`] for the given object coordinates.
    pub fn not_found(kind: &str, namespace: &str, name: &str) -> Self {
        Self::NotFound {
            kind: kind.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    /// Build a [`JbsError::Storage`] from any message.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// True when the object simply does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True for optimistic-concurrency rejections.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// True when re-running the whole reconcile may succeed.
    ///
    /// Conflicts, backend hiccups and timeouts are transient. Create collisions
    /// are also retryable: a fresh reconcile will find the object that won.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Conflict { .. }
                | Self::Storage { .. }
                | Self::ReconcileTimeout { .. }
                | Self::AlreadyExists { .. }
        )
    }
}

impl Clone for JbsError {
    fn clone(&self) -> Self {
        match self {
            Self::NotFound {
                kind,
                namespace,
                name,
            } => Self::NotFound {
                kind: kind.clone(),
                namespace: namespace.clone(),
                name: name.clone(),
            },
            Self::AlreadyExists {
                kind,
                namespace,
                name,
            } => Self::AlreadyExists {
                kind: kind.clone(),
                namespace: namespace.clone(),
                name: name.clone(),
            },
            Self::Conflict {
                kind,
                namespace,
                name,
                expected,
                actual,
            } => Self::Conflict {
                kind: kind.clone(),
                namespace: namespace.clone(),
                name: name.clone(),
                expected: *expected,
                actual: *actual,
            },
            Self::Storage {
                message,
            } => Self::Storage {
                message: message.clone(),
            },
            Self::ReconcileTimeout {
                namespace,
                name,
                timeout_secs,
            } => Self::ReconcileTimeout {
                namespace: namespace.clone(),
                name: name.clone(),
                timeout_secs: *timeout_secs,
            },
            Self::InvalidObject {
                kind,
                name,
                reason,
            } => Self::InvalidObject {
                kind: kind.clone(),
                name: name.clone(),
                reason: reason.clone(),
            },
            Self::ConfigError {
                message,
            } => Self::ConfigError {
                message: message.clone(),
            },
            Self::StateFileError {
                file,
                reason,
            } => Self::StateFileError {
                file: file.clone(),
                reason: reason.clone(),
            },
            // For errors that don't implement Clone, convert to Other
            Self::IoError(e) => Self::Other {
                message: format!("IO error: {e}"),
            },
            Self::JsonError(e) => Self::Other {
                message: format!("JSON error: {e}"),
            },
            Self::YamlError(e) => Self::Other {
                message: format!("YAML error: {e}"),
            },
            Self::TomlError(e) => Self::Other {
                message: format!("TOML parsing error: {e}"),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Error context wrapper that provides user-friendly error information
///
/// `ErrorContext` wraps a [`JbsError`] and adds an optional suggestion and
/// additional details. When displayed, errors show the error in red, details
/// in yellow and the suggestion in green.
///
/// # Examples
///
/// ```rust,no_run
/// use jbs_controller::core::{ErrorContext, JbsError};
///
/// let context = ErrorContext::new(JbsError::ConfigError {
///     message: "max_parallel must be at least 1".to_string(),
/// })
/// .with_suggestion("Set max_parallel to a positive number in config.toml");
///
/// println!("{}", context);
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying controller error
    pub error: JbsError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: JbsError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error context to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions
///
/// Recognizes [`JbsError`] variants, [`std::io::Error`], YAML and TOML parse
/// errors anywhere in the `anyhow` chain; everything else is rendered with its
/// full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(jbs_error) = error.downcast_ref::<JbsError>() {
        return create_error_context(jbs_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        if io_error.kind() == std::io::ErrorKind::NotFound {
            return ErrorContext::new(JbsError::Other {
                message: error_chain_message(&error),
            })
            .with_suggestion("Check that the file exists and the path is correct")
            .with_details("A required file or directory could not be found");
        }
    }

    if let Some(yaml_error) = error.downcast_ref::<serde_yaml::Error>() {
        return ErrorContext::new(JbsError::StateFileError {
            file: "state file".to_string(),
            reason: yaml_error.to_string(),
        })
        .with_suggestion(
            "Check the YAML syntax of the state file. It must contain artifactBuilds, dependencyBuilds and discoveryTasks lists",
        )
        .with_details(yaml_error.to_string());
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(JbsError::ConfigError {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax of the controller configuration file")
        .with_details("Unknown keys are rejected; see the documented configuration fields");
    }

    ErrorContext::new(JbsError::Other {
        message: error_chain_message(&error),
    })
}

fn error_chain_message(error: &anyhow::Error) -> String {
    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }
    message
}

/// Map each [`JbsError`] variant to an [`ErrorContext`] with tailored suggestions.
fn create_error_context(error: JbsError) -> ErrorContext {
    match &error {
        JbsError::NotFound { kind, .. } => {
            let kind = kind.clone();
            ErrorContext::new(error)
                .with_suggestion(
                    "Check the namespace and name. Use 'jbs status' to list objects in the state file",
                )
                .with_details(format!("The {kind} may have been deleted concurrently"))
        }

        JbsError::Conflict { .. } => ErrorContext::new(error)
            .with_suggestion("Re-run the command; the object changed while it was being reconciled")
            .with_details("Updates use optimistic concurrency and are rejected when based on a stale read"),

        JbsError::ReconcileTimeout { .. } => ErrorContext::new(error)
            .with_suggestion("Increase reconcile_timeout_secs in the controller configuration"),

        JbsError::ConfigError { .. } => ErrorContext::new(error)
            .with_suggestion("Fix the controller configuration file or pass a different one with --config"),

        JbsError::StateFileError { file, reason } => {
            let details = format!("{file}: {reason}");
            ErrorContext::new(error)
                .with_suggestion("Check the YAML syntax of the state file")
                .with_details(details)
        }

        _ => ErrorContext::new(error),
    }
}
