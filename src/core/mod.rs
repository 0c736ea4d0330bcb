//! Core types shared by every layer of the controller
//!
//! - [`JbsError`] - typed errors with retry classification
//! - [`ErrorContext`] / [`user_friendly_error`] - CLI-facing rendering
//! - [`Result`] - the library-wide result alias
//!
//! Library layers (store, reconciler, driver) return [`Result`]; the CLI and
//! configuration loading use `anyhow::Result` and downcast at the binary
//! boundary.

pub mod error;

pub use error::{ErrorContext, JbsError, user_friendly_error};

/// Result alias used by the store, reconciler and driver.
pub type Result<T> = std::result::Result<T, JbsError>;
