//! Integration test suite for jbs-controller
//!
//! End-to-end tests that drive artifact builds through their whole lifecycle,
//! either through the library (controller plus in-memory store) or through
//! the `jbs` binary and a state file.
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **lifecycle**: request to completion, shared builds, contamination
//! - **cli**: the `jbs` subcommands against temporary state files

mod cli;
mod lifecycle;
