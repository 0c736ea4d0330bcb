//! Unit test suite for jbs-controller
//!
//! Tests of public building blocks that do not need the reconciler: the
//! state-file format and error rendering.
//!
//! ```bash
//! cargo test --test unit
//! ```

mod error_tests;
mod state_file_tests;
