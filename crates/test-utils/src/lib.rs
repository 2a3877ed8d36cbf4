//! Shared test utilities for the site-comfort workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Provider payload fixtures (telemetry and traffic envelopes)
//! - Observation generators for exhaustive scoring checks
//! - Scratch directories for on-disk stores
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```

pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;

use std::path::PathBuf;

use tempfile::TempDir;

/// Scratch directory plus a database path inside it.
///
/// Keep the `TempDir` alive for as long as the path is in use.
pub fn scratch_db(name: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create scratch dir");
    let path = dir.path().join(name);
    (dir, path)
}

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}
