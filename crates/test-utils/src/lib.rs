//! Shared test utilities for the webdrops workspace.
//!
//! This crate provides common testing infrastructure including:
//! - A scripted in-memory [`FakeTransport`] standing in for the webdrops API
//! - A test configuration pointing at fake endpoints
//! - JSON fixtures for token responses, sensor registries and radar timelines
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then script the upstream in your tests:
//!
//! ```ignore
//! use test_utils::{fixtures, FakeTransport};
//!
//! let fake = FakeTransport::with_login();
//! fake.respond_json("GET", "sensors/list/TERMOMETRO", fixtures::registry(&[("a", 42.0, 12.0)]));
//! ```

pub mod fake;
pub mod fixtures;

// Re-export commonly used items at the crate root
pub use fake::{FakeTransport, Scripted};
pub use fixtures::*;

/// Assert that an expression is an error whose root matches a pattern.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_root_err;
///
/// assert_root_err!(client.get(&url, None).await, WebdropsError::Transport { .. });
/// ```
#[macro_export]
macro_rules! assert_root_err {
    ($result:expr, $pattern:pat) => {{
        match $result {
            Ok(_) => panic!("assertion failed: expected an error, got Ok"),
            Err(err) => {
                let root = err.root();
                if !matches!(root, $pattern) {
                    panic!(
                        "assertion failed: root error `{:?}` does not match `{}`",
                        root,
                        stringify!($pattern)
                    );
                }
                err
            }
        }
    }};
}
