//! Test doubles for programs taking a [`Ring`](crate::Ring).
//!
//! Enabled for this crate's tests and, for downstream crates, through the
//! `test-support` feature.

pub mod buffer;
pub mod fixture;
pub mod scope;
pub mod tester;

pub use buffer::{BufferKind, VerifiedBuffer};
pub use fixture::{Expectation, Fixture};
pub use scope::{Cleanup, Scope, Spy, TestHandle};
pub use tester::Tester;

/// Return `lines` sorted, for comparing unordered environment dumps.
pub fn sort(mut lines: Vec<String>) -> Vec<String> {
    lines.sort();
    lines
}
