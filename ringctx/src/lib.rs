//! Injectable execution context for command-line programs.
//!
//! Program entry points take a [`Ring`] instead of reading process globals.
//! In production the ring is built from the real process; in tests it is
//! built from buffers and a synthetic environment, so the same code runs
//! deterministically.
//!
//! - **[`env`]**: `KEY=VALUE` environment store with value (copy) semantics.
//! - **[`meta`]**: free-form metadata with shared (handle) semantics.
//! - **[`streams`]**, **[`clock`]**, **[`fs`]**: the remaining capabilities a
//!   ring hands out.
//! - **`test_support`** (feature `test-support`): verified output buffers,
//!   test scopes and the `Tester` helper.

pub mod clock;
pub mod context;
pub mod env;
pub mod error;
pub mod fs;
pub mod meta;
pub mod streams;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use context::{Ring, RingBuilder, Setting};
pub use error::{Error, Result};
