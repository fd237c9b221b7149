//! Test lifecycle handles.
//!
//! A [`TestHandle`] lets test doubles defer checks to the end of a test and
//! report failures without unwinding. [`Scope`] is the handle used in real
//! tests; [`Spy`] records what a double reports so the double itself can be
//! tested.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

/// Deferred check registered with [`TestHandle::cleanup`].
pub type Cleanup = Box<dyn FnOnce(&dyn TestHandle) + Send>;

pub trait TestHandle {
    /// Register `f` to run when the test scope ends. Cleanups run in reverse
    /// registration order and receive the handle to report through.
    fn cleanup(&self, f: Cleanup);

    /// Mark the test as failed with `message`. Does not unwind.
    fn error(&self, message: String);

    /// Mark the calling function as a test helper. Only used for failure
    /// attribution.
    fn helper(&self) {}
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Pop and run cleanups LIFO until none are left. Cleanups may register
/// further cleanups.
fn drain(cleanups: &Mutex<Vec<Cleanup>>, handle: &dyn TestHandle) {
    loop {
        let Some(cleanup) = lock(cleanups).pop() else {
            break;
        };
        cleanup(handle);
    }
}

/// Test scope running its cleanups when it ends.
///
/// Call [`Scope::finish`] to collect failures, or let the scope drop: a
/// dropped scope with failures panics, failing the enclosing `#[test]`.
///
/// ```
/// use ringctx::test_support::{Scope, VerifiedBuffer};
///
/// let scope = Scope::new("writes_greeting");
/// let out = VerifiedBuffer::wet(&scope, "stdout");
/// out.must_write_str("hello");
/// assert_eq!(out.string(), "hello");
/// assert!(scope.finish().is_empty());
/// ```
#[derive(Default)]
pub struct Scope {
    name: String,
    cleanups: Mutex<Vec<Cleanup>>,
    failures: Mutex<Vec<String>>,
}

impl Scope {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cleanups: Mutex::default(),
            failures: Mutex::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Failures reported so far.
    pub fn failures(&self) -> Vec<String> {
        lock(&self.failures).clone()
    }

    /// Run all cleanups registered so far and return every failure
    /// reported, leaving the scope clean for its drop.
    pub fn finish(&self) -> Vec<String> {
        drain(&self.cleanups, self);
        std::mem::take(&mut *lock(&self.failures))
    }
}

impl TestHandle for Scope {
    fn cleanup(&self, f: Cleanup) {
        lock(&self.cleanups).push(f);
    }

    fn error(&self, message: String) {
        debug!(scope = %self.name, %message, "test failure reported");
        lock(&self.failures).push(message);
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        drain(&self.cleanups, &*self);
        let failures = std::mem::take(&mut *lock(&self.failures));
        if failures.is_empty() || std::thread::panicking() {
            return;
        }
        panic!("scope {} failed:\n{}", self.name, failures.join("\n"));
    }
}

/// Handle recording cleanups and failures for inspection.
///
/// Cleanups only run on [`Spy::close`].
#[derive(Default)]
pub struct Spy {
    cleanups: Mutex<Vec<Cleanup>>,
    registered: Mutex<usize>,
    failures: Mutex<Vec<String>>,
}

impl Spy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run registered cleanups, LIFO.
    pub fn close(&self) {
        drain(&self.cleanups, self);
    }

    /// Number of cleanups registered over the spy's lifetime.
    pub fn cleanup_count(&self) -> usize {
        *lock(&self.registered)
    }

    pub fn failures(&self) -> Vec<String> {
        lock(&self.failures).clone()
    }

    pub fn failed(&self) -> bool {
        !lock(&self.failures).is_empty()
    }
}

impl TestHandle for Spy {
    fn cleanup(&self, f: Cleanup) {
        *lock(&self.registered) += 1;
        lock(&self.cleanups).push(f);
    }

    fn error(&self, message: String) {
        lock(&self.failures).push(message);
    }
}
