//! Thread-safe output buffer with usage verification.
//!
//! A [`VerifiedBuffer`] stands in for stdout or stderr in tests. It counts
//! writes and reads, and buffers registered as [dry](VerifiedBuffer::dry) or
//! [wet](VerifiedBuffer::wet) check at the end of the test that they were
//! used as expected.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::streams::OutStream;
use crate::test_support::scope::TestHandle;

/// How a buffer is verified at the end of a test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    /// Not verified.
    Default,
    /// Must never be written to.
    Dry,
    /// Must be written to and its contents examined.
    Wet,
}

impl BufferKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BufferKind::Default => "default",
            BufferKind::Dry => "dry",
            BufferKind::Wet => "wet",
        }
    }
}

impl fmt::Display for BufferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct State {
    buf: Vec<u8>,
    writes: usize,
    reads: usize,
    check: bool,
}

#[derive(Debug)]
struct Inner {
    /// Trimmed name followed by a space, or empty. Prefixes "buffer" in
    /// failure messages.
    label: String,
    kind: BufferKind,
    state: Mutex<State>,
}

/// Thread-safe in-memory writer counting writes and reads.
///
/// Clones are handles to the same buffer.
#[derive(Debug, Clone)]
pub struct VerifiedBuffer {
    inner: Arc<Inner>,
}

impl VerifiedBuffer {
    /// Unverified buffer without a name.
    pub fn new() -> Self {
        Self::with_kind("", BufferKind::Default)
    }

    /// Unverified buffer with a name used in failure messages.
    pub fn named(name: &str) -> Self {
        Self::with_kind(name, BufferKind::Default)
    }

    fn with_kind(name: &str, kind: BufferKind) -> Self {
        let name = name.trim();
        let label = if name.is_empty() {
            String::new()
        } else {
            format!("{name} ")
        };
        Self {
            inner: Arc::new(Inner {
                label,
                kind,
                state: Mutex::new(State {
                    buf: Vec::new(),
                    writes: 0,
                    reads: 0,
                    check: true,
                }),
            }),
        }
    }

    /// Buffer that must stay empty until the end of the test.
    ///
    /// If anything was written when `handle`'s scope ends, the test fails
    /// with a message showing the unexpected contents.
    pub fn dry<H: TestHandle + ?Sized>(handle: &H, name: &str) -> Self {
        handle.helper();
        let buffer = Self::with_kind(name, BufferKind::Dry);
        let check = buffer.clone();
        handle.cleanup(Box::new(move |t| {
            t.helper();
            if let Some(message) = check.dry_violation() {
                t.error(message);
            }
        }));
        buffer
    }

    /// Buffer that must be written to and read with [`VerifiedBuffer::string`]
    /// or [`VerifiedBuffer::bytes`] before the end of the test.
    pub fn wet<H: TestHandle + ?Sized>(handle: &H, name: &str) -> Self {
        handle.helper();
        let buffer = Self::with_kind(name, BufferKind::Wet);
        let check = buffer.clone();
        handle.cleanup(Box::new(move |t| {
            t.helper();
            if let Some(message) = check.wet_violation() {
                t.error(message);
            }
        }));
        buffer
    }

    pub fn name(&self) -> &str {
        self.inner.label.trim_end()
    }

    pub fn kind(&self) -> BufferKind {
        self.inner.kind
    }

    /// Disable the end-of-test check for this buffer.
    pub fn skip_checks(&self) {
        self.lock().check = false;
    }

    /// Append `bytes`. Counts as one write however many bytes are given.
    pub fn write(&self, bytes: &[u8]) -> io::Result<usize> {
        let mut state = self.lock();
        state.writes += 1;
        state.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    /// Append `s`. Counts as one write.
    pub fn write_str(&self, s: &str) -> io::Result<usize> {
        self.write(s.as_bytes())
    }

    /// Append `s`, panicking on error.
    pub fn must_write_str(&self, s: &str) {
        if let Err(err) = self.write_str(s) {
            panic!("write to {}buffer: {err}", self.inner.label);
        }
    }

    /// Contents written so far, as text. Counts as examining the buffer.
    pub fn string(&self) -> String {
        let mut state = self.lock();
        state.reads += 1;
        String::from_utf8_lossy(&state.buf).into_owned()
    }

    /// Contents written so far, as bytes. Counts as examining the buffer.
    pub fn bytes(&self) -> Vec<u8> {
        let mut state = self.lock();
        state.reads += 1;
        state.buf.clone()
    }

    /// Clear the contents and both counters.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.buf.clear();
        state.writes = 0;
        state.reads = 0;
    }

    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    pub fn read_count(&self) -> usize {
        self.lock().reads
    }

    /// Output stream writing into this buffer.
    pub fn stream(&self) -> OutStream {
        OutStream::new(self.clone())
    }

    /// Contents without touching the read counter, so the checks below do
    /// not count as examining the buffer.
    fn peek(state: &State) -> String {
        String::from_utf8_lossy(&state.buf).into_owned()
    }

    fn dry_violation(&self) -> Option<String> {
        let state = self.lock();
        if !state.check {
            return None;
        }
        let out = Self::peek(&state);
        if out.is_empty() {
            return None;
        }
        Some(format!(
            "expected {}buffer to be empty:\n\twant: \n\thave: {:?}",
            self.inner.label, out
        ))
    }

    fn wet_violation(&self) -> Option<String> {
        let state = self.lock();
        if !state.check {
            return None;
        }
        if Self::peek(&state).is_empty() {
            return Some(format!(
                "expected {}buffer not to be empty",
                self.inner.label
            ));
        }
        if state.reads == 0 {
            return Some(format!(
                "expected {}buffer to be examined with String or Buffer methods",
                self.inner.label
            ));
        }
        None
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for VerifiedBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for VerifiedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        VerifiedBuffer::write(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Write for &VerifiedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        VerifiedBuffer::write(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::scope::{Scope, Spy};
    use std::thread;

    #[test]
    fn new_buffer_is_empty_default_kind() {
        let buffer = VerifiedBuffer::new();
        assert_eq!(buffer.name(), "");
        assert_eq!(buffer.kind(), BufferKind::Default);
        assert_eq!(buffer.write_count(), 0);
        assert_eq!(buffer.read_count(), 0);
        assert!(buffer.lock().check);
    }

    #[test]
    fn named_buffer_trims_name() {
        let buffer = VerifiedBuffer::named("  stdout ");
        assert_eq!(buffer.name(), "stdout");
        assert_eq!(buffer.inner.label, "stdout ");
    }

    #[test]
    fn write_counts_calls_not_bytes() {
        let buffer = VerifiedBuffer::new();

        let n = buffer.write(b"abc").expect("write");
        buffer.write_str("de").expect("write");

        assert_eq!(n, 3);
        assert_eq!(buffer.write_count(), 2);
        assert_eq!(buffer.read_count(), 0);
        assert_eq!(buffer.string(), "abcde");
        assert_eq!(buffer.write_count(), 2);
        assert_eq!(buffer.read_count(), 1);
    }

    #[test]
    fn bytes_counts_as_read() {
        let buffer = VerifiedBuffer::new();
        buffer.must_write_str("xy");
        assert_eq!(buffer.bytes(), b"xy");
        assert_eq!(buffer.read_count(), 1);
    }

    #[test]
    fn peek_does_not_count_as_read() {
        let buffer = VerifiedBuffer::new();
        buffer.must_write_str("abc");

        let peeked = VerifiedBuffer::peek(&buffer.lock());

        assert_eq!(peeked, "abc");
        assert_eq!(buffer.read_count(), 0);
    }

    #[test]
    fn reset_clears_contents_and_counters() {
        let buffer = VerifiedBuffer::new();
        buffer.must_write_str("abc");
        let _ = buffer.string();

        buffer.reset();

        assert_eq!(buffer.write_count(), 0);
        assert_eq!(buffer.read_count(), 0);
        assert_eq!(buffer.string(), "");
    }

    #[test]
    fn io_write_and_stream_reach_the_buffer() {
        let buffer = VerifiedBuffer::new();
        let mut handle = buffer.clone();
        handle.write_all(b"one ").expect("write");
        buffer.stream().write_all(b"two").expect("write");

        assert_eq!(buffer.string(), "one two");
        assert_eq!(buffer.write_count(), 2);
    }

    #[test]
    fn concurrent_writes_are_not_lost() {
        let buffer = VerifiedBuffer::new();
        let tokens: Vec<String> = (0..32).map(|n| format!("<token-{n:02}>")).collect();

        thread::scope(|s| {
            for token in &tokens {
                let buffer = buffer.clone();
                s.spawn(move || buffer.write_str(token).expect("write"));
            }
        });

        let out = buffer.string();
        assert_eq!(buffer.write_count(), tokens.len());
        assert_eq!(out.len(), tokens.iter().map(String::len).sum::<usize>());
        for token in &tokens {
            assert_eq!(out.matches(token.as_str()).count(), 1, "{token}");
        }
    }

    #[test]
    fn dry_passes_when_untouched() {
        let spy = Spy::new();
        let buffer = VerifiedBuffer::dry(&spy, "stdout");
        assert_eq!(buffer.kind(), BufferKind::Dry);

        spy.close();

        assert_eq!(spy.cleanup_count(), 1);
        assert!(!spy.failed());
    }

    #[test]
    fn dry_fails_with_written_content() {
        let spy = Spy::new();
        let buffer = VerifiedBuffer::dry(&spy, "stdout");
        buffer.must_write_str("unexpected\n");

        spy.close();

        assert_eq!(
            spy.failures(),
            vec!["expected stdout buffer to be empty:\n\twant: \n\thave: \"unexpected\\n\""]
        );
    }

    #[test]
    fn dry_fails_even_after_read() {
        let spy = Spy::new();
        let buffer = VerifiedBuffer::dry(&spy, "");
        buffer.must_write_str("x");
        let _ = buffer.string();

        spy.close();

        assert_eq!(
            spy.failures(),
            vec!["expected buffer to be empty:\n\twant: \n\thave: \"x\""]
        );
    }

    #[test]
    fn dry_skip_checks() {
        let spy = Spy::new();
        let buffer = VerifiedBuffer::dry(&spy, "stdout");
        buffer.must_write_str("anything");
        buffer.skip_checks();

        spy.close();

        assert!(!spy.failed());
    }

    #[test]
    fn wet_fails_when_empty() {
        let spy = Spy::new();
        let buffer = VerifiedBuffer::wet(&spy, "stderr");
        assert_eq!(buffer.kind(), BufferKind::Wet);

        spy.close();

        assert_eq!(spy.failures(), vec!["expected stderr buffer not to be empty"]);
    }

    #[test]
    fn wet_fails_when_not_examined() {
        let spy = Spy::new();
        let buffer = VerifiedBuffer::wet(&spy, "stderr");
        buffer.must_write_str("written");

        spy.close();

        assert_eq!(
            spy.failures(),
            vec!["expected stderr buffer to be examined with String or Buffer methods"]
        );
    }

    #[test]
    fn wet_fails_when_examined_before_reset() {
        let spy = Spy::new();
        let buffer = VerifiedBuffer::wet(&spy, "");
        buffer.must_write_str("first");
        let _ = buffer.string();
        buffer.reset();
        buffer.must_write_str("second");

        spy.close();

        assert_eq!(
            spy.failures(),
            vec!["expected buffer to be examined with String or Buffer methods"]
        );
    }

    #[test]
    fn wet_passes_when_written_and_examined() {
        let spy = Spy::new();
        let buffer = VerifiedBuffer::wet(&spy, "stdout");
        buffer.must_write_str("hello");
        assert_eq!(buffer.string(), "hello");

        spy.close();

        assert!(!spy.failed());
    }

    #[test]
    fn wet_skip_checks() {
        let spy = Spy::new();
        let buffer = VerifiedBuffer::wet(&spy, "stdout");
        buffer.skip_checks();

        spy.close();

        assert!(!spy.failed());
    }

    #[test]
    fn wet_buffer_in_scope() {
        let scope = Scope::new("wet_buffer_in_scope");
        let buffer = VerifiedBuffer::wet(&scope, "stdout");
        buffer.must_write_str("data");
        let _ = buffer.string();

        assert!(scope.finish().is_empty());
    }
}
