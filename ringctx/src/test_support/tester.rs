//! Test helper producing rings wired to verified buffers.

use std::io::Cursor;

use tempfile::TempDir;

use crate::clock::{self, Clock};
use crate::context::Ring;
use crate::env::Env;
use crate::error::{Error, Result};
use crate::fs::FsRoot;
use crate::meta::Meta;
use crate::streams::{InStream, OutStream, StdIo, Streams};
use crate::test_support::buffer::VerifiedBuffer;
use crate::test_support::scope::TestHandle;

/// Builds [`Ring`]s for a program under test.
///
/// By default standard output and standard error are dry buffers: the test
/// fails if the program writes to them. Call [`Tester::wet_stdout`] or
/// [`Tester::wet_stderr`] when output is expected, and read it back with
/// [`Tester::stdout`] / [`Tester::stderr`].
pub struct Tester<'t> {
    handle: &'t dyn TestHandle,
    env: Env,
    meta: Meta,
    stdin: InStream,
    stdout: VerifiedBuffer,
    stderr: VerifiedBuffer,
    clock: Clock,
    name: String,
    fs: Option<FsRoot>,
    temp: Option<TempDir>,
}

impl<'t> Tester<'t> {
    /// Tester with empty stdin, dry stdout and stderr, the process
    /// environment and name, the system clock and no metadata.
    pub fn new(handle: &'t dyn TestHandle) -> Self {
        handle.helper();
        let name = std::env::args_os()
            .next()
            .map(|arg| arg.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            handle,
            env: Env::from_os(),
            meta: Meta::new(),
            stdin: InStream::empty(),
            stdout: VerifiedBuffer::dry(handle, "stdout"),
            stderr: VerifiedBuffer::dry(handle, "stderr"),
            clock: clock::system(),
            name,
            fs: None,
            temp: None,
        }
    }

    /// Replace the environment with `KEY=VALUE` lines.
    pub fn with_env<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.env = Env::new(lines);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Use `meta` as the template copied into every produced ring.
    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Serve `input` on standard input.
    pub fn with_stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = InStream::new(Cursor::new(input.into()));
        self
    }

    pub fn with_fs(mut self, root: FsRoot) -> Self {
        self.fs = Some(root);
        self
    }

    /// Give produced rings a fresh temporary directory as filesystem root.
    /// The directory lives as long as the tester.
    pub fn with_temp_fs(mut self) -> Result<Self> {
        let temp = tempfile::tempdir().map_err(|err| Error::io(std::env::temp_dir(), err))?;
        self.fs = Some(FsRoot::new(temp.path()));
        self.temp = Some(temp);
        Ok(self)
    }

    /// Expect the program to write to standard output.
    pub fn wet_stdout(mut self) -> Self {
        self.handle.helper();
        self.stdout = VerifiedBuffer::wet(self.handle, "stdout");
        self
    }

    /// Expect the program to write to standard error.
    pub fn wet_stderr(mut self) -> Self {
        self.handle.helper();
        self.stderr = VerifiedBuffer::wet(self.handle, "stderr");
        self
    }

    /// Discard everything written to standard output so far.
    pub fn reset_stdout(&self) {
        self.stdout.reset();
    }

    /// Discard everything written to standard error so far.
    pub fn reset_stderr(&self) {
        self.stderr.reset();
    }

    /// Ring for one program run with `args`.
    ///
    /// The ring gets its own copy of the environment and of the metadata, so
    /// runs do not leak into each other or into the tester.
    pub fn ring<I, S>(&self, args: I) -> Ring
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut builder = Ring::builder()
            .env(self.env.all())
            .meta(self.meta.detach())
            .clock(self.clock.clone())
            .args(args)
            .name(self.name.clone())
            .stdin(self.stdin.clone())
            .stdout(self.stdout.stream())
            .stderr(self.stderr.stream());
        if let Some(root) = &self.fs {
            builder = builder.fs(root.clone());
        }
        builder.build()
    }

    /// The tester's standard streams.
    pub fn streams(&self) -> StdIo {
        StdIo::new(
            self.stdin.clone(),
            self.stdout.stream(),
            self.stderr.stream(),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn clock(&self) -> Clock {
        self.clock.clone()
    }

    pub fn fs(&self) -> Option<&FsRoot> {
        self.fs.as_ref()
    }

    /// Everything written to standard output. Counts as examining it.
    pub fn stdout(&self) -> String {
        self.stdout.string()
    }

    /// Everything written to standard error. Counts as examining it.
    pub fn stderr(&self) -> String {
        self.stderr.string()
    }

    pub fn stdout_buffer(&self) -> &VerifiedBuffer {
        &self.stdout
    }

    pub fn stderr_buffer(&self) -> &VerifiedBuffer {
        &self.stderr
    }
}

impl Streams for Tester<'_> {
    fn stdin(&self) -> InStream {
        self.stdin.clone()
    }

    fn stdout(&self) -> OutStream {
        self.stdout.stream()
    }

    fn stderr(&self) -> OutStream {
        self.stderr.stream()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Scope, Spy, sort};
    use chrono::{TimeZone, Utc};
    use std::io::Write;

    #[test]
    fn new_registers_dry_buffers() {
        let spy = Spy::new();
        let tst = Tester::new(&spy);
        spy.close();

        assert_eq!(spy.cleanup_count(), 2);
        assert!(!spy.failed());
        assert_eq!(sort(tst.env().all()), sort(Env::from_os().all()));
        assert!(tst.meta().is_empty());
        assert!(tst.fs().is_none());
    }

    #[test]
    fn ring_carries_tester_state() {
        let scope = Scope::new("ring_carries_tester_state");
        let instant = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
        let meta = Meta::new();
        meta.set("user", "alice".to_string());
        let tst = Tester::new(&scope)
            .with_env(["A=1", "B=2"])
            .with_name("prog")
            .with_meta(meta)
            .with_clock(clock::fixed(instant))
            .with_stdin("input");

        let ring = tst.ring(["-v", "file"]);

        assert_eq!(ring.name(), "prog");
        assert_eq!(ring.args(), ["-v", "file"]);
        assert_eq!(sort(ring.env_all()), vec!["A=1", "B=2"]);
        assert_eq!(ring.meta_get::<String>("user"), Some("alice".to_string()));
        assert_eq!(ring.now(), instant);
        assert_eq!(ring.stdin().read_to_string().expect("read"), "input");
        assert!(matches!(ring.fs(), Err(Error::NoFsAccess)));
        assert!(scope.finish().is_empty());
    }

    #[test]
    fn ring_gets_detached_metadata() {
        let scope = Scope::new("ring_gets_detached_metadata");
        let tst = Tester::new(&scope).with_env(Vec::<String>::new());

        let first = tst.ring(Vec::<String>::new());
        first.meta_set("run", 1_u8);
        let second = tst.ring(Vec::<String>::new());

        assert!(tst.meta().is_empty());
        assert_eq!(second.meta_get::<u8>("run"), None);
        assert!(scope.finish().is_empty());
    }

    #[test]
    fn empty_env_is_not_replaced_by_process_env() {
        let scope = Scope::new("empty_env");
        let tst = Tester::new(&scope).with_env(Vec::<String>::new());
        let ring = tst.ring(Vec::<String>::new());
        assert!(!ring.env_is_nil());
        assert!(ring.env_all().is_empty());
        assert!(scope.finish().is_empty());
    }

    #[test]
    fn wet_stdout_but_dry() {
        let spy = Spy::new();
        let _tst = Tester::new(&spy).wet_stdout();

        spy.close();

        assert_eq!(spy.failures(), vec!["expected stdout buffer not to be empty"]);
    }

    #[test]
    fn dry_stdout_but_wet() {
        let spy = Spy::new();
        let tst = Tester::new(&spy);
        write!(tst.ring(Vec::<String>::new()).stdout(), "out").expect("write");

        spy.close();

        assert_eq!(
            spy.failures(),
            vec!["expected stdout buffer to be empty:\n\twant: \n\thave: \"out\""]
        );
    }

    #[test]
    fn wet_stderr_but_dry() {
        let spy = Spy::new();
        let _tst = Tester::new(&spy).wet_stderr();

        spy.close();

        assert_eq!(spy.failures(), vec!["expected stderr buffer not to be empty"]);
    }

    #[test]
    fn dry_stderr_but_wet() {
        let spy = Spy::new();
        let tst = Tester::new(&spy);
        write!(tst.streams().stderr(), "err").expect("write");

        spy.close();

        assert_eq!(
            spy.failures(),
            vec!["expected stderr buffer to be empty:\n\twant: \n\thave: \"err\""]
        );
    }

    #[test]
    fn wet_outputs_written_and_examined() {
        let scope = Scope::new("wet_outputs");
        let tst = Tester::new(&scope).wet_stdout().wet_stderr();
        let ring = tst.ring(Vec::<String>::new());

        write!(ring.stdout(), "out").expect("write");
        write!(ring.stderr(), "err").expect("write");

        assert_eq!(tst.stdout(), "out");
        assert_eq!(tst.stderr(), "err");
        assert!(scope.finish().is_empty());
    }

    #[test]
    fn reset_outputs() {
        let scope = Scope::new("reset_outputs");
        let tst = Tester::new(&scope);
        write!(Streams::stdout(&tst), "out").expect("write");
        write!(Streams::stderr(&tst), "err").expect("write");

        tst.reset_stdout();
        tst.reset_stderr();

        assert_eq!(tst.stdout_buffer().write_count(), 0);
        assert_eq!(tst.stderr_buffer().write_count(), 0);
        assert!(scope.finish().is_empty());
    }

    #[test]
    fn temp_fs_is_shared_by_rings() {
        let scope = Scope::new("temp_fs");
        let tst = Tester::new(&scope)
            .with_env(Vec::<String>::new())
            .with_temp_fs()
            .expect("temp fs");

        let first = tst.ring(Vec::<String>::new());
        first.fs().expect("fs").write("a.txt", "data").expect("write");
        let second = tst.ring(Vec::<String>::new());

        assert_eq!(
            second.fs().expect("fs").read_to_string("a.txt").expect("read"),
            "data"
        );
        assert!(scope.finish().is_empty());
    }
}
