//! The program execution context.
//!
//! A [`Ring`] bundles standard streams, environment variables, program name
//! and arguments, a clock, metadata and an optional filesystem root. Program
//! entry points take a `Ring` instead of reaching for process globals, so
//! tests can hand them buffers and a synthetic environment.
//!
//! Every `with_*` and `env_*` method returns a new `Ring` and leaves the
//! receiver untouched. The environment is copied before it is changed, so
//! rings that share an ancestor never see each other's environment edits.
//! Metadata is the exception: [`Ring::meta_set`] and [`Ring::meta_delete`]
//! write to the shared [`Meta`] store, and every ring holding that store
//! observes the change.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::clock::{self, Clock};
use crate::env::Env;
use crate::error::{Error, Result};
use crate::fs::FsRoot;
use crate::meta::{Meta, MetaValue};
use crate::streams::{InStream, OutStream, StdIo, Streams};

/// One construction option for [`Ring::new`].
///
/// Settings are applied in order; a later setting replaces an earlier one
/// touching the same field.
pub enum Setting {
    /// Environment as `KEY=VALUE` lines.
    Env(Vec<String>),
    /// Program arguments, without the program name.
    Args(Vec<String>),
    Name(String),
    Clock(Clock),
    /// Metadata store. The ring shares it with the caller.
    Meta(Meta),
    Stdin(InStream),
    Stdout(OutStream),
    Stderr(OutStream),
    Fs(FsRoot),
}

/// Program execution context.
#[derive(Clone)]
pub struct Ring {
    io: StdIo,
    env: Option<Arc<Env>>,
    meta: Option<Meta>,
    clock: Clock,
    args: Vec<String>,
    name: String,
    fs: Option<FsRoot>,
}

#[derive(Default)]
struct Draft {
    stdin: Option<InStream>,
    stdout: Option<OutStream>,
    stderr: Option<OutStream>,
    env: Option<Env>,
    meta: Option<Meta>,
    clock: Option<Clock>,
    args: Option<Vec<String>>,
    name: Option<String>,
    fs: Option<FsRoot>,
}

impl Draft {
    fn apply(&mut self, setting: Setting) {
        match setting {
            Setting::Env(lines) => self.env = Some(Env::new(lines)),
            Setting::Args(args) => self.args = Some(args),
            Setting::Name(name) => self.name = Some(name),
            Setting::Clock(clock) => self.clock = Some(clock),
            Setting::Meta(meta) => self.meta = Some(meta),
            Setting::Stdin(stdin) => self.stdin = Some(stdin),
            Setting::Stdout(stdout) => self.stdout = Some(stdout),
            Setting::Stderr(stderr) => self.stderr = Some(stderr),
            Setting::Fs(root) => self.fs = Some(root),
        }
    }

    /// Fill every unset field from the running process.
    fn finish(self) -> Ring {
        let (argv0, argv) = if self.name.is_none() || self.args.is_none() {
            process_args()
        } else {
            (String::new(), Vec::new())
        };
        debug!(
            process_env = self.env.is_none(),
            process_args = self.args.is_none(),
            process_name = self.name.is_none(),
            "resolving ring defaults"
        );

        Ring {
            io: StdIo::new(
                self.stdin.unwrap_or_else(InStream::stdin),
                self.stdout.unwrap_or_else(OutStream::stdout),
                self.stderr.unwrap_or_else(OutStream::stderr),
            ),
            env: Some(Arc::new(self.env.unwrap_or_else(Env::from_os))),
            meta: Some(self.meta.unwrap_or_default()),
            clock: self.clock.unwrap_or_else(clock::system),
            args: self.args.unwrap_or(argv),
            name: self.name.unwrap_or(argv0),
            fs: self.fs,
        }
    }
}

fn process_args() -> (String, Vec<String>) {
    let mut argv = std::env::args_os().map(|arg| arg.to_string_lossy().into_owned());
    let name = argv.next().unwrap_or_default();
    (name, argv.collect())
}

/// Fluent construction of a [`Ring`]; each call records one [`Setting`].
#[derive(Default)]
pub struct RingBuilder {
    settings: Vec<Setting>,
}

impl RingBuilder {
    pub fn env<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines = lines.into_iter().map(Into::into).collect();
        self.settings.push(Setting::Env(lines));
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args = args.into_iter().map(Into::into).collect();
        self.settings.push(Setting::Args(args));
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.settings.push(Setting::Name(name.into()));
        self
    }

    pub fn clock(mut self, clock: Clock) -> Self {
        self.settings.push(Setting::Clock(clock));
        self
    }

    pub fn meta(mut self, meta: Meta) -> Self {
        self.settings.push(Setting::Meta(meta));
        self
    }

    pub fn stdin(mut self, stdin: InStream) -> Self {
        self.settings.push(Setting::Stdin(stdin));
        self
    }

    pub fn stdout(mut self, stdout: OutStream) -> Self {
        self.settings.push(Setting::Stdout(stdout));
        self
    }

    pub fn stderr(mut self, stderr: OutStream) -> Self {
        self.settings.push(Setting::Stderr(stderr));
        self
    }

    pub fn fs(mut self, root: FsRoot) -> Self {
        self.settings.push(Setting::Fs(root));
        self
    }

    pub fn build(self) -> Ring {
        Ring::new(self.settings)
    }
}

impl Ring {
    /// Create a ring from `settings`, applied in order.
    ///
    /// Fields no setting touches default to the running process: real
    /// standard streams, the process environment, `argv[1..]` as arguments,
    /// `argv[0]` as the name, the UTC wall clock and an empty metadata store.
    /// Filesystem access is only granted by [`Setting::Fs`].
    pub fn new(settings: impl IntoIterator<Item = Setting>) -> Self {
        let mut draft = Draft::default();
        for setting in settings {
            draft.apply(setting);
        }
        draft.finish()
    }

    pub fn builder() -> RingBuilder {
        RingBuilder::default()
    }

    pub fn stdin(&self) -> InStream {
        self.io.stdin()
    }

    pub fn stdout(&self) -> OutStream {
        self.io.stdout()
    }

    pub fn stderr(&self) -> OutStream {
        self.io.stderr()
    }

    pub fn clock(&self) -> Clock {
        Arc::clone(&self.clock)
    }

    /// Current time according to the ring's clock.
    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Program arguments, without the program name.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_stdin(&self, stdin: InStream) -> Ring {
        let mut ring = self.clone();
        ring.io = ring.io.with_stdin(stdin);
        ring
    }

    pub fn with_stdout(&self, stdout: OutStream) -> Ring {
        let mut ring = self.clone();
        ring.io = ring.io.with_stdout(stdout);
        ring
    }

    pub fn with_stderr(&self, stderr: OutStream) -> Ring {
        let mut ring = self.clone();
        ring.io = ring.io.with_stderr(stderr);
        ring
    }

    pub fn with_args<I, S>(&self, args: I) -> Ring
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ring = self.clone();
        ring.args = args.into_iter().map(Into::into).collect();
        ring
    }

    pub fn with_name(&self, name: impl Into<String>) -> Ring {
        let mut ring = self.clone();
        ring.name = name.into();
        ring
    }

    pub fn with_clock(&self, clock: Clock) -> Ring {
        let mut ring = self.clone();
        ring.clock = clock;
        ring
    }

    /// Return a ring that uses `meta` as its metadata store.
    pub fn with_meta(&self, meta: Meta) -> Ring {
        let mut ring = self.clone();
        ring.meta = Some(meta);
        ring
    }

    pub fn with_fs(&self, root: FsRoot) -> Ring {
        let mut ring = self.clone();
        ring.fs = Some(root);
        ring
    }

    /// Filesystem root the program may use.
    ///
    /// Fails with [`Error::NoFsAccess`] when the ring was not given one.
    pub fn fs(&self) -> Result<&FsRoot> {
        self.fs.as_ref().ok_or(Error::NoFsAccess)
    }

    /// Independent copy of the environment.
    pub fn env(&self) -> Env {
        self.env.as_deref().cloned().unwrap_or_default()
    }

    /// Return true when no environment store was ever attached.
    pub fn env_is_nil(&self) -> bool {
        self.env.is_none()
    }

    pub fn env_lookup(&self, key: &str) -> Option<&str> {
        self.env.as_deref().and_then(|env| env.lookup(key))
    }

    pub fn env_get(&self, key: &str) -> &str {
        self.env_lookup(key).unwrap_or_default()
    }

    /// Environment as `KEY=VALUE` lines in no particular order.
    pub fn env_all(&self) -> Vec<String> {
        self.env.as_deref().map(Env::all).unwrap_or_default()
    }

    /// Return a ring with a fresh environment parsed from `lines`.
    pub fn with_env<I, S>(&self, lines: I) -> Ring
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ring = self.clone();
        ring.env = Some(Arc::new(Env::new(lines)));
        ring
    }

    /// Return a ring with `key` set. The receiver keeps its environment.
    pub fn env_set(&self, key: impl Into<String>, value: impl Into<String>) -> Ring {
        let key = key.into();
        trace!(%key, "env copy on set");
        self.with_env_edit(|env| env.set(key, value))
    }

    /// Return a ring with `lines` added after the current environment, so
    /// they win over existing keys.
    pub fn env_set_bulk<I, S>(&self, lines: I) -> Ring
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        trace!("env copy on bulk set");
        self.with_env_edit(|env| env.set_with(lines))
    }

    /// Return a ring without `key`. The receiver keeps its environment.
    pub fn env_unset(&self, key: &str) -> Ring {
        trace!(%key, "env copy on unset");
        self.with_env_edit(|env| env.unset(key))
    }

    fn with_env_edit(&self, edit: impl FnOnce(&mut Env)) -> Ring {
        let mut env = self.env();
        edit(&mut env);
        let mut ring = self.clone();
        ring.env = Some(Arc::new(env));
        ring
    }

    /// The shared metadata store, if any.
    pub fn meta(&self) -> Option<&Meta> {
        self.meta.as_ref()
    }

    pub fn meta_lookup(&self, key: &str) -> Option<MetaValue> {
        self.meta.as_ref().and_then(|meta| meta.lookup(key))
    }

    pub fn meta_get<T: Any + Clone>(&self, key: &str) -> Option<T> {
        self.meta.as_ref().and_then(|meta| meta.get(key))
    }

    /// Return the value of a metadata key the caller cannot work without.
    ///
    /// Fails with [`Error::MissingMeta`] when the key is not set and with
    /// [`Error::InvalidMeta`] when it holds something other than a `T`.
    pub fn meta_required<T: Any + Clone>(&self, key: &str) -> Result<T> {
        let value = self.meta_lookup(key).ok_or_else(|| Error::MissingMeta {
            key: key.to_string(),
        })?;
        value
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| Error::InvalidMeta {
                key: key.to_string(),
            })
    }

    /// Set a metadata key in the shared store.
    ///
    /// Unlike the environment mutators this does not copy: every ring
    /// sharing the store, the receiver included, sees the new value. A ring
    /// without a store gets a fresh one in the returned ring only.
    pub fn meta_set<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) -> Ring {
        let mut ring = self.clone();
        ring.meta.get_or_insert_with(Meta::new).set(key, value);
        ring
    }

    /// Delete a metadata key from the shared store, visible to every ring
    /// sharing it.
    pub fn meta_delete(&self, key: &str) -> Ring {
        if let Some(meta) = &self.meta {
            meta.delete(key);
        }
        self.clone()
    }

    /// Independent snapshot of the metadata.
    pub fn meta_all(&self) -> HashMap<String, MetaValue> {
        self.meta.as_ref().map(Meta::snapshot).unwrap_or_default()
    }

    /// Return true for a ring with no environment store, no metadata, no
    /// arguments and no name, such as [`Ring::default`].
    pub fn is_zero(&self) -> bool {
        if self.env.is_some() {
            return false;
        }
        self.meta.as_ref().is_none_or(Meta::is_empty)
            && self.args.is_empty()
            && self.name.is_empty()
    }
}

/// The zero ring: process streams and clock, nothing else.
impl Default for Ring {
    fn default() -> Self {
        Self {
            io: StdIo::default(),
            env: None,
            meta: None,
            clock: clock::system(),
            args: Vec::new(),
            name: String::new(),
            fs: None,
        }
    }
}

impl Streams for Ring {
    fn stdin(&self) -> InStream {
        Ring::stdin(self)
    }

    fn stdout(&self) -> OutStream {
        Ring::stdout(self)
    }

    fn stderr(&self) -> OutStream {
        Ring::stderr(self)
    }
}

impl fmt::Debug for Ring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ring")
            .field("name", &self.name)
            .field("args", &self.args)
            .field("env_len", &self.env.as_deref().map(Env::len))
            .field("meta", &self.meta)
            .field("fs", &self.fs)
            .finish_non_exhaustive()
    }
}
