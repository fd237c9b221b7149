//! TOML fixtures describing a program run under test.
//!
//! ```toml
//! name = "greet"
//! args = ["--loud", "world"]
//! stdin = "piped input"
//! clock = "2025-01-01T00:00:00Z"
//! inherit_env = false
//!
//! [env]
//! LANG = "C"
//!
//! [expect]
//! stdout = "wet"
//! stderr = "dry"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::clock;
use crate::env::Env;
use crate::error::{Error, Result};
use crate::test_support::scope::TestHandle;
use crate::test_support::tester::Tester;

/// A parsed fixture file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Fixture {
    /// Program name; defaults to the test binary's name.
    pub name: Option<String>,
    /// Program arguments, without the program name.
    pub args: Vec<String>,
    /// Data served on standard input.
    pub stdin: Option<String>,
    /// RFC 3339 instant the clock is frozen at; the system clock when unset.
    pub clock: Option<String>,
    /// Start from the process environment instead of an empty one.
    pub inherit_env: bool,
    /// Variables set on top of the starting environment.
    pub env: BTreeMap<String, String>,
    pub expect: Expect,
}

/// Expected use of the output streams.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Expect {
    pub stdout: Expectation,
    pub stderr: Expectation,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    /// Nothing may be written.
    #[default]
    Dry,
    /// Something must be written and examined.
    Wet,
}

impl Fixture {
    /// Load and validate a fixture file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|err| Error::io(path, err))?;
        let fixture = Self::parse(path, &contents)?;
        debug!(path = %path.display(), "fixture loaded");
        Ok(fixture)
    }

    /// Parse and validate fixture text.
    pub fn parse_str(contents: &str) -> Result<Self> {
        Self::parse(Path::new("<inline>"), contents)
    }

    fn parse(path: &Path, contents: &str) -> Result<Self> {
        let fixture: Fixture = toml::from_str(contents).map_err(|err| Error::Fixture {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        fixture.validate().map_err(|message| Error::Fixture {
            path: path.to_path_buf(),
            message,
        })?;
        Ok(fixture)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if let Some(name) = &self.name
            && name.trim().is_empty()
        {
            return Err("name must be non-empty when set".to_string());
        }
        for key in self.env.keys() {
            if key.is_empty() || key.contains('=') {
                return Err(format!("env key {key:?} must be non-empty and contain no '='"));
            }
        }
        self.instant()?;
        Ok(())
    }

    fn instant(&self) -> std::result::Result<Option<DateTime<Utc>>, String> {
        let Some(raw) = &self.clock else {
            return Ok(None);
        };
        DateTime::parse_from_rfc3339(raw)
            .map(|instant| Some(instant.with_timezone(&Utc)))
            .map_err(|err| format!("clock {raw:?}: {err}"))
    }

    /// The frozen clock instant, if the fixture sets one.
    pub fn clock_instant(&self) -> Option<DateTime<Utc>> {
        self.instant().ok().flatten()
    }

    /// Environment the program starts with.
    pub fn environment(&self) -> Env {
        let mut env = if self.inherit_env {
            Env::from_os()
        } else {
            Env::default()
        };
        env.set_from(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        env
    }

    /// Build a [`Tester`] configured by this fixture.
    pub fn tester<'t>(&self, handle: &'t dyn TestHandle) -> Tester<'t> {
        handle.helper();
        let mut tester = Tester::new(handle).with_env(self.environment().all());
        if let Some(name) = &self.name {
            tester = tester.with_name(name.as_str());
        }
        if let Some(input) = &self.stdin {
            tester = tester.with_stdin(input.as_str());
        }
        if let Some(instant) = self.clock_instant() {
            tester = tester.with_clock(clock::fixed(instant));
        }
        if self.expect.stdout == Expectation::Wet {
            tester = tester.wet_stdout();
        }
        if self.expect.stderr == Expectation::Wet {
            tester = tester.wet_stderr();
        }
        tester
    }
}

/// Load every `*.toml` fixture in `dir`, sorted by file name.
pub fn discover(dir: &Path) -> Result<Vec<(PathBuf, Fixture)>> {
    let entries = fs::read_dir(dir).map_err(|err| Error::io(dir, err))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|err| Error::io(dir, err))?.path();
        if path.extension().is_some_and(|ext| ext == "toml") {
            paths.push(path);
        }
    }
    paths.sort();
    paths
        .into_iter()
        .map(|path| {
            let fixture = Fixture::load(&path)?;
            Ok((path, fixture))
        })
        .collect()
}
