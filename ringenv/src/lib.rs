//! `ringenv`: print the program environment, optionally modified.
//!
//! The program body, [`run`], only talks to the outside world through the
//! [`Ring`] it is given, so tests drive it with buffers and a synthetic
//! environment.

pub mod cli;
pub mod exit_codes;
pub mod logging;

use std::collections::BTreeMap;
use std::io::Write;

use anyhow::{Context, Result, bail};
use clap::Parser;
use clap::error::ErrorKind;
use ringctx::Ring;
use tracing::debug;

use crate::cli::{Cli, is_assignment};

/// Run `ringenv` with the name, arguments, environment and streams of
/// `ring`. Returns the process exit code.
pub fn run(ring: &Ring) -> i32 {
    match execute(ring) {
        Ok(code) => code,
        Err(err) => {
            let _ = writeln!(ring.stderr(), "{}: {:#}", display_name(ring), err);
            exit_codes::INVALID
        }
    }
}

fn execute(ring: &Ring) -> Result<i32> {
    let argv = std::iter::once(display_name(ring).to_string()).chain(ring.args().iter().cloned());
    let cli = match Cli::try_parse_from(argv) {
        Ok(cli) => cli,
        Err(err) => return usage(ring, &err),
    };
    debug!(?cli, "ringenv parsed");

    let ring = apply(ring, &cli)?;
    let mut out = ring.stdout();

    if let Some(key) = &cli.get {
        let Some(value) = ring.env_lookup(key) else {
            writeln!(ring.stderr(), "{}: {}: not set", display_name(&ring), key)
                .context("write stderr")?;
            return Ok(exit_codes::NOT_FOUND);
        };
        writeln!(out, "{value}").context("write stdout")?;
        return Ok(exit_codes::OK);
    }

    if cli.json {
        let env = ring.env();
        let vars: BTreeMap<&str, &str> = env.iter().collect();
        let payload = serde_json::to_string_pretty(&vars).context("serialize environment")?;
        writeln!(out, "{payload}").context("write stdout")?;
        return Ok(exit_codes::OK);
    }

    let mut lines = ring.env_all();
    lines.sort();
    for line in lines {
        writeln!(out, "{line}").context("write stdout")?;
    }
    Ok(exit_codes::OK)
}

/// Apply `-i`, `-u` and assignments, in that order, to a copy of `ring`.
fn apply(ring: &Ring, cli: &Cli) -> Result<Ring> {
    if let Some(bad) = cli.assignments.iter().find(|arg| !is_assignment(arg)) {
        bail!("invalid assignment {bad:?}: expected NAME=VALUE");
    }

    let mut next = if cli.ignore_environment {
        ring.with_env(Vec::<String>::new())
    } else {
        ring.clone()
    };
    for key in &cli.unset {
        next = next.env_unset(key);
    }
    if !cli.assignments.is_empty() {
        next = next.env_set_bulk(&cli.assignments);
    }
    debug!(
        unset = cli.unset.len(),
        assigned = cli.assignments.len(),
        "environment applied"
    );
    Ok(next)
}

/// Print help and version to stdout, usage errors to stderr.
fn usage(ring: &Ring, err: &clap::Error) -> Result<i32> {
    let rendered = err.render().to_string();
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            write!(ring.stdout(), "{rendered}").context("write stdout")?;
            Ok(exit_codes::OK)
        }
        _ => {
            write!(ring.stderr(), "{rendered}").context("write stderr")?;
            Ok(exit_codes::INVALID)
        }
    }
}

fn display_name(ring: &Ring) -> &str {
    if ring.name().is_empty() {
        "ringenv"
    } else {
        ring.name()
    }
}
