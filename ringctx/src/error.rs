//! Error type for fallible ring operations.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// The ring was created without filesystem access.
    #[error("no filesystem access")]
    NoFsAccess,

    /// A path escapes the filesystem root or is absolute.
    #[error("invalid path {path}: must be relative and stay under the root")]
    InvalidPath { path: PathBuf },

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A required metadata key is missing.
    #[error("required ring metadata key: {key}")]
    MissingMeta { key: String },

    /// A metadata key holds a value of an unexpected type.
    #[error("invalid ring metadata key: {key}")]
    InvalidMeta { key: String },

    #[error("fixture {path}: {message}")]
    Fixture { path: PathBuf, message: String },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
