//! Filesystem capability handed to a program through its [`Ring`](crate::Ring).
//!
//! A ring only exposes the filesystem when it was configured with an
//! [`FsRoot`]. All paths are relative to the root; absolute paths and `..`
//! components are rejected. The actual I/O is delegated to [`std::fs`].

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

/// Directory the program may access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsRoot {
    root: PathBuf,
}

impl FsRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `rel` against the root.
    pub fn path(&self, rel: impl AsRef<Path>) -> Result<PathBuf> {
        let rel = rel.as_ref();
        let escapes = rel.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes {
            return Err(Error::InvalidPath {
                path: rel.to_path_buf(),
            });
        }
        Ok(self.root.join(rel))
    }

    pub fn exists(&self, rel: impl AsRef<Path>) -> Result<bool> {
        Ok(self.path(rel)?.exists())
    }

    pub fn read_to_string(&self, rel: impl AsRef<Path>) -> Result<String> {
        let path = self.path(rel)?;
        debug!(path = %path.display(), "fs read");
        fs::read_to_string(&path).map_err(|err| Error::io(path, err))
    }

    /// Write `contents` to `rel`, creating parent directories as needed.
    pub fn write(&self, rel: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Result<()> {
        let path = self.path(rel)?;
        debug!(path = %path.display(), "fs write");
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
        }
        fs::write(&path, contents).map_err(|err| Error::io(path, err))
    }

    pub fn create_dir_all(&self, rel: impl AsRef<Path>) -> Result<()> {
        let path = self.path(rel)?;
        fs::create_dir_all(&path).map_err(|err| Error::io(path, err))
    }
}
