//! Directory-scoped JSON file helpers shared by the checkpoint and snapshot
//! stores.
//!
//! Writes go to a `.tmp` sibling that is renamed over the target, so a crash
//! mid-write leaves either the previous file or the new one.

use std::fmt::Write as _;
use std::io::{ErrorKind, Write as _};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs::OpenOptions;
use cap_std::fs_utf8::Dir;

use crate::github::locator::RepositoryLocator;

use super::error::PersistenceError;

/// A directory holding one state file per repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StateDir {
    path: Utf8PathBuf,
}

impl StateDir {
    pub(crate) fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub(crate) fn file_path(&self, file_name: &str) -> Utf8PathBuf {
        self.path.join(file_name)
    }

    fn open_existing(&self) -> Result<Option<Dir>, PersistenceError> {
        match Dir::open_ambient_dir(&self.path, ambient_authority()) {
            Ok(dir) => Ok(Some(dir)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(self.directory_error(&error)),
        }
    }

    fn open_or_create(&self) -> Result<Dir, PersistenceError> {
        let (base, relative) = if self.path.is_absolute() {
            let stripped = self
                .path
                .strip_prefix("/")
                .map_err(|error| PersistenceError::Directory {
                    path: self.path.to_string(),
                    message: error.to_string(),
                })?;
            (Utf8Path::new("/"), stripped)
        } else {
            (Utf8Path::new("."), self.path.as_path())
        };

        let root = Dir::open_ambient_dir(base, ambient_authority())
            .map_err(|error| self.directory_error(&error))?;
        if relative.as_str().is_empty() || relative == Utf8Path::new(".") {
            return Ok(root);
        }
        root.create_dir_all(relative)
            .map_err(|error| self.directory_error(&error))?;
        root.open_dir(relative)
            .map_err(|error| self.directory_error(&error))
    }

    fn directory_error(&self, error: &std::io::Error) -> PersistenceError {
        PersistenceError::Directory {
            path: self.path.to_string(),
            message: error.to_string(),
        }
    }

    /// Reads a file, returning `None` when it or the directory is missing.
    pub(crate) fn read(&self, file_name: &str) -> Result<Option<String>, PersistenceError> {
        let Some(dir) = self.open_existing()? else {
            return Ok(None);
        };
        match dir.read_to_string(file_name) {
            Ok(content) => Ok(Some(content)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(PersistenceError::Read {
                path: self.file_path(file_name).to_string(),
                message: error.to_string(),
            }),
        }
    }

    /// Replaces a file's contents through a temporary sibling.
    pub(crate) fn write_atomic(
        &self,
        file_name: &str,
        contents: &str,
    ) -> Result<(), PersistenceError> {
        let dir = self.open_or_create()?;
        let temporary = format!("{file_name}.tmp");
        let write_error = |error: std::io::Error| PersistenceError::Write {
            path: self.file_path(file_name).to_string(),
            message: error.to_string(),
        };

        dir.write(&temporary, contents).map_err(write_error)?;
        dir.rename(&temporary, &dir, file_name).map_err(write_error)
    }

    /// Appends `line` and a newline to a file, creating it when missing.
    pub(crate) fn append_line(&self, file_name: &str, line: &str) -> Result<(), PersistenceError> {
        let dir = self.open_or_create()?;
        let write_error = |error: std::io::Error| PersistenceError::Write {
            path: self.file_path(file_name).to_string(),
            message: error.to_string(),
        };

        let mut options = OpenOptions::new();
        options.create(true).append(true);
        let mut file = dir.open_with(file_name, &options).map_err(write_error)?;
        writeln!(file, "{line}").map_err(write_error)?;
        file.flush().map_err(write_error)
    }

    /// Deletes a file; a missing file is not an error.
    pub(crate) fn remove(&self, file_name: &str) -> Result<(), PersistenceError> {
        let Some(dir) = self.open_existing()? else {
            return Ok(());
        };
        match dir.remove_file(file_name) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(PersistenceError::Remove {
                path: self.file_path(file_name).to_string(),
                message: error.to_string(),
            }),
        }
    }
}

/// Escapes every byte outside `[A-Za-z0-9.-]` as `_xx` (lowercase hex).
///
/// An escaped segment never contains `__`, so the stem separator stays
/// unambiguous and distinct repositories never share a file.
fn sanitise_segment(segment: &str) -> String {
    let mut escaped = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.') {
            escaped.push(char::from(byte));
        } else {
            let _infallible = write!(escaped, "_{byte:02x}");
        }
    }
    escaped
}

/// File stem identifying a repository: `{owner}__{name}`.
pub(crate) fn repository_stem(locator: &RepositoryLocator) -> String {
    format!(
        "{}__{}",
        sanitise_segment(locator.owner().as_str()),
        sanitise_segment(locator.repository().as_str())
    )
}
