//! Error types for checkpoint and cache snapshot files.

use thiserror::Error;

use crate::github::error::IntakeError;

/// Errors returned while reading or writing pipeline state files.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
    /// A state directory could not be created or opened.
    #[error("failed to open state directory '{path}': {message}")]
    Directory {
        /// Directory that failed.
        path: String,
        /// Error detail from the filesystem.
        message: String,
    },

    /// A state file could not be read.
    #[error("failed to read '{path}': {message}")]
    Read {
        /// File that failed.
        path: String,
        /// Error detail from the filesystem.
        message: String,
    },

    /// A state file could not be written or moved into place.
    #[error("failed to write '{path}': {message}")]
    Write {
        /// File that failed.
        path: String,
        /// Error detail from the filesystem.
        message: String,
    },

    /// A state file could not be removed.
    #[error("failed to remove '{path}': {message}")]
    Remove {
        /// File that failed.
        path: String,
        /// Error detail from the filesystem.
        message: String,
    },

    /// State could not be encoded as JSON.
    #[error("failed to serialise '{path}': {message}")]
    Serialise {
        /// File that was being written.
        path: String,
        /// Encoder error detail.
        message: String,
    },
}

impl From<PersistenceError> for IntakeError {
    fn from(error: PersistenceError) -> Self {
        Self::Io {
            message: error.to_string(),
        }
    }
}
