//! Durable progress log for long-running fetch jobs.
//!
//! A checkpoint lists the pull request numbers a job has already handed to
//! its sink. It is rewritten after every fetched item, so a crashed or
//! aborted job resumes where it stopped. A finished job deletes its file.
//!
//! Fetched records are appended to a JSON-lines log beside the checkpoint,
//! so a resumed job can still report what earlier runs collected.

use std::collections::{BTreeMap, BTreeSet};

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::github::locator::RepositoryLocator;
use crate::github::models::PullRequestRecord;

use super::error::PersistenceError;
use super::files::{StateDir, repository_stem};

/// Progress of one fetch job against one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    repository: String,
    fetched_item_ids: BTreeSet<u64>,
    #[serde(default)]
    total_items_found: usize,
    #[serde(default)]
    completed: bool,
    last_updated: DateTime<Utc>,
}

impl Checkpoint {
    /// Starts an empty checkpoint for `repository` (`owner/name`).
    #[must_use]
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            fetched_item_ids: BTreeSet::new(),
            total_items_found: 0,
            completed: false,
            last_updated: Utc::now(),
        }
    }

    /// Repository this checkpoint belongs to.
    #[must_use]
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Whether the item was already fetched.
    #[must_use]
    pub fn contains(&self, number: u64) -> bool {
        self.fetched_item_ids.contains(&number)
    }

    /// Records a fetched item.
    pub fn record(&mut self, number: u64) {
        self.fetched_item_ids.insert(number);
        self.last_updated = Utc::now();
    }

    /// Number of fetched items.
    #[must_use]
    pub fn fetched_count(&self) -> usize {
        self.fetched_item_ids.len()
    }

    /// Fetched item numbers, ascending.
    pub fn fetched_item_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.fetched_item_ids.iter().copied()
    }

    /// Candidates discovered so far, including already fetched ones.
    #[must_use]
    pub const fn total_items_found(&self) -> usize {
        self.total_items_found
    }

    /// Updates the discovered-candidate count.
    pub fn set_total_items_found(&mut self, total: usize) {
        self.total_items_found = total;
        self.last_updated = Utc::now();
    }

    /// Whether the job finished.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.completed
    }

    /// Marks the job finished.
    pub fn mark_completed(&mut self) {
        self.completed = true;
        self.last_updated = Utc::now();
    }

    /// Time of the last mutation.
    #[must_use]
    pub const fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }
}

/// Reads and writes checkpoints under one directory.
///
/// Files are named `{owner}__{name}.checkpoint.json`; the record log
/// beside each one is `{owner}__{name}.records.jsonl`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointStore {
    dir: StateDir,
}

impl CheckpointStore {
    /// Creates a store rooted at `dir`. The directory is created on first
    /// save.
    #[must_use]
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            dir: StateDir::new(dir),
        }
    }

    fn file_name(locator: &RepositoryLocator) -> String {
        format!("{}.checkpoint.json", repository_stem(locator))
    }

    fn records_file_name(locator: &RepositoryLocator) -> String {
        format!("{}.records.jsonl", repository_stem(locator))
    }

    /// Full path of the checkpoint file for a repository.
    #[must_use]
    pub fn path_for(&self, locator: &RepositoryLocator) -> Utf8PathBuf {
        self.dir.file_path(&Self::file_name(locator))
    }

    /// Loads the checkpoint to resume from.
    ///
    /// Returns a fresh checkpoint when the file is missing, unreadable,
    /// corrupt, belongs to another repository, or records a finished job.
    #[must_use]
    pub fn load(&self, locator: &RepositoryLocator) -> Checkpoint {
        let repository = locator.full_name();
        let file_name = Self::file_name(locator);

        let content = match self.dir.read(&file_name) {
            Ok(Some(content)) => content,
            Ok(None) => return Checkpoint::new(repository),
            Err(error) => {
                warn!(%repository, %error, "checkpoint unreadable; starting fresh");
                return Checkpoint::new(repository);
            }
        };

        let checkpoint: Checkpoint = match serde_json::from_str(&content) {
            Ok(checkpoint) => checkpoint,
            Err(error) => {
                warn!(%repository, %error, "checkpoint corrupt; starting fresh");
                return Checkpoint::new(repository);
            }
        };

        if checkpoint.repository != repository {
            warn!(
                %repository,
                stored = %checkpoint.repository,
                "checkpoint belongs to another repository; starting fresh"
            );
            return Checkpoint::new(repository);
        }

        if checkpoint.completed {
            debug!(%repository, "previous job completed; starting fresh");
            return Checkpoint::new(repository);
        }

        debug!(
            %repository,
            fetched = checkpoint.fetched_count(),
            "resuming from checkpoint"
        );
        checkpoint
    }

    /// Persists a checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the file cannot be encoded or
    /// written.
    pub fn save(
        &self,
        locator: &RepositoryLocator,
        checkpoint: &Checkpoint,
    ) -> Result<(), PersistenceError> {
        let file_name = Self::file_name(locator);
        let json =
            serde_json::to_string_pretty(checkpoint).map_err(|error| PersistenceError::Serialise {
                path: self.dir.file_path(&file_name).to_string(),
                message: error.to_string(),
            })?;
        self.dir.write_atomic(&file_name, &json)
    }

    /// Full path of the record log for a repository.
    #[must_use]
    pub fn records_path_for(&self, locator: &RepositoryLocator) -> Utf8PathBuf {
        self.dir.file_path(&Self::records_file_name(locator))
    }

    /// Appends a fetched record to the repository's record log.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the record cannot be encoded or
    /// the log cannot be written.
    pub fn append_record(
        &self,
        locator: &RepositoryLocator,
        record: &PullRequestRecord,
    ) -> Result<(), PersistenceError> {
        let file_name = Self::records_file_name(locator);
        let line = serde_json::to_string(record).map_err(|error| PersistenceError::Serialise {
            path: self.dir.file_path(&file_name).to_string(),
            message: error.to_string(),
        })?;
        self.dir.append_line(&file_name, &line)
    }

    /// Loads the logged records that `checkpoint` lists as fetched.
    ///
    /// Unparseable lines (a write torn by a crash) are skipped. When a
    /// number was logged twice the later entry wins. Records are returned
    /// in ascending number order.
    #[must_use]
    pub fn load_records(
        &self,
        locator: &RepositoryLocator,
        checkpoint: &Checkpoint,
    ) -> Vec<PullRequestRecord> {
        let repository = locator.full_name();
        let content = match self.dir.read(&Self::records_file_name(locator)) {
            Ok(Some(content)) => content,
            Ok(None) => return Vec::new(),
            Err(error) => {
                warn!(%repository, %error, "record log unreadable; resuming without it");
                return Vec::new();
            }
        };

        let mut by_number = BTreeMap::new();
        for line in content.lines().filter(|line| !line.trim().is_empty()) {
            match serde_json::from_str::<PullRequestRecord>(line) {
                Ok(record)
                    if record.repository == checkpoint.repository
                        && checkpoint.contains(record.number) =>
                {
                    by_number.insert(record.number, record);
                }
                Ok(_) => {}
                Err(error) => {
                    warn!(%repository, %error, "skipping unreadable record log entry");
                }
            }
        }
        by_number.into_values().collect()
    }

    /// Deletes the record log for a repository.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when an existing file cannot be removed.
    pub fn clear_records(&self, locator: &RepositoryLocator) -> Result<(), PersistenceError> {
        self.dir.remove(&Self::records_file_name(locator))
    }

    /// Deletes the checkpoint and record log for a repository.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when an existing file cannot be removed.
    pub fn clear(&self, locator: &RepositoryLocator) -> Result<(), PersistenceError> {
        self.dir.remove(&Self::file_name(locator))?;
        self.clear_records(locator)
    }
}
