//! Per-repository cache of previously fetched records.
//!
//! A snapshot remembers when it was taken, which lower-bound date the query
//! used and, when known, the repository modification marker observed at the
//! time. [`CacheSnapshot::is_valid`] is the single rule deciding whether the
//! snapshot can be served without refetching.

use camino::Utf8PathBuf;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::github::locator::RepositoryLocator;
use crate::github::models::PullRequestRecord;

use super::error::PersistenceError;
use super::files::{StateDir, repository_stem};

/// Records cached for one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    /// Repository in `owner/name` form.
    pub repo: String,
    /// When the records were fetched.
    pub fetched_at: DateTime<Utc>,
    /// Lower-bound date the query used.
    pub since_date: NaiveDate,
    /// Repository modification marker observed at fetch time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_modified_at: Option<DateTime<Utc>>,
    /// Cached records, most recently updated first.
    #[serde(default)]
    pub records: Vec<PullRequestRecord>,
}

impl CacheSnapshot {
    /// Whether the snapshot answers a query for `since_date`.
    ///
    /// True only when the lower bound matches and, if a modification marker
    /// is supplied, the snapshot was taken at or after it.
    ///
    /// ```
    /// use chrono::{NaiveDate, TimeZone, Utc};
    /// use prharvest::persistence::CacheSnapshot;
    ///
    /// let since = NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date");
    /// let fetched_at = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).single().expect("valid");
    /// let snapshot = CacheSnapshot {
    ///     repo: "octo/repo".to_owned(),
    ///     fetched_at,
    ///     since_date: since,
    ///     repo_modified_at: None,
    ///     records: Vec::new(),
    /// };
    /// let later = Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).single().expect("valid");
    ///
    /// assert!(snapshot.is_valid(since, None));
    /// assert!(snapshot.is_valid(since, Some(fetched_at)));
    /// assert!(!snapshot.is_valid(since, Some(later)));
    /// ```
    #[must_use]
    pub fn is_valid(&self, since_date: NaiveDate, repo_modified_at: Option<DateTime<Utc>>) -> bool {
        self.since_date == since_date
            && repo_modified_at.is_none_or(|marker| self.fetched_at >= marker)
    }

    /// Cached records, at most `max_items` of them.
    #[must_use]
    pub fn truncated(&self, max_items: usize) -> Vec<PullRequestRecord> {
        self.records.iter().take(max_items).cloned().collect()
    }
}

/// Reads and writes snapshots under one directory.
///
/// Files are named `{owner}__{name}.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotStore {
    dir: StateDir,
}

impl SnapshotStore {
    /// Creates a store rooted at `dir`. The directory is created on first
    /// save.
    #[must_use]
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            dir: StateDir::new(dir),
        }
    }

    fn file_name(locator: &RepositoryLocator) -> String {
        format!("{}.json", repository_stem(locator))
    }

    /// Full path of the snapshot file for a repository.
    #[must_use]
    pub fn path_for(&self, locator: &RepositoryLocator) -> Utf8PathBuf {
        self.dir.file_path(&Self::file_name(locator))
    }

    /// Loads the snapshot for a repository.
    ///
    /// Missing, unreadable, corrupt, or foreign snapshots load as `None`.
    #[must_use]
    pub fn load(&self, locator: &RepositoryLocator) -> Option<CacheSnapshot> {
        let repository = locator.full_name();
        let content = match self.dir.read(&Self::file_name(locator)) {
            Ok(content) => content?,
            Err(error) => {
                warn!(%repository, %error, "cache snapshot unreadable; ignoring");
                return None;
            }
        };

        let snapshot: CacheSnapshot = match serde_json::from_str(&content) {
            Ok(snapshot) => snapshot,
            Err(error) => {
                warn!(%repository, %error, "cache snapshot corrupt; ignoring");
                return None;
            }
        };

        if snapshot.repo != repository {
            warn!(
                %repository,
                stored = %snapshot.repo,
                "cache snapshot belongs to another repository; ignoring"
            );
            return None;
        }

        debug!(
            %repository,
            records = snapshot.records.len(),
            fetched_at = %snapshot.fetched_at,
            "loaded cache snapshot"
        );
        Some(snapshot)
    }

    /// Persists a snapshot, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the file cannot be encoded or
    /// written.
    pub fn save(
        &self,
        locator: &RepositoryLocator,
        snapshot: &CacheSnapshot,
    ) -> Result<(), PersistenceError> {
        let file_name = Self::file_name(locator);
        let json =
            serde_json::to_string(snapshot).map_err(|error| PersistenceError::Serialise {
                path: self.dir.file_path(&file_name).to_string(),
                message: error.to_string(),
            })?;
        self.dir.write_atomic(&file_name, &json)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for cache snapshot validity and persistence.

    use camino::Utf8PathBuf;
    use cap_std::ambient_authority;
    use cap_std::fs_utf8::Dir;
    use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    use super::{CacheSnapshot, SnapshotStore};
    use crate::github::locator::RepositoryLocator;
    use crate::github::models::test_support::record;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    struct StoreFixture {
        _temp_dir: TempDir,
        base: Utf8PathBuf,
        store: SnapshotStore,
        locator: RepositoryLocator,
    }

    #[fixture]
    fn store_fixture() -> StoreFixture {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let base = Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf())
            .expect("temp directory path must be UTF-8");
        StoreFixture {
            _temp_dir: temp_dir,
            store: SnapshotStore::new(base.clone()),
            base,
            locator: RepositoryLocator::from_owner_repo("octo", "repo")
                .expect("locator should be valid"),
        }
    }

    fn since() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date")
    }

    fn fetched_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn snapshot() -> CacheSnapshot {
        CacheSnapshot {
            repo: "octo/repo".to_owned(),
            fetched_at: fetched_at(),
            since_date: since(),
            repo_modified_at: Some(fetched_at() - Duration::hours(1)),
            records: vec![record("octo/repo", 2), record("octo/repo", 1)],
        }
    }

    #[rstest]
    #[case::no_marker(None, true)]
    #[case::older_marker(Some(-60), true)]
    #[case::equal_marker(Some(0), true)]
    #[case::newer_marker(Some(60), false)]
    fn validity_depends_on_marker(#[case] offset_minutes: Option<i64>, #[case] expected: bool) {
        let marker = offset_minutes.map(|minutes| fetched_at() + Duration::minutes(minutes));
        assert_eq!(snapshot().is_valid(since(), marker), expected);
    }

    #[rstest]
    fn different_since_date_is_never_valid() {
        let other = NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date");
        assert!(!snapshot().is_valid(other, None));
    }

    #[rstest]
    fn save_and_load_round_trip(store_fixture: StoreFixture) -> TestResult {
        store_fixture.store.save(&store_fixture.locator, &snapshot())?;

        let loaded = store_fixture.store.load(&store_fixture.locator);

        assert_eq!(loaded, Some(snapshot()));
        assert_eq!(
            store_fixture.store.path_for(&store_fixture.locator),
            store_fixture.base.join("octo__repo.json")
        );
        Ok(())
    }

    #[rstest]
    fn missing_snapshot_loads_as_none(store_fixture: StoreFixture) {
        assert_eq!(store_fixture.store.load(&store_fixture.locator), None);
    }

    #[rstest]
    fn corrupt_snapshot_loads_as_none(store_fixture: StoreFixture) -> TestResult {
        let dir = Dir::open_ambient_dir(&store_fixture.base, ambient_authority())?;
        dir.write("octo__repo.json", "[1, 2")?;

        assert_eq!(store_fixture.store.load(&store_fixture.locator), None);
        Ok(())
    }

    #[rstest]
    fn foreign_snapshot_loads_as_none(store_fixture: StoreFixture) -> TestResult {
        let mut foreign = snapshot();
        foreign.repo = "someone/else".to_owned();
        store_fixture.store.save(&store_fixture.locator, &foreign)?;

        assert_eq!(store_fixture.store.load(&store_fixture.locator), None);
        Ok(())
    }

    #[rstest]
    fn snapshot_without_marker_still_loads(store_fixture: StoreFixture) -> TestResult {
        let legacy = r#"{
            "repo": "octo/repo",
            "fetched_at": "2025-06-01T12:00:00Z",
            "since_date": "2025-01-01",
            "records": [{
                "repository": "octo/repo",
                "number": 4,
                "created_at": "2025-02-01T00:00:00Z",
                "updated_at": "2025-02-02T00:00:00Z"
            }]
        }"#;
        let dir = Dir::open_ambient_dir(&store_fixture.base, ambient_authority())?;
        dir.write("octo__repo.json", legacy)?;

        let loaded = store_fixture
            .store
            .load(&store_fixture.locator)
            .ok_or("legacy snapshot should load")?;

        assert_eq!(loaded.repo_modified_at, None);
        assert_eq!(loaded.records.len(), 1);
        assert!(loaded.is_valid(since(), None));
        Ok(())
    }

    #[rstest]
    fn truncated_caps_record_count() {
        let cached = snapshot();
        assert_eq!(cached.truncated(1).len(), 1);
        assert_eq!(cached.truncated(10).len(), 2);
    }
}
