//! Shared utilities for end-to-end pipeline tests.

use std::time::Duration;

use camino::Utf8PathBuf;
use prharvest::{
    CheckpointStore, CredentialPool, HarvestSettings, PersonalAccessToken, RepositoryLocator,
    SnapshotStore,
};
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::MockServer;

/// Everything a pipeline run needs, backed by a mock GitHub server and a
/// temporary state directory.
pub struct PipelineFixture {
    _temp_dir: TempDir,
    pub server: MockServer,
    pub locator: RepositoryLocator,
    pub pool: CredentialPool,
    pub checkpoints: CheckpointStore,
    pub snapshots: SnapshotStore,
    pub settings: HarvestSettings,
}

/// Starts a mock server and lays out state directories for `octo/repo`.
///
/// # Panics
///
/// Panics if the temporary directory or locator cannot be created.
pub async fn pipeline_fixture() -> PipelineFixture {
    let temp_dir = TempDir::new()
        .unwrap_or_else(|error| panic!("failed to create temporary directory: {error}"));
    let base = Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf())
        .unwrap_or_else(|path| panic!("temporary path is not UTF-8: {}", path.display()));
    let server = MockServer::start().await;
    let locator = RepositoryLocator::parse(&format!("{}/octo/repo", server.uri()))
        .unwrap_or_else(|error| panic!("locator should parse: {error}"));
    let token = PersonalAccessToken::new("integration-token")
        .unwrap_or_else(|error| panic!("token should be valid: {error}"));
    let pool =
        CredentialPool::new(vec![token]).unwrap_or_else(|error| panic!("pool should build: {error}"));

    PipelineFixture {
        _temp_dir: temp_dir,
        server,
        locator,
        pool,
        checkpoints: CheckpointStore::new(base.join("checkpoints")),
        snapshots: SnapshotStore::new(base.join("cache")),
        settings: HarvestSettings {
            request_delay: Duration::ZERO,
            ..HarvestSettings::default()
        },
    }
}

/// A GraphQL pull request node.
pub fn graphql_node(number: u64, created_at: &str, updated_at: &str) -> Value {
    json!({
        "number": number,
        "title": format!("PR {number}"),
        "state": "OPEN",
        "isDraft": false,
        "createdAt": created_at,
        "updatedAt": updated_at,
        "author": { "login": "octocat" }
    })
}

/// A single-page GraphQL response carrying `nodes`.
pub fn graphql_page(nodes: Vec<Value>) -> Value {
    json!({
        "data": {
            "rateLimit": { "remaining": 4900, "limit": 5000, "resetAt": "2030-01-01T00:00:00Z" },
            "repository": { "pullRequests": {
                "pageInfo": { "hasNextPage": false, "endCursor": null },
                "nodes": nodes
            } }
        }
    })
}

/// A repository body whose modification marker is `pushed_at`.
pub fn repository_body(pushed_at: &str) -> Value {
    json!({
        "full_name": "octo/repo",
        "pushed_at": pushed_at,
        "updated_at": "2024-12-01T00:00:00Z"
    })
}
