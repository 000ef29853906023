//! Tests for the Octocrab gateway against a mock GitHub server.

use std::time::Duration;

use rstest::rstest;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::{
    BulkOrdering, BulkQuery, HistoryGateway, ListPullRequestsParams, OctocrabGateway,
    PullRequestState, with_timeout,
};
use crate::github::credential_pool::{Credential, CredentialPool};
use crate::github::error::IntakeError;
use crate::github::locator::{PersonalAccessToken, RepositoryLocator};
use crate::github::models::RecordState;
use crate::github::pagination::CursorState;

struct GatewayFixture {
    server: MockServer,
    locator: RepositoryLocator,
    gateway: OctocrabGateway,
    credential: Credential,
}

async fn gateway_fixture() -> GatewayFixture {
    let server = MockServer::start().await;
    let locator = RepositoryLocator::parse(&format!("{}/owner/repo", server.uri()))
        .expect("should create repository locator");
    let token = PersonalAccessToken::new("valid-token").expect("token should be valid");
    let pool = CredentialPool::new(vec![token]).expect("pool should build");
    let credential = pool.best_client().expect("credential should be available");
    let gateway = OctocrabGateway::new(&locator);
    GatewayFixture {
        server,
        locator,
        gateway,
        credential,
    }
}

fn pull_request_body(number: u64) -> serde_json::Value {
    json!({
        "number": number,
        "title": format!("PR {number}"),
        "body": "Fixes #9",
        "state": "open",
        "draft": false,
        "user": { "login": "octocat" },
        "created_at": "2025-01-01T00:00:00Z",
        "updated_at": "2025-01-02T00:00:00Z",
        "merged_at": null,
        "closed_at": null,
        "additions": 5,
        "deletions": 2,
        "changed_files": 1,
        "labels": [],
        "assignees": [],
        "base": { "ref": "main", "sha": "base" },
        "head": { "ref": "topic", "sha": "cafe01" }
    })
}

#[rstest]
#[tokio::test]
async fn list_pull_requests_sends_sort_and_reads_link_header() {
    let fixture = gateway_fixture().await;
    let next_url = format!(
        "{}/api/v3/repos/owner/repo/pulls?page=3",
        fixture.server.uri()
    );

    Mock::given(method("GET"))
        .and(path("/api/v3/repos/owner/repo/pulls"))
        .and(query_param("state", "closed"))
        .and(query_param("sort", "updated"))
        .and(query_param("direction", "desc"))
        .and(query_param("page", "2"))
        .and(query_param("per_page", "50"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("link", format!("<{next_url}>; rel=\"next\"").as_str())
                .insert_header("x-ratelimit-remaining", "4321")
                .insert_header("x-ratelimit-limit", "5000")
                .insert_header("x-ratelimit-reset", "1700000000")
                .set_body_json(json!([{
                    "number": 7,
                    "title": "Listed",
                    "state": "closed",
                    "draft": true,
                    "user": { "login": "hubot" },
                    "created_at": "2025-01-01T00:00:00Z",
                    "updated_at": "2025-01-03T00:00:00Z"
                }])),
        )
        .expect(1)
        .mount(&fixture.server)
        .await;

    let params = ListPullRequestsParams {
        state: PullRequestState::Closed,
        page: 2,
        per_page: 50,
    };
    let page = fixture
        .gateway
        .list_pull_requests(&fixture.credential, &fixture.locator, &params)
        .await
        .expect("listing should succeed");

    assert_eq!(page.items.len(), 1);
    assert!(page.items.first().is_some_and(|item| item.is_draft));
    assert!(page.page_info.has_next());
    assert_eq!(page.page_info.current_page(), 2);
    assert_eq!(page.rate_limit.map(|info| info.remaining()), Some(4321));
}

#[rstest]
#[case::zero_page(0, 10)]
#[case::zero_per_page(1, 0)]
#[case::oversized(1, 101)]
#[tokio::test]
async fn invalid_pagination_is_rejected_before_any_request(
    #[case] page: u32,
    #[case] per_page: u8,
) {
    let fixture = gateway_fixture().await;
    let params = ListPullRequestsParams {
        state: PullRequestState::All,
        page,
        per_page,
    };

    let result = fixture
        .gateway
        .list_pull_requests(&fixture.credential, &fixture.locator, &params)
        .await;

    assert!(
        matches!(result, Err(IntakeError::InvalidPagination { .. })),
        "expected InvalidPagination, got {result:?}"
    );
    let received = fixture
        .server
        .received_requests()
        .await
        .unwrap_or_default();
    assert!(received.is_empty());
}

#[rstest]
#[tokio::test]
async fn pull_request_history_assembles_nested_resources() {
    let fixture = gateway_fixture().await;
    let base = "/api/v3/repos/owner/repo";

    Mock::given(method("GET"))
        .and(path(format!("{base}/pulls/12")))
        .respond_with(ResponseTemplate::new(200).set_body_json(pull_request_body(12)))
        .expect(1)
        .mount(&fixture.server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{base}/pulls/12/commits")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "sha": "cafe01",
            "commit": { "message": "Work", "author": { "name": "Mona", "date": "2025-01-01T10:00:00Z" } },
            "author": { "login": "mona" }
        }])))
        .expect(1)
        .mount(&fixture.server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{base}/pulls/12/reviews")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 3, "user": { "login": "rev" }, "state": "APPROVED", "body": "",
            "submitted_at": "2025-01-02T00:00:00Z"
        }])))
        .expect(1)
        .mount(&fixture.server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{base}/pulls/12/files")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "filename": "README.md", "status": "modified", "additions": 5, "deletions": 2
        }])))
        .expect(1)
        .mount(&fixture.server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{base}/commits/cafe01/check-runs")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 1,
            "check_runs": [{ "id": 99, "name": "build", "status": "completed",
                             "conclusion": "failure", "head_sha": "cafe01" }]
        })))
        .expect(1)
        .mount(&fixture.server)
        .await;

    let record = fixture
        .gateway
        .pull_request_history(&fixture.credential, &fixture.locator, 12)
        .await
        .expect("history should load");

    assert_eq!(record.identity(), ("owner/repo", 12));
    assert_eq!(record.linked_issues, vec![9]);
    assert_eq!(record.commits.len(), 1);
    assert_eq!(record.reviews.len(), 1);
    assert_eq!(record.files.len(), 1);
    assert_eq!(
        record.check_runs.first().and_then(|run| run.conclusion.as_deref()),
        Some("failure")
    );
}

#[rstest]
#[tokio::test]
async fn secondary_limit_surfaces_retry_after() {
    let fixture = gateway_fixture().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/repos/owner/repo/pulls/4"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("retry-after", "30")
                .set_body_json(json!({ "message": "You have exceeded a secondary rate limit" })),
        )
        .mount(&fixture.server)
        .await;

    let result = fixture
        .gateway
        .pull_request_history(&fixture.credential, &fixture.locator, 4)
        .await;

    assert!(
        matches!(result, Err(IntakeError::AbuseDetected { retry_after, .. }) if retry_after == Duration::from_secs(30)),
        "expected AbuseDetected, got {result:?}"
    );
}

#[rstest]
#[tokio::test]
async fn exhausted_quota_surfaces_reset() {
    let fixture = gateway_fixture().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/repos/owner/repo/pulls"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-remaining", "0")
                .insert_header("x-ratelimit-limit", "5000")
                .insert_header("x-ratelimit-reset", "1700000000")
                .set_body_json(json!({ "message": "API rate limit exceeded" })),
        )
        .mount(&fixture.server)
        .await;

    let result = fixture
        .gateway
        .list_pull_requests(
            &fixture.credential,
            &fixture.locator,
            &ListPullRequestsParams::default(),
        )
        .await;

    let Err(IntakeError::QuotaExhausted { rate_limit, .. }) = result else {
        panic!("expected QuotaExhausted, got {result:?}");
    };
    assert_eq!(rate_limit.map(|info| info.reset_at()), Some(1_700_000_000));
}

#[rstest]
#[tokio::test]
async fn pull_request_page_posts_query_and_maps_nodes() {
    let fixture = gateway_fixture().await;
    Mock::given(method("POST"))
        .and(path("/api/graphql"))
        .and(body_partial_json(json!({
            "variables": {
                "owner": "owner",
                "name": "repo",
                "first": 25,
                "after": "abc",
                "orderField": "UPDATED_AT",
                "states": ["OPEN", "CLOSED", "MERGED"]
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "rateLimit": { "remaining": 4000, "limit": 5000, "resetAt": "2025-03-01T00:00:00Z" },
                "repository": { "pullRequests": {
                    "pageInfo": { "hasNextPage": false, "endCursor": "def" },
                    "nodes": [
                        { "number": 2, "title": "Two", "state": "CLOSED",
                          "createdAt": "2025-01-01T00:00:00Z", "updatedAt": "2025-02-01T00:00:00Z" },
                        null
                    ]
                } }
            }
        })))
        .expect(1)
        .mount(&fixture.server)
        .await;

    let query = BulkQuery {
        first: 25,
        after: Some("abc".to_owned()),
        ordering: BulkOrdering::UpdatedAt,
        state: PullRequestState::All,
    };
    let page = fixture
        .gateway
        .pull_request_page(&fixture.credential, &fixture.locator, &query)
        .await
        .expect("page should load");

    assert_eq!(page.records.len(), 1);
    assert_eq!(
        page.records.first().map(|record| record.state),
        Some(RecordState::Closed)
    );
    assert_eq!(page.cursor, CursorState::Exhausted);
    assert_eq!(page.rate_limit.map(|info| info.remaining()), Some(4000));
}

#[rstest]
#[tokio::test]
async fn graphql_rate_limited_error_is_quota_exhaustion() {
    let fixture = gateway_fixture().await;
    Mock::given(method("POST"))
        .and(path("/api/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{ "type": "RATE_LIMITED", "message": "API rate limit exceeded" }]
        })))
        .mount(&fixture.server)
        .await;

    let query = BulkQuery {
        first: 10,
        after: None,
        ordering: BulkOrdering::CreatedAt,
        state: PullRequestState::Open,
    };
    let result = fixture
        .gateway
        .pull_request_page(&fixture.credential, &fixture.locator, &query)
        .await;

    assert!(
        matches!(result, Err(IntakeError::QuotaExhausted { .. })),
        "expected QuotaExhausted, got {result:?}"
    );
}

#[rstest]
#[tokio::test]
async fn repository_probe_returns_latest_marker() {
    let fixture = gateway_fixture().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/repos/owner/repo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "full_name": "owner/repo",
            "pushed_at": "2025-02-10T00:00:00Z",
            "updated_at": "2025-01-10T00:00:00Z"
        })))
        .mount(&fixture.server)
        .await;

    let marker = fixture
        .gateway
        .repository_modified_at(&fixture.credential, &fixture.locator)
        .await
        .expect("probe should succeed");

    assert_eq!(
        marker.map(|value| value.to_rfc3339()),
        Some("2025-02-10T00:00:00+00:00".to_owned())
    );
}

#[rstest]
#[tokio::test]
async fn rate_limit_reads_core_quota() {
    let fixture = gateway_fixture().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/rate_limit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resources": {},
            "rate": { "limit": 5000, "remaining": 12, "reset": 1700000000, "used": 4988 }
        })))
        .mount(&fixture.server)
        .await;

    let info = fixture
        .gateway
        .rate_limit(&fixture.credential)
        .await
        .expect("rate limit should load");

    assert_eq!(info.remaining(), 12);
    assert_eq!(info.limit(), 5000);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn with_timeout_maps_elapsed_deadline() {
    let result: Result<(), IntakeError> = with_timeout(
        "slow call",
        Duration::from_secs(2),
        std::future::pending(),
    )
    .await;

    assert_eq!(
        result,
        Err(IntakeError::Timeout {
            operation: "slow call".to_owned(),
            seconds: 2
        })
    );
}
