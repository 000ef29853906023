//! Unit tests for record mapping from REST and GraphQL payloads.

use rstest::{fixture, rstest};
use serde_json::json;

use super::graphql::{GqlPullRequest, GraphQlResponse, PullRequestPageData};
use super::rest::{ApiCheckRun, ApiCommit, ApiPullRequest, ApiReview, RestSubResources};
use super::{CheckRunRecord, PullRequestRecord, RecordState, linked_issue_numbers};

#[fixture]
fn rest_pull_request() -> ApiPullRequest {
    serde_json::from_value(json!({
        "number": 42,
        "title": "Add retry budget",
        "body": "Fixes #7 and resolves #3",
        "state": "closed",
        "draft": false,
        "user": { "login": "octocat" },
        "created_at": "2025-01-01T00:00:00Z",
        "updated_at": "2025-01-05T00:00:00Z",
        "merged_at": "2025-01-04T00:00:00Z",
        "closed_at": "2025-01-04T00:00:00Z",
        "additions": 120,
        "deletions": 30,
        "changed_files": 4,
        "labels": [{ "name": "enhancement" }, { "name": null }],
        "milestone": { "title": "v1.2" },
        "assignees": [{ "login": "hubot" }],
        "base": { "ref": "main", "sha": "base000" },
        "head": { "ref": "feature/retry", "sha": "head999" }
    }))
    .expect("ApiPullRequest should deserialise")
}

#[rstest]
fn rest_detail_maps_into_record(rest_pull_request: ApiPullRequest) {
    let commit: ApiCommit = serde_json::from_value(json!({
        "sha": "abc123",
        "commit": {
            "message": "Initial",
            "author": { "name": "Mona", "date": "2025-01-02T00:00:00Z" }
        },
        "author": { "login": "mona" }
    }))
    .expect("ApiCommit should deserialise");
    let review: ApiReview = serde_json::from_value(json!({
        "id": 9,
        "user": { "login": "reviewer" },
        "state": "APPROVED",
        "body": "LGTM",
        "submitted_at": "2025-01-03T00:00:00Z"
    }))
    .expect("ApiReview should deserialise");

    let record = rest_pull_request.into_record(
        "octo/repo",
        RestSubResources {
            commits: vec![commit],
            reviews: vec![review],
            ..RestSubResources::default()
        },
    );

    assert_eq!(record.identity(), ("octo/repo", 42));
    assert_eq!(record.state, RecordState::Merged);
    assert_eq!(record.labels, vec!["enhancement".to_owned()]);
    assert_eq!(record.milestone.as_deref(), Some("v1.2"));
    assert_eq!(record.assignees, vec!["hubot".to_owned()]);
    assert_eq!(record.linked_issues, vec![3, 7]);
    assert_eq!(record.head_sha.as_deref(), Some("head999"));
    assert_eq!(record.base_ref.as_deref(), Some("main"));
    assert_eq!(record.commits.len(), 1);
    assert_eq!(
        record.commits.first().and_then(|c| c.author_login.as_deref()),
        Some("mona")
    );
    assert_eq!(
        record.reviews.first().map(|r| r.state.as_str()),
        Some("APPROVED")
    );
}

#[rstest]
fn closed_unmerged_pull_request_is_closed(mut rest_pull_request: ApiPullRequest) {
    rest_pull_request.merged_at = None;
    let record = rest_pull_request.into_record("octo/repo", RestSubResources::default());
    assert_eq!(record.state, RecordState::Closed);
}

#[rstest]
fn check_run_maps_conclusion_and_sha() {
    let run: ApiCheckRun = serde_json::from_value(json!({
        "id": 5,
        "name": "ci / test",
        "status": "completed",
        "conclusion": "success",
        "head_sha": "head999",
        "started_at": "2025-01-03T00:00:00Z",
        "completed_at": null
    }))
    .expect("ApiCheckRun should deserialise");

    let record: CheckRunRecord = run.into();
    assert_eq!(record.conclusion.as_deref(), Some("success"));
    assert_eq!(record.head_sha.as_deref(), Some("head999"));
    assert!(record.completed_at.is_none());
}

#[rstest]
fn graphql_node_tolerates_null_collections() {
    let node: GqlPullRequest = serde_json::from_value(json!({
        "number": 8,
        "title": "Sparse node",
        "state": "OPEN",
        "createdAt": "2025-02-01T00:00:00Z",
        "updatedAt": "2025-02-02T00:00:00Z",
        "author": null,
        "labels": null,
        "assignees": { "nodes": null },
        "commits": { "nodes": [null] },
        "reviews": { "nodes": [{ "databaseId": null, "state": "COMMENTED" }] }
    }))
    .expect("sparse node should deserialise");

    let record = node.into_record("octo/repo");
    assert_eq!(record.state, RecordState::Open);
    assert!(record.author.is_none());
    assert!(record.labels.is_empty());
    assert!(record.assignees.is_empty());
    assert!(record.commits.is_empty());
    assert!(record.reviews.is_empty(), "reviews without ids are dropped");
    assert!(record.files.is_empty());
    assert!(record.latest_commit_sha().is_none());
}

#[rstest]
fn graphql_page_maps_nested_history() {
    let response: GraphQlResponse<PullRequestPageData> = serde_json::from_value(json!({
        "data": {
            "rateLimit": { "remaining": 4990, "limit": 5000, "resetAt": "2025-02-03T00:00:00Z" },
            "repository": {
                "pullRequests": {
                    "pageInfo": { "hasNextPage": true, "endCursor": "Y3Vyc29y" },
                    "nodes": [{
                        "number": 11,
                        "title": "Bulk",
                        "body": "closes #2",
                        "state": "MERGED",
                        "isDraft": false,
                        "createdAt": "2025-02-01T00:00:00Z",
                        "updatedAt": "2025-02-02T00:00:00Z",
                        "mergedAt": "2025-02-02T00:00:00Z",
                        "additions": 3,
                        "deletions": 1,
                        "changedFiles": 1,
                        "author": { "login": "octocat" },
                        "labels": { "nodes": [{ "name": "bug" }] },
                        "milestone": null,
                        "headRefOid": "feedbeef",
                        "closingIssuesReferences": { "nodes": [{ "number": 5 }, { "number": 5 }] },
                        "commits": { "nodes": [{ "commit": {
                            "oid": "feedbeef",
                            "message": "Fix",
                            "committedDate": "2025-02-01T12:00:00Z",
                            "author": { "name": "Mona", "user": { "login": "mona" } }
                        } }] },
                        "reviews": { "nodes": [{
                            "databaseId": 77,
                            "author": { "login": "hubot" },
                            "state": "APPROVED",
                            "submittedAt": "2025-02-02T00:00:00Z"
                        }] },
                        "files": { "nodes": [{ "path": "src/lib.rs", "additions": 3, "deletions": 1, "changeType": "MODIFIED" }] }
                    }]
                }
            }
        }
    }))
    .expect("page should deserialise");

    assert!(response.errors.is_empty());
    let data = response.data.expect("data should be present");
    assert_eq!(data.rate_limit.map(|limit| limit.remaining), Some(4990));
    let connection = data.repository.expect("repository present").pull_requests;
    assert!(connection.page_info.has_next_page);

    let records: Vec<PullRequestRecord> = connection
        .nodes
        .into_iter()
        .flatten()
        .map(|node| node.into_record("octo/repo"))
        .collect();
    let record = records.first().expect("one record");
    assert_eq!(record.state, RecordState::Merged);
    assert_eq!(record.linked_issues, vec![5], "closing references win over body");
    assert_eq!(record.labels, vec!["bug".to_owned()]);
    assert_eq!(record.latest_commit_sha(), Some("feedbeef"));
    assert_eq!(record.files.first().map(|f| f.status.as_str()), Some("modified"));
    assert_eq!(record.reviews.first().map(|r| r.id), Some(77));
}

#[rstest]
fn graphql_rate_limited_error_is_recognised() {
    let response: GraphQlResponse<PullRequestPageData> = serde_json::from_value(json!({
        "data": null,
        "errors": [{ "type": "RATE_LIMITED", "message": "API rate limit exceeded" }]
    }))
    .expect("error envelope should deserialise");

    assert!(response.data.is_none());
    assert!(response.errors.iter().any(|error| error.is_rate_limited()));
}

#[rstest]
#[case::plain("fixes #4", vec![4])]
#[case::mixed_case("Closes #10\nRESOLVED #2", vec![2, 10])]
#[case::colon("Fix: #8", vec![8])]
#[case::no_keyword("see #4 and #5", vec![])]
#[case::duplicates("fixes #1, fixes #1", vec![1])]
fn parses_closing_keywords(#[case] body: &str, #[case] expected: Vec<u64>) {
    assert_eq!(linked_issue_numbers(body), expected);
}

#[rstest]
fn record_round_trips_through_json_with_missing_collections() {
    let value = json!({
        "repository": "octo/repo",
        "number": 1,
        "created_at": "2025-01-01T00:00:00Z",
        "updated_at": "2025-01-01T00:00:00Z"
    });

    let record: PullRequestRecord =
        serde_json::from_value(value).expect("minimal record should deserialise");
    assert!(record.commits.is_empty());
    assert_eq!(record.state, RecordState::Open);
    assert_eq!(record.title, "");
}
