//! The bulk pull request query.

use octocrab::Octocrab;
use serde::Serialize;

use crate::github::error::IntakeError;
use crate::github::locator::RepositoryLocator;
use crate::github::models::graphql::{GraphQlResponse, PullRequestPageData};
use crate::github::pagination::CursorState;
use crate::github::rate_limit::RateLimitInfo;

use super::http_utils::post_json;
use super::{BulkQuery, MAX_GRAPHQL_PAGE_SIZE, PullRequestPage};

const PULL_REQUEST_PAGE_QUERY: &str = r"
query PullRequestPage(
  $owner: String!
  $name: String!
  $first: Int!
  $after: String
  $orderField: IssueOrderField!
  $states: [PullRequestState!]
) {
  rateLimit { remaining limit resetAt }
  repository(owner: $owner, name: $name) {
    pullRequests(
      first: $first
      after: $after
      states: $states
      orderBy: { field: $orderField, direction: DESC }
    ) {
      pageInfo { hasNextPage endCursor }
      nodes {
        number
        title
        body
        state
        isDraft
        createdAt
        updatedAt
        mergedAt
        closedAt
        additions
        deletions
        changedFiles
        author { login }
        labels(first: 50) { nodes { name } }
        milestone { title }
        assignees(first: 20) { nodes { login } }
        baseRefName
        headRefName
        headRefOid
        closingIssuesReferences(first: 20) { nodes { number } }
        commits(first: 100) {
          nodes {
            commit {
              oid
              message
              committedDate
              additions
              deletions
              author { name user { login } }
            }
          }
        }
        reviews(first: 100) {
          nodes { databaseId author { login } state body submittedAt }
        }
        files(first: 100) {
          nodes { path additions deletions changeType }
        }
      }
    }
  }
}
";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Variables<'a> {
    owner: &'a str,
    name: &'a str,
    first: u32,
    after: Option<&'a str>,
    order_field: &'static str,
    states: &'static [&'static str],
}

#[derive(Debug, Serialize)]
struct Payload<'a> {
    query: &'static str,
    variables: Variables<'a>,
}

pub(super) async fn pull_request_page(
    client: &Octocrab,
    locator: &RepositoryLocator,
    query: &BulkQuery,
) -> Result<PullRequestPage, IntakeError> {
    let payload = Payload {
        query: PULL_REQUEST_PAGE_QUERY,
        variables: Variables {
            owner: locator.owner().as_str(),
            name: locator.repository().as_str(),
            first: query.first.clamp(1, MAX_GRAPHQL_PAGE_SIZE),
            after: query.after.as_deref(),
            order_field: query.ordering.as_graphql(),
            states: query.state.graphql_states(),
        },
    };

    let decoded = post_json::<_, GraphQlResponse<PullRequestPageData>>(
        client,
        "pull request page",
        locator.graphql_url().as_str(),
        &payload,
    )
    .await?;
    let header_rate_limit = decoded.rate_limit();
    let response = decoded.value;

    if let Some(error) = response.errors.iter().find(|error| error.is_rate_limited()) {
        return Err(IntakeError::QuotaExhausted {
            rate_limit: header_rate_limit,
            message: error.message.clone(),
        });
    }

    let Some(data) = response.data else {
        let message = response
            .errors
            .first()
            .map_or_else(|| "response carried no data".to_owned(), |error| error.message.clone());
        return Err(IntakeError::Api {
            message: format!("pull request page failed: {message}"),
        });
    };

    let rate_limit = data
        .rate_limit
        .map(|reported| {
            let reset = u64::try_from(reported.reset_at.timestamp()).unwrap_or(0);
            RateLimitInfo::new(
                reported.limit.unwrap_or(0),
                reported.remaining,
                reset,
            )
        })
        .or(header_rate_limit);

    let Some(repository) = data.repository else {
        return Err(IntakeError::Api {
            message: format!("repository {} was not found", locator.full_name()),
        });
    };

    let connection = repository.pull_requests;
    let repository_name = locator.full_name();
    let records = connection
        .nodes
        .into_iter()
        .flatten()
        .map(|node| node.into_record(&repository_name))
        .collect();

    Ok(PullRequestPage {
        records,
        cursor: CursorState::advance(
            connection.page_info.has_next_page,
            connection.page_info.end_cursor,
        ),
        rate_limit,
    })
}
