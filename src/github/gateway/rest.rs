//! REST calls used by the serial fetcher, the probe and quota refreshes.

use chrono::{DateTime, Utc};
use octocrab::Octocrab;

use crate::github::error::IntakeError;
use crate::github::locator::RepositoryLocator;
use crate::github::models::rest::{
    ApiCheckRuns, ApiCommit, ApiFile, ApiPullRequest, ApiPullRequestSummary, ApiRateLimit,
    ApiRepository, ApiReview, RestSubResources,
};
use crate::github::models::{CheckRunRecord, PullRequestRecord};
use crate::github::pagination::PageInfo;
use crate::github::rate_limit::RateLimitInfo;

use super::http_utils::{get_json, has_next_link};
use super::{ListPullRequestsParams, MAX_REST_PAGE_SIZE, PaginatedPullRequests};

fn validate_pagination_params(page: u32, per_page: u8) -> Result<(), IntakeError> {
    if page == 0 {
        return Err(IntakeError::InvalidPagination {
            message: "page must be at least 1".to_owned(),
        });
    }

    if per_page == 0 {
        return Err(IntakeError::InvalidPagination {
            message: "per_page must be at least 1".to_owned(),
        });
    }

    if per_page > MAX_REST_PAGE_SIZE {
        return Err(IntakeError::InvalidPagination {
            message: format!("per_page must not exceed {MAX_REST_PAGE_SIZE}"),
        });
    }

    Ok(())
}

pub(super) async fn list_pull_requests(
    client: &Octocrab,
    locator: &RepositoryLocator,
    params: &ListPullRequestsParams,
) -> Result<PaginatedPullRequests, IntakeError> {
    validate_pagination_params(params.page, params.per_page)?;

    let uri = format!(
        "{path}?state={state}&sort=updated&direction=desc&per_page={per_page}&page={page}",
        path = locator.pulls_path(),
        state = params.state.as_str(),
        per_page = params.per_page,
        page = params.page,
    );
    let decoded = get_json::<Vec<ApiPullRequestSummary>>(client, "list pulls", &uri).await?;

    let rate_limit = decoded.rate_limit();
    let page_info =
        PageInfo::new(params.page, params.per_page).with_has_next(has_next_link(&decoded.headers));
    Ok(PaginatedPullRequests {
        items: decoded.value.into_iter().map(Into::into).collect(),
        page_info,
        rate_limit,
    })
}

fn first_page(path: &str) -> String {
    format!("{path}?per_page={MAX_REST_PAGE_SIZE}")
}

/// Fetches detail, commits, reviews, files and head-commit check runs.
///
/// Sub-resources are limited to their first page of 100 entries.
pub(super) async fn pull_request_history(
    client: &Octocrab,
    locator: &RepositoryLocator,
    number: u64,
) -> Result<PullRequestRecord, IntakeError> {
    let detail = get_json::<ApiPullRequest>(
        client,
        "pull request",
        &locator.pull_request_path(number),
    )
    .await?
    .value;

    let commits = get_json::<Vec<ApiCommit>>(
        client,
        "pull request commits",
        &first_page(&locator.pull_request_commits_path(number)),
    )
    .await?
    .value;

    let reviews = get_json::<Vec<ApiReview>>(
        client,
        "pull request reviews",
        &first_page(&locator.pull_request_reviews_path(number)),
    )
    .await?
    .value;

    let files = get_json::<Vec<ApiFile>>(
        client,
        "pull request files",
        &first_page(&locator.pull_request_files_path(number)),
    )
    .await?
    .value;

    let head_sha = detail
        .head
        .as_ref()
        .and_then(|head| head.sha.clone())
        .or_else(|| commits.last().map(|commit| commit.sha.clone()));
    let check_runs = match head_sha {
        Some(sha) => {
            get_json::<ApiCheckRuns>(
                client,
                "check runs",
                &first_page(&locator.check_runs_path(&sha)),
            )
            .await?
            .value
            .check_runs
        }
        None => Vec::new(),
    };

    Ok(detail.into_record(
        &locator.full_name(),
        RestSubResources {
            commits,
            reviews,
            files,
            check_runs,
        },
    ))
}

pub(super) async fn check_runs(
    client: &Octocrab,
    locator: &RepositoryLocator,
    sha: &str,
) -> Result<Vec<CheckRunRecord>, IntakeError> {
    let decoded = get_json::<ApiCheckRuns>(
        client,
        "check runs",
        &first_page(&locator.check_runs_path(sha)),
    )
    .await?;
    Ok(decoded
        .value
        .check_runs
        .into_iter()
        .map(Into::into)
        .collect())
}

pub(super) async fn repository_modified_at(
    client: &Octocrab,
    locator: &RepositoryLocator,
) -> Result<Option<DateTime<Utc>>, IntakeError> {
    let decoded =
        get_json::<ApiRepository>(client, "repository", &locator.repository_path()).await?;
    Ok(decoded.value.modified_at())
}

pub(super) async fn rate_limit(client: &Octocrab) -> Result<RateLimitInfo, IntakeError> {
    let rate = get_json::<ApiRateLimit>(client, "rate limit", "/rate_limit")
        .await?
        .value
        .rate;
    Ok(RateLimitInfo::new(
        u32::try_from(rate.limit).unwrap_or(u32::MAX),
        u32::try_from(rate.remaining).unwrap_or(u32::MAX),
        rate.reset,
    ))
}
