//! Tests for [`RepositoryLocator`] construction and path derivation.

use rstest::rstest;

use crate::github::{IntakeError, PersonalAccessToken, RepositoryLocator};

#[rstest]
fn parses_repository_url() {
    let locator = RepositoryLocator::parse("https://github.com/octo/repo")
        .expect("should parse repository URL");
    assert_eq!(locator.owner().as_str(), "octo", "owner mismatch");
    assert_eq!(locator.repository().as_str(), "repo", "repository mismatch");
    assert_eq!(
        locator.api_base().as_str(),
        "https://api.github.com/",
        "api base mismatch"
    );
}

#[rstest]
fn parses_repository_url_with_trailing_path() {
    let locator = RepositoryLocator::parse("https://github.com/octo/repo.git/pulls")
        .expect("should parse repository URL with trailing path");
    assert_eq!(locator.full_name(), "octo/repo", "full name mismatch");
}

#[rstest]
#[case::enterprise("https://ghe.example.com/foo/bar", "https://ghe.example.com/api/v3")]
#[case::enterprise_with_port(
    "https://ghe.example.com:8443/foo/bar",
    "https://ghe.example.com:8443/api/v3"
)]
fn derives_enterprise_api_base(#[case] input: &str, #[case] expected: &str) {
    let locator = RepositoryLocator::parse(input).expect("should parse enterprise URL");
    assert_eq!(locator.api_base().as_str(), expected, "api base mismatch");
}

#[rstest]
#[case::public("https://github.com/octo/repo", "https://api.github.com/graphql")]
#[case::enterprise("https://ghe.example.com/octo/repo", "https://ghe.example.com/api/graphql")]
fn graphql_endpoint_follows_host(#[case] input: &str, #[case] expected: &str) {
    let locator = RepositoryLocator::parse(input).expect("should parse repository URL");
    assert_eq!(locator.graphql_url().as_str(), expected);
}

#[rstest]
fn derives_rest_paths() {
    let locator =
        RepositoryLocator::from_owner_repo("octo", "repo").expect("should create locator");
    assert_eq!(locator.repository_path(), "/repos/octo/repo");
    assert_eq!(locator.pulls_path(), "/repos/octo/repo/pulls");
    assert_eq!(locator.pull_request_path(7), "/repos/octo/repo/pulls/7");
    assert_eq!(
        locator.pull_request_commits_path(7),
        "/repos/octo/repo/pulls/7/commits"
    );
    assert_eq!(
        locator.pull_request_reviews_path(7),
        "/repos/octo/repo/pulls/7/reviews"
    );
    assert_eq!(
        locator.pull_request_files_path(7),
        "/repos/octo/repo/pulls/7/files"
    );
    assert_eq!(
        locator.check_runs_path("abc"),
        "/repos/octo/repo/commits/abc/check-runs"
    );
}

#[rstest]
fn explicit_api_base_is_kept() {
    let locator =
        RepositoryLocator::with_api_base("octo", "repo", "https://ghe.example.com/api/v3")
            .expect("should create locator");
    assert_eq!(locator.api_base().as_str(), "https://ghe.example.com/api/v3");
}

#[rstest]
#[case::empty_owner("", "repo")]
#[case::empty_repo("octo", "")]
#[case::blank_owner("  ", "repo")]
fn rejects_empty_segment(#[case] owner: &str, #[case] repo: &str) {
    let result = RepositoryLocator::from_owner_repo(owner, repo);
    assert!(
        matches!(result, Err(IntakeError::MissingPathSegments)),
        "expected MissingPathSegments, got {result:?}"
    );
}

#[rstest]
#[case::valid("octo/repo", true)]
#[case::missing_repo("octo", false)]
#[case::extra_segment("octo/repo/extra", false)]
#[case::empty_half("octo/", false)]
fn parses_slug(#[case] slug: &str, #[case] ok: bool) {
    assert_eq!(RepositoryLocator::from_slug(slug).is_ok(), ok, "slug {slug}");
}

#[rstest]
fn rejects_invalid_url() {
    let result = RepositoryLocator::parse("octo/repo");
    assert!(
        matches!(result, Err(IntakeError::InvalidUrl(_))),
        "expected InvalidUrl for malformed URL, got {result:?}"
    );
}

#[rstest]
fn rejects_empty_token() {
    let result = PersonalAccessToken::new("   ");
    assert!(
        matches!(result, Err(IntakeError::MissingToken)),
        "expected MissingToken, got {result:?}"
    );
}

#[rstest]
fn token_debug_output_is_redacted() {
    let token = PersonalAccessToken::new(" ghp_secret ").expect("token should be valid");
    assert_eq!(token.value(), "ghp_secret");
    assert_eq!(format!("{token:?}"), "PersonalAccessToken(***)");
}
