//! Repository identity wrappers and API path derivation.

use url::Url;

use super::error::IntakeError;

const PUBLIC_API_HOST: &str = "api.github.com";

/// Repository owner wrapper to avoid stringly typed parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryOwner(String);

impl RepositoryOwner {
    pub(crate) fn new(value: &str) -> Result<Self, IntakeError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(IntakeError::MissingPathSegments);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the owner value.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Repository name wrapper to prevent parameter mix-ups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryName(String);

impl RepositoryName {
    pub(crate) fn new(value: &str) -> Result<Self, IntakeError> {
        let trimmed = value.trim().trim_end_matches(".git");
        if trimmed.is_empty() {
            return Err(IntakeError::MissingPathSegments);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the repository name.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Personal access token wrapper enforcing presence.
///
/// `Debug` output redacts the secret so tokens never reach logs.
#[derive(Clone, PartialEq, Eq)]
pub struct PersonalAccessToken(String);

impl PersonalAccessToken {
    /// Validates that the token is non-empty and trims whitespace.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::MissingToken` when the supplied string is blank.
    pub fn new(token: impl AsRef<str>) -> Result<Self, IntakeError> {
        let trimmed = token.as_ref().trim();
        if trimmed.is_empty() {
            return Err(IntakeError::MissingToken);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the token value.
    #[must_use]
    pub const fn value(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for PersonalAccessToken {
    fn as_ref(&self) -> &str {
        self.value()
    }
}

impl std::fmt::Debug for PersonalAccessToken {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("PersonalAccessToken(***)")
    }
}

/// REST root serving a repository page URL.
///
/// `github.com` pages map to the public API; any other host is treated as
/// GitHub Enterprise, whose REST root is `/api/v3` on the same authority.
fn derive_api_base(page: &Url) -> Result<Url, IntakeError> {
    let host = page
        .host_str()
        .ok_or_else(|| IntakeError::InvalidUrl("URL must include a host".to_owned()))?;
    let invalid = |error: url::ParseError| IntakeError::InvalidUrl(error.to_string());

    if host.eq_ignore_ascii_case("github.com") {
        return Url::parse(&format!("https://{PUBLIC_API_HOST}")).map_err(invalid);
    }

    let mut api_base = page.clone();
    api_base.set_path("api/v3");
    api_base.set_query(None);
    api_base.set_fragment(None);
    api_base
        .set_username("")
        .and_then(|()| api_base.set_password(None))
        .map_err(|()| IntakeError::InvalidUrl("credentials in URL are not supported".to_owned()))?;
    Ok(api_base)
}

/// Repository identity with the API base it is served from.
///
/// # Example
///
/// ```
/// use prharvest::github::locator::RepositoryLocator;
///
/// let locator = RepositoryLocator::parse("https://github.com/octo/repo")
///     .expect("should parse repository URL");
/// assert_eq!(locator.full_name(), "octo/repo");
/// assert_eq!(locator.graphql_url().as_str(), "https://api.github.com/graphql");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryLocator {
    api_base: Url,
    owner: RepositoryOwner,
    repository: RepositoryName,
}

impl RepositoryLocator {
    /// Creates a repository locator from owner and repository name strings.
    ///
    /// Uses `github.com` as the default host.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::MissingPathSegments` when owner or repo is empty.
    pub fn from_owner_repo(owner: &str, repo: &str) -> Result<Self, IntakeError> {
        Self::with_api_base(owner, repo, "https://api.github.com")
    }

    /// Creates a locator against an explicit API base, such as a GitHub
    /// Enterprise `https://ghe.example.com/api/v3` endpoint.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::InvalidUrl` when `api_base` is not a URL and
    /// `IntakeError::MissingPathSegments` when owner or repo is empty.
    pub fn with_api_base(owner: &str, repo: &str, api_base: &str) -> Result<Self, IntakeError> {
        let validated_owner = RepositoryOwner::new(owner)?;
        let repository = RepositoryName::new(repo)?;
        let parsed_base =
            Url::parse(api_base).map_err(|error| IntakeError::InvalidUrl(error.to_string()))?;

        Ok(Self {
            api_base: parsed_base,
            owner: validated_owner,
            repository,
        })
    }

    /// Parses a GitHub repository URL in the form
    /// `https://github.com/<owner>/<repo>`.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::InvalidUrl` when parsing fails or
    /// `MissingPathSegments` when the URL path is not `/owner/repo`.
    pub fn parse(input: &str) -> Result<Self, IntakeError> {
        let parsed =
            Url::parse(input).map_err(|error| IntakeError::InvalidUrl(error.to_string()))?;

        let mut segments = parsed
            .path_segments()
            .ok_or(IntakeError::MissingPathSegments)?;

        let owner_segment = segments.next().ok_or(IntakeError::MissingPathSegments)?;
        let repository_segment = segments.next().ok_or(IntakeError::MissingPathSegments)?;

        let owner = RepositoryOwner::new(owner_segment)?;
        let repository = RepositoryName::new(repository_segment)?;
        let api_base = derive_api_base(&parsed)?;

        Ok(Self {
            api_base,
            owner,
            repository,
        })
    }

    /// Parses the `owner/repo` shorthand.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::MissingPathSegments` unless the input has
    /// exactly two non-empty segments.
    pub fn from_slug(slug: &str) -> Result<Self, IntakeError> {
        let mut parts = slug.split('/');
        let (Some(owner), Some(repo), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(IntakeError::MissingPathSegments);
        };
        Self::from_owner_repo(owner, repo)
    }

    /// API base URL derived from the repository host.
    #[must_use]
    pub const fn api_base(&self) -> &Url {
        &self.api_base
    }

    /// Repository owner.
    #[must_use]
    pub const fn owner(&self) -> &RepositoryOwner {
        &self.owner
    }

    /// Repository name.
    #[must_use]
    pub const fn repository(&self) -> &RepositoryName {
        &self.repository
    }

    /// Returns `owner/name`, the repository half of a record's identity.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner.as_str(), self.repository.as_str())
    }

    /// Absolute GraphQL endpoint for this host.
    ///
    /// The public API serves GraphQL at `/graphql`; Enterprise servers serve
    /// it at `/api/graphql` next to the `/api/v3` REST root.
    #[must_use]
    pub fn graphql_url(&self) -> Url {
        let mut url = self.api_base.clone();
        if url
            .host_str()
            .is_some_and(|host| host.eq_ignore_ascii_case(PUBLIC_API_HOST))
        {
            url.set_path("graphql");
        } else {
            url.set_path("api/graphql");
        }
        url
    }

    pub(crate) fn repository_path(&self) -> String {
        format!(
            "/repos/{}/{}",
            self.owner.as_str(),
            self.repository.as_str()
        )
    }

    pub(crate) fn pulls_path(&self) -> String {
        format!("{}/pulls", self.repository_path())
    }

    pub(crate) fn pull_request_path(&self, number: u64) -> String {
        format!("{}/pulls/{number}", self.repository_path())
    }

    pub(crate) fn pull_request_commits_path(&self, number: u64) -> String {
        format!("{}/pulls/{number}/commits", self.repository_path())
    }

    pub(crate) fn pull_request_reviews_path(&self, number: u64) -> String {
        format!("{}/pulls/{number}/reviews", self.repository_path())
    }

    pub(crate) fn pull_request_files_path(&self, number: u64) -> String {
        format!("{}/pulls/{number}/files", self.repository_path())
    }

    pub(crate) fn check_runs_path(&self, sha: &str) -> String {
        format!("{}/commits/{sha}/check-runs", self.repository_path())
    }
}
