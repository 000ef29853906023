//! Shared pool of GitHub credentials with per-credential quota tracking.
//!
//! Every outbound call asks the pool for the credential with the most
//! primary quota left. Fetchers report usage back after each call and mark a
//! credential exhausted when GitHub says its hourly budget is spent. The
//! credential list sits behind a single mutex that is only held for the
//! duration of a bookkeeping update, never across an `.await`.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::error::IntakeError;
use super::gateway::{HistoryGateway, with_timeout};
use super::locator::PersonalAccessToken;
use super::rate_limit::RateLimitInfo;

/// Primary quota GitHub grants an authenticated token per hour.
pub const DEFAULT_HOURLY_QUOTA: u32 = 5000;

/// Stable index of a credential inside its pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CredentialId(usize);

impl CredentialId {
    /// Returns the zero-based position in the pool.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for CredentialId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "#{}", self.0 + 1)
    }
}

/// A bearer token and what the pool knows about its quota.
///
/// Values handed out by [`CredentialPool::best_client`] are snapshots; the
/// pool keeps the authoritative copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    id: CredentialId,
    token: PersonalAccessToken,
    remaining: u32,
    reset_at: Option<DateTime<Utc>>,
    exhausted: bool,
}

impl Credential {
    fn new(index: usize, token: PersonalAccessToken, remaining: u32) -> Self {
        Self {
            id: CredentialId(index),
            token,
            remaining,
            reset_at: None,
            exhausted: false,
        }
    }

    /// Pool-assigned identifier.
    #[must_use]
    pub const fn id(&self) -> CredentialId {
        self.id
    }

    /// Token used to authenticate requests.
    #[must_use]
    pub const fn token(&self) -> &PersonalAccessToken {
        &self.token
    }

    /// Last known remaining primary quota.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Last known quota reset instant.
    #[must_use]
    pub const fn reset_at(&self) -> Option<DateTime<Utc>> {
        self.reset_at
    }

    /// Whether the pool has taken this credential out of rotation.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    fn apply(&mut self, info: RateLimitInfo) {
        self.remaining = info.remaining();
        if let Some(reset) = info.reset_time() {
            self.reset_at = Some(reset);
        }
    }
}

/// Thread-safe collection of credentials.
///
/// # Example
///
/// ```
/// use prharvest::github::credential_pool::CredentialPool;
/// use prharvest::github::locator::PersonalAccessToken;
///
/// let tokens = ["ghp_a", "ghp_b"]
///     .into_iter()
///     .map(PersonalAccessToken::new)
///     .collect::<Result<Vec<_>, _>>()
///     .expect("tokens should be valid");
/// let pool = CredentialPool::new(tokens).expect("pool should build");
/// let best = pool.best_client().expect("a credential should be usable");
/// assert_eq!(best.id().index(), 0);
/// assert_eq!(pool.total_remaining(), 10_000);
/// ```
#[derive(Debug)]
pub struct CredentialPool {
    credentials: Mutex<Vec<Credential>>,
}

impl CredentialPool {
    /// Builds a pool assuming every token starts with a full hourly quota.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::MissingToken` when `tokens` is empty.
    pub fn new(tokens: Vec<PersonalAccessToken>) -> Result<Self, IntakeError> {
        let quotas = tokens
            .into_iter()
            .map(|token| (token, DEFAULT_HOURLY_QUOTA))
            .collect();
        Self::with_quotas(quotas)
    }

    /// Builds a pool with a known starting quota for each token.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::MissingToken` when `tokens` is empty.
    pub fn with_quotas(tokens: Vec<(PersonalAccessToken, u32)>) -> Result<Self, IntakeError> {
        if tokens.is_empty() {
            return Err(IntakeError::MissingToken);
        }
        let credentials = tokens
            .into_iter()
            .enumerate()
            .map(|(index, (token, remaining))| Credential::new(index, token, remaining))
            .collect();
        Ok(Self {
            credentials: Mutex::new(credentials),
        })
    }

    /// Number of credentials in the pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.credentials.lock().len()
    }

    /// Always false; a pool cannot be built empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credentials.lock().is_empty()
    }

    /// Returns the usable credential with the most remaining quota.
    ///
    /// Ties go to the credential added first.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::AllCredentialsExhausted` with the earliest known
    /// reset when no credential is usable.
    pub fn best_client(&self) -> Result<Credential, IntakeError> {
        let credentials = self.credentials.lock();
        let mut best: Option<&Credential> = None;
        for candidate in credentials.iter().filter(|credential| !credential.exhausted) {
            if best.is_none_or(|current| candidate.remaining > current.remaining) {
                best = Some(candidate);
            }
        }

        best.cloned()
            .ok_or_else(|| IntakeError::AllCredentialsExhausted {
                earliest_reset: earliest_reset(&credentials),
            })
    }

    /// Takes a credential out of rotation until it is refreshed.
    pub fn mark_exhausted(&self, id: CredentialId, reset_at: Option<DateTime<Utc>>) {
        let mut credentials = self.credentials.lock();
        let Some(credential) = credentials.get_mut(id.index()) else {
            return;
        };
        credential.exhausted = true;
        credential.remaining = 0;
        if reset_at.is_some() {
            credential.reset_at = reset_at;
        }
        warn!(
            credential = %id,
            reset_at = ?credential.reset_at,
            "credential quota exhausted"
        );
    }

    /// Re-queries a credential's quota through the gateway, giving up after
    /// `timeout`.
    ///
    /// A failed or timed-out query leaves the credential untouched. A
    /// credential whose quota is positive, or whose reset instant has
    /// passed, becomes usable again.
    pub async fn refresh<G>(&self, gateway: &G, id: CredentialId, timeout: Duration)
    where
        G: HistoryGateway + ?Sized,
    {
        let Some(credential) = self.credential(id) else {
            return;
        };

        let query = with_timeout("rate limit refresh", timeout, gateway.rate_limit(&credential));
        let info = match query.await {
            Ok(info) => info,
            Err(error) => {
                debug!(credential = %id, %error, "quota refresh failed");
                return;
            }
        };

        let now = Utc::now();
        let mut credentials = self.credentials.lock();
        let Some(stored) = credentials.get_mut(id.index()) else {
            return;
        };
        stored.apply(info);
        let reset_passed = stored.reset_at.is_some_and(|reset| reset <= now);
        if stored.remaining > 0 || reset_passed {
            if stored.exhausted {
                info!(credential = %id, remaining = stored.remaining, "credential usable again");
            }
            stored.exhausted = false;
        }
    }

    /// Refreshes every exhausted credential, each query bounded by
    /// `timeout`.
    pub async fn refresh_exhausted<G>(&self, gateway: &G, timeout: Duration)
    where
        G: HistoryGateway + ?Sized,
    {
        let exhausted: Vec<CredentialId> = self
            .credentials
            .lock()
            .iter()
            .filter(|credential| credential.exhausted)
            .map(Credential::id)
            .collect();
        for id in exhausted {
            self.refresh(gateway, id, timeout).await;
        }
    }

    /// Sum of remaining quota across usable credentials.
    #[must_use]
    pub fn total_remaining(&self) -> u64 {
        self.credentials
            .lock()
            .iter()
            .filter(|credential| !credential.exhausted)
            .map(|credential| u64::from(credential.remaining))
            .sum()
    }

    /// True when no credential is usable.
    #[must_use]
    pub fn all_exhausted(&self) -> bool {
        self.credentials
            .lock()
            .iter()
            .all(|credential| credential.exhausted)
    }

    /// Number of credentials currently out of rotation.
    #[must_use]
    pub fn exhausted_count(&self) -> usize {
        self.credentials
            .lock()
            .iter()
            .filter(|credential| credential.exhausted)
            .count()
    }

    /// Earliest known reset across exhausted credentials.
    #[must_use]
    pub fn earliest_reset(&self) -> Option<DateTime<Utc>> {
        earliest_reset(&self.credentials.lock())
    }

    /// Returns a snapshot of the credential with the given id.
    #[must_use]
    pub fn credential(&self, id: CredentialId) -> Option<Credential> {
        self.credentials.lock().get(id.index()).cloned()
    }

    /// Deducts `calls` from a credential's remaining quota.
    pub(crate) fn record_usage(&self, id: CredentialId, calls: u32) {
        if let Some(credential) = self.credentials.lock().get_mut(id.index()) {
            credential.remaining = credential.remaining.saturating_sub(calls);
        }
    }

    /// Applies quota reported alongside a response.
    pub(crate) fn observe(&self, id: CredentialId, info: RateLimitInfo) {
        if let Some(credential) = self.credentials.lock().get_mut(id.index()) {
            credential.apply(info);
        }
    }
}

fn earliest_reset(credentials: &[Credential]) -> Option<DateTime<Utc>> {
    credentials
        .iter()
        .filter(|credential| credential.exhausted)
        .filter_map(|credential| credential.reset_at)
        .min()
}
