//! Octocrab client construction and per-credential client reuse.

use std::collections::HashMap;

use http::Uri;
use octocrab::Octocrab;
use parking_lot::Mutex;

use crate::github::credential_pool::{Credential, CredentialId};
use crate::github::error::IntakeError;
use crate::github::locator::PersonalAccessToken;

use super::error_mapping::map_octocrab_error;

/// Builds an Octocrab client for the given token and API base URL.
///
/// # Errors
///
/// Returns `IntakeError::InvalidUrl` when the base URI cannot be parsed or
/// `IntakeError::Api` when Octocrab fails to construct a client.
pub(super) fn build_octocrab_client(
    token: &PersonalAccessToken,
    api_base: &str,
) -> Result<Octocrab, IntakeError> {
    let base_uri: Uri = api_base
        .parse::<Uri>()
        .map_err(|error| IntakeError::InvalidUrl(error.to_string()))?;

    Octocrab::builder()
        .personal_token(token.as_ref())
        .base_uri(base_uri)
        .map_err(|error| IntakeError::Api {
            message: format!("build client failed: {error}"),
        })?
        .build()
        .map_err(|error| map_octocrab_error("build client", &error))
}

/// One authenticated client per credential, built on first use.
#[derive(Default)]
pub(super) struct ClientCache {
    clients: Mutex<HashMap<CredentialId, Octocrab>>,
}

impl ClientCache {
    pub(super) fn client_for(
        &self,
        credential: &Credential,
        api_base: &str,
    ) -> Result<Octocrab, IntakeError> {
        let mut clients = self.clients.lock();
        if let Some(client) = clients.get(&credential.id()) {
            return Ok(client.clone());
        }
        let client = build_octocrab_client(credential.token(), api_base)?;
        clients.insert(credential.id(), client.clone());
        Ok(client)
    }
}
