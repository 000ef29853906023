//! Shared HTTP utilities for gateway implementations.

use http::{HeaderMap, StatusCode, Uri};
use octocrab::Octocrab;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::github::error::IntakeError;
use crate::github::rate_limit::RateLimitInfo;

use super::error_mapping::{map_http_error, map_octocrab_error};

/// A decoded successful response plus the headers that came with it.
pub(super) struct Decoded<T> {
    pub(super) value: T,
    pub(super) headers: HeaderMap,
}

impl<T> Decoded<T> {
    pub(super) fn rate_limit(&self) -> Option<RateLimitInfo> {
        RateLimitInfo::from_headers(&self.headers)
    }
}

pub(super) fn extract_github_message(body: &str) -> Option<String> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return None;
    };
    value
        .get("message")
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
}

fn parse_uri(raw: &str) -> Result<Uri, IntakeError> {
    raw.parse::<Uri>()
        .map_err(|error| IntakeError::InvalidUrl(error.to_string()))
}

fn decode_body<T: DeserializeOwned>(
    operation: &str,
    status: StatusCode,
    headers: HeaderMap,
    body: &str,
) -> Result<Decoded<T>, IntakeError> {
    if status != StatusCode::OK {
        return Err(map_http_error(
            operation,
            status,
            &headers,
            extract_github_message(body),
        ));
    }

    let value = serde_json::from_str(body).map_err(|error| IntakeError::Decode {
        message: format!("{operation} response deserialisation failed: {error}"),
    })?;
    Ok(Decoded { value, headers })
}

/// Issues a GET and decodes the JSON body, classifying failures.
pub(super) async fn get_json<T: DeserializeOwned>(
    client: &Octocrab,
    operation: &str,
    uri: &str,
) -> Result<Decoded<T>, IntakeError> {
    let response = client
        ._get_with_headers(parse_uri(uri)?, None)
        .await
        .map_err(|error| map_octocrab_error(operation, &error))?;

    let status = response.status();
    let headers = response.headers().clone();
    let body = client
        .body_to_string(response)
        .await
        .map_err(|error| IntakeError::Network {
            message: format!("{operation} response read failed: {error}"),
        })?;

    decode_body(operation, status, headers, &body)
}

/// Issues a POST with a JSON payload and decodes the JSON body.
pub(super) async fn post_json<B, T>(
    client: &Octocrab,
    operation: &str,
    uri: &str,
    payload: &B,
) -> Result<Decoded<T>, IntakeError>
where
    B: Serialize + Sync + ?Sized,
    T: DeserializeOwned,
{
    let response = client
        ._post(parse_uri(uri)?, Some(payload))
        .await
        .map_err(|error| map_octocrab_error(operation, &error))?;

    let status = response.status();
    let headers = response.headers().clone();
    let body = client
        .body_to_string(response)
        .await
        .map_err(|error| IntakeError::Network {
            message: format!("{operation} response read failed: {error}"),
        })?;

    decode_body(operation, status, headers, &body)
}

/// True when a `Link` header advertises a following page.
pub(super) fn has_next_link(headers: &HeaderMap) -> bool {
    headers
        .get(http::header::LINK)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|link| link.split(',').any(|part| part.contains("rel=\"next\"")))
}
