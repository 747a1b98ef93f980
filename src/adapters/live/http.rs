//! Shared helpers for the blocking HTTP adapters.

use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;

use crate::error::RemoteError;

/// User agent sent with every request (GitHub rejects requests without one).
pub(super) const USER_AGENT: &str = concat!("almsync/", env!("CARGO_PKG_VERSION"));

/// Longest response excerpt carried in an error message.
const MAX_ERROR_BODY: usize = 300;

/// Builds the blocking client shared by one adapter.
pub(super) fn client() -> Client {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Joins a base URL and a path without doubling the slash.
pub(super) fn join(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Turns a non-success response into a [`RemoteError`] carrying its status.
pub(super) fn check(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    let excerpt: String = body.chars().take(MAX_ERROR_BODY).collect();
    let reason = status.canonical_reason().unwrap_or("request failed");
    let message = if excerpt.trim().is_empty() {
        reason.to_string()
    } else {
        format!("{reason}: {}", excerpt.trim())
    };
    Err(RemoteError::with_code(status.as_u16(), message))
}

/// Checks the status and decodes a JSON body.
pub(super) fn json<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
    let response = check(response)?;
    let text = response.text()?;
    serde_json::from_str(&text)
        .map_err(|e| RemoteError::new(format!("failed to parse response: {e}")))
}
