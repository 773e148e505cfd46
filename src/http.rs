//! Shared HTTP client construction, auth headers, and response checks.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;

use crate::error::AuthError;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Build the client used by every component of one service.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, AuthError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .pool_max_idle_per_host(4)
        .build()
        .map_err(|err| AuthError::Configuration(format!("failed to build HTTP client: {err}")))
}

/// Headers for a Bearer-authenticated JSON call.
///
/// A token that cannot be sent as a header value is [`AuthError::InvalidToken`].
pub fn bearer_headers(access_token: &str) -> Result<HeaderMap, AuthError> {
    let mut auth = HeaderValue::from_str(&format!("Bearer {access_token}")).map_err(|err| {
        AuthError::InvalidToken(format!("access token is not a valid header: {err}"))
    })?;
    auth.set_sensitive(true);
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    headers.insert(ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE));
    headers.insert(AUTHORIZATION, auth);
    Ok(headers)
}

/// `Basic base64(credentials)` where `credentials` is `user:secret`.
pub fn basic_auth_value(credentials: &str) -> Result<HeaderValue, AuthError> {
    let mut value = HeaderValue::from_str(&format!("Basic {}", STANDARD.encode(credentials)))
        .map_err(|err| AuthError::Configuration(format!("invalid client credentials: {err}")))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Read the body of a 2xx response; anything else is [`AuthError::Upstream`].
pub async fn read_success_body(resp: reqwest::Response) -> Result<(u16, String), AuthError> {
    let status = resp.status().as_u16();
    let success = resp.status().is_success();
    let body = resp.text().await?;
    if !success {
        tracing::warn!(status, "upstream call failed");
        return Err(AuthError::upstream(status, body));
    }
    Ok((status, body))
}

/// Read the body and map non-2xx statuses to [`AuthError::Upstream`].
///
/// A 2xx body that does not decode into `T` is also reported as upstream
/// failure with its real status, never as a partially filled value.
pub async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, AuthError> {
    let (status, body) = read_success_body(resp).await?;
    decode_body(status, body)
}

/// Decode an already read 2xx body, as [`read_json`] does.
pub fn decode_body<T: DeserializeOwned>(status: u16, body: String) -> Result<T, AuthError> {
    serde_json::from_str(&body).map_err(|err| {
        tracing::warn!(status, error = %err, "upstream response did not match expected shape");
        AuthError::upstream(status, body)
    })
}
