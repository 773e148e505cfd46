//! Unverified access-token claim decoding.
//!
//! The client only reads claims it needs to address its own resources (the
//! subject id) and never makes trust decisions from them; signature checks
//! are the resource server's job.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;

use crate::error::AuthError;

/// Claims read from an access token.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub preferred_username: Option<String>,
}

/// Decode the payload segment of a JWT without verifying it.
pub fn decode_access_claims(token: &str) -> Result<AccessClaims, AuthError> {
    let mut parts = token.split('.');
    let _header = parts
        .next()
        .filter(|part| !part.is_empty())
        .ok_or_else(|| AuthError::InvalidToken("missing JWT header".to_string()))?;
    let payload = parts
        .next()
        .ok_or_else(|| AuthError::InvalidToken("missing JWT payload".to_string()))?;
    // Some issuers pad their segments despite RFC 7515.
    let decoded = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|_| AuthError::InvalidToken("invalid JWT payload encoding".to_string()))?;
    serde_json::from_slice(&decoded)
        .map_err(|err| AuthError::InvalidToken(format!("invalid JWT payload: {err}")))
}
