//! OAuth token set.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::config::defaults::ISSUED_AT_SKEW_SECS;

/// Token set held by [`super::TokenStore`].
///
/// All four fields are always present; a response missing any of them fails
/// to decode and is never stored. `issued_at` is stamped locally (receipt
/// time minus [`ISSUED_AT_SKEW_SECS`]) and persisted as `iat`.
///
/// # Example
/// ```
/// use armt_auth::auth::TokenSet;
///
/// let tokens = TokenSet {
///     access_token: "access".to_string(),
///     refresh_token: "refresh".to_string(),
///     expires_in: 300,
///     issued_at: 1_700_000_000.0,
/// };
/// assert!(!tokens.is_expired_at(1_700_000_299.9));
/// assert!(tokens.is_expired_at(1_700_000_300.0));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    #[serde(rename = "iat")]
    pub issued_at: f64,
}

impl TokenSet {
    /// Build from a token-endpoint response received at `now`.
    pub fn from_response(response: TokenResponse, now: f64) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_in: response.expires_in,
            issued_at: now - ISSUED_AT_SKEW_SECS,
        }
    }

    /// Epoch seconds at which the access token stops being usable.
    pub fn expires_at(&self) -> f64 {
        self.issued_at + self.expires_in as f64
    }

    /// Valid for `now < issued_at + expires_in`.
    pub fn is_expired_at(&self, now: f64) -> bool {
        now >= self.expires_at()
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_epoch_seconds())
    }

    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        let millis = (self.expires_at() * 1000.0) as i64;
        Utc.timestamp_millis_opt(millis).single()
    }
}

/// Token endpoint success body. Extra fields (`id_token`, `scope`, ...) are
/// ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

/// Current time as fractional epoch seconds.
pub fn now_epoch_seconds() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn token(issued_at: f64, expires_in: u64) -> TokenSet {
        TokenSet {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_in,
            issued_at,
        }
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let t = 1_000.0;
        let tokens = token(t, 300);
        for now in [t, t + 1.0, t + 299.0, t + 299.999] {
            assert!(!tokens.is_expired_at(now), "expected valid at {now}");
        }
        for now in [t + 300.0, t + 300.001, t + 10_000.0] {
            assert!(tokens.is_expired_at(now), "expected expired at {now}");
        }
    }

    #[test]
    fn from_response_stamps_skewed_issue_time() {
        let response: TokenResponse = serde_json::from_value(json!({
            "access_token": "acc",
            "refresh_token": "ref",
            "expires_in": 300,
            "token_type": "Bearer",
            "id_token": "ignored"
        }))
        .unwrap();
        let tokens = TokenSet::from_response(response, 5_000.0);
        assert_eq!(tokens.issued_at, 4_990.0);
        assert_eq!(tokens.expires_at(), 5_290.0);
    }

    #[test]
    fn partial_response_does_not_decode() {
        let result = serde_json::from_value::<TokenResponse>(json!({
            "access_token": "acc",
            "expires_in": 300
        }));
        assert!(result.is_err());
    }

    #[test]
    fn serializes_issue_time_as_iat() {
        let value = serde_json::to_value(token(12.5, 60)).unwrap();
        assert_eq!(value["iat"], json!(12.5));
        assert!(value.get("issued_at").is_none());
    }
}
