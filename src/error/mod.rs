//! Error types for armt-auth.

use thiserror::Error;

/// Authentication and token-lifecycle errors.
///
/// `Clone` so a single refresh outcome can be handed to every caller that was
/// waiting on it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// The user dismissed the user agent before it reached the redirect URI.
    #[error("Authorization cancelled by user")]
    AuthCancelled,

    /// The authorization code could not be exchanged for tokens.
    #[error("Authorization code exchange failed: {0}")]
    AuthExchangeFailed(String),

    /// No token set is stored.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The refresh-token grant was rejected or unreachable.
    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    /// An authenticated call could not obtain a usable access token.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Non-2xx (or undecodable) response from an identity or subject endpoint.
    #[error("Upstream error (status {status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid callback: {0}")]
    InvalidCallback(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("User agent error: {0}")]
    UserAgent(String),
}

impl AuthError {
    pub fn upstream(status: u16, body: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            body: body.into(),
        }
    }

    /// Whether the caller should send the user through a fresh login.
    ///
    /// The stored token set is never cleared on refresh failure, so this is
    /// the signal a UI uses to offer "retry" versus "log in again".
    pub fn requires_login(&self) -> bool {
        match self {
            Self::NotAuthenticated | Self::TokenRefreshFailed(_) | Self::Unauthenticated(_) => {
                true
            }
            Self::Upstream { status, .. } => *status == 401,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}

impl From<std::io::Error> for AuthError {
    fn from(error: std::io::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::de::Error> for AuthError {
    fn from(error: toml::de::Error) -> Self {
        Self::Configuration(error.to_string())
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, AuthError>;
