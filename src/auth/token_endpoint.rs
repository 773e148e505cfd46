//! Form-encoded POSTs to the realm token endpoint.

use std::fmt;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

use super::token::TokenResponse;
use crate::http::{basic_auth_value, FORM_CONTENT_TYPE};

/// Why a token request produced no token set. Callers fold this into the
/// error variant for their grant.
#[derive(Debug)]
pub(crate) enum TokenEndpointError {
    Rejected { status: u16, body: String },
    Network(String),
    Decode { status: u16, reason: String },
    Credentials(String),
}

impl fmt::Display for TokenEndpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { status, body } => write!(f, "status {status}: {body}"),
            Self::Network(reason) => write!(f, "network: {reason}"),
            Self::Decode { status, reason } => {
                write!(f, "status {status}: incomplete token response: {reason}")
            }
            Self::Credentials(reason) => write!(f, "client credentials: {reason}"),
        }
    }
}

impl TokenEndpointError {
    pub(crate) fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } | Self::Decode { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// POST `form` to `url`, optionally with `Basic {credentials}` client auth.
pub(crate) async fn request_tokens(
    client: &reqwest::Client,
    url: &str,
    form: &[(&str, &str)],
    basic_credentials: Option<&str>,
) -> Result<TokenResponse, TokenEndpointError> {
    let mut request = client
        .post(url)
        .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
        .form(form);
    if let Some(credentials) = basic_credentials {
        let value = basic_auth_value(credentials)
            .map_err(|err| TokenEndpointError::Credentials(err.to_string()))?;
        request = request.header(AUTHORIZATION, value);
    }

    let resp = request
        .send()
        .await
        .map_err(|err| TokenEndpointError::Network(err.to_string()))?;
    let status = resp.status().as_u16();
    let success = resp.status().is_success();
    let body = resp
        .text()
        .await
        .map_err(|err| TokenEndpointError::Network(err.to_string()))?;
    if !success {
        return Err(TokenEndpointError::Rejected { status, body });
    }
    serde_json::from_str(&body).map_err(|err| TokenEndpointError::Decode {
        status,
        reason: err.to_string(),
    })
}
