//! Authenticated identity and subject-management calls.
//!
//! Every bearer call obtains its token through the shared
//! [`TokenRefreshGuard`], so concurrent calls never race a refresh.

pub mod types;

pub use types::{
    MetaToken, ProjectRef, RegisteredSource, SourceRegistration, Subject, SubjectRecord, UserInfo,
};

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::auth::claims::decode_access_claims;
use crate::auth::store::TokenStore;
use crate::auth::token::{now_epoch_seconds, TokenSet};
use crate::auth::token_endpoint::{request_tokens, TokenEndpointError};
use crate::auth::TokenRefreshGuard;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::http::{bearer_headers, decode_body, read_json, read_success_body};

/// Result of redeeming a meta token.
#[derive(Debug, Clone, PartialEq)]
pub struct Enrolment {
    pub meta_token: MetaToken,
    pub tokens: TokenSet,
}

pub struct IdentityClient {
    client: reqwest::Client,
    config: Arc<AuthConfig>,
    guard: Arc<TokenRefreshGuard>,
    store: Arc<TokenStore>,
}

impl IdentityClient {
    pub fn new(
        client: reqwest::Client,
        config: Arc<AuthConfig>,
        guard: Arc<TokenRefreshGuard>,
        store: Arc<TokenStore>,
    ) -> Self {
        Self {
            client,
            config,
            guard,
            store,
        }
    }

    /// Fresh access token, with every guard failure reported as
    /// [`AuthError::Unauthenticated`].
    async fn access_token(&self) -> Result<String, AuthError> {
        match self.guard.ensure_fresh().await {
            Ok(tokens) => Ok(tokens.access_token),
            Err(err) => {
                warn!(error = %err, "no usable access token for identity call");
                Err(AuthError::Unauthenticated(err.to_string()))
            }
        }
    }

    /// GET the userinfo endpoint and return the 2xx status and raw body.
    async fn user_info_body(&self) -> Result<(u16, String), AuthError> {
        let token = self.access_token().await?;
        let url = self.config.realm.userinfo_url()?;
        debug!(url = %url, "fetching userinfo");
        let resp = self
            .client
            .get(&url)
            .headers(bearer_headers(&token)?)
            .send()
            .await?;
        read_success_body(resp).await
    }

    /// GET the OIDC userinfo endpoint.
    pub async fn fetch_user_info(&self) -> Result<UserInfo, AuthError> {
        let (status, body) = self.user_info_body().await?;
        decode_body(status, body)
    }

    /// Userinfo reduced to the enrolled [`Subject`].
    ///
    /// A userinfo body lacking the fields a subject needs is reported as
    /// [`AuthError::Upstream`] carrying the status and body it came with.
    pub async fn retrieve_subject(&self) -> Result<Subject, AuthError> {
        let (status, body) = self.user_info_body().await?;
        let subject = serde_json::from_str::<UserInfo>(&body)
            .map_err(|err| err.to_string())
            .and_then(|info| Subject::from_user_info(&info));
        match subject {
            Ok(subject) => Ok(subject),
            Err(reason) => {
                warn!(status, reason = %reason, "userinfo does not describe a subject");
                Err(AuthError::upstream(status, body))
            }
        }
    }

    /// GET the management-portal record for the token's subject.
    pub async fn fetch_subject_information(&self) -> Result<SubjectRecord, AuthError> {
        let token = self.access_token().await?;
        let claims = decode_access_claims(&token)?;
        let url = self.config.api.subject_url(&claims.sub);
        debug!(url = %url, "fetching subject record");
        let resp = self
            .client
            .get(&url)
            .headers(bearer_headers(&token)?)
            .send()
            .await?;
        read_json(resp).await
    }

    /// Register this app as a data source of the token's subject.
    pub async fn register_as_data_source(&self) -> Result<RegisteredSource, AuthError> {
        let token = self.access_token().await?;
        let claims = decode_access_claims(&token)?;
        let url = self.config.api.subject_sources_url(&claims.sub);
        let resp = self
            .client
            .post(&url)
            .headers(bearer_headers(&token)?)
            .json(&self.config.api.source_registration)
            .send()
            .await?;
        let source: RegisteredSource = read_json(resp).await?;
        info!(source_id = %source.source_id, "registered as data source");
        Ok(source)
    }

    /// Redeem a registration token for a token set and store it.
    ///
    /// Uses the shared producer credentials rather than the realm client,
    /// and does not consult the refresh guard.
    pub async fn register_client_token(
        &self,
        registration_token: &str,
    ) -> Result<TokenSet, AuthError> {
        let url = self.config.realm.token_url()?;
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", registration_token),
        ];
        let response = request_tokens(
            &self.client,
            &url,
            &form,
            Some(self.config.api.source_credentials.as_str()),
        )
        .await
        .map_err(|err| {
            warn!(status = ?err.status(), "registration token rejected");
            match err {
                TokenEndpointError::Rejected { status, body } => AuthError::upstream(status, body),
                TokenEndpointError::Decode { status, reason } => AuthError::upstream(status, reason),
                TokenEndpointError::Network(reason) => AuthError::Network(reason),
                TokenEndpointError::Credentials(reason) => AuthError::Configuration(reason),
            }
        })?;
        let tokens = TokenSet::from_response(response, now_epoch_seconds());
        self.store.set(&tokens).await?;
        info!(expires_in = tokens.expires_in, "registration token redeemed");
        Ok(tokens)
    }

    /// `{base_url}/{meta_token_path}/{token}`.
    pub fn meta_token_url(&self, token: &str) -> String {
        self.config.api.meta_token_url(token)
    }

    /// Look up a meta token. Unauthenticated.
    pub async fn fetch_meta_token(&self, url: &str) -> Result<MetaToken, AuthError> {
        debug!("fetching meta token");
        let resp = self.client.get(url).send().await?;
        read_json(resp).await
    }

    /// Fetch the meta token behind `url` and redeem its refresh token.
    pub async fn enrol_with_meta_token(&self, url: &str) -> Result<Enrolment, AuthError> {
        let meta_token = self.fetch_meta_token(url).await?;
        let tokens = self.register_client_token(&meta_token.refresh_token).await?;
        Ok(Enrolment { meta_token, tokens })
    }
}
