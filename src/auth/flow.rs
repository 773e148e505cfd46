//! Browser-redirect authorization-code flow.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::agent::{AgentEvent, AgentOptions, UserAgent};
use super::store::TokenStore;
use super::token::{now_epoch_seconds, TokenSet};
use super::token_endpoint::request_tokens;
use super::url::{encode_uri, parse_url_params_to_object, with_query};
use crate::config::RealmConfig;
use crate::error::AuthError;

/// Per-attempt request parameters. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequestContext {
    pub state: String,
    pub nonce: String,
    pub is_login: bool,
}

impl AuthorizationRequestContext {
    pub fn new(is_login: bool) -> Self {
        Self {
            state: Uuid::new_v4().to_string(),
            nonce: Uuid::new_v4().to_string(),
            is_login,
        }
    }
}

/// How the redirect callback is checked against its originating request.
///
/// The deployed app never compared the returned `state`, so `Disabled` is the
/// default to stay compatible with existing provider setups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CallbackVerification {
    #[default]
    Disabled,
    /// Reject callbacks whose `state` is missing or differs from the request.
    EnforceState,
}

/// Build the authorization (or self-registration) URL for a fresh attempt.
///
/// # Example
/// ```
/// use armt_auth::auth::flow::build_authorization_url;
/// use armt_auth::config::RealmConfig;
///
/// let config = RealmConfig::builder()
///     .auth_server_url("https://id.example.org/")
///     .realm("mighealth")
///     .client_id("armt")
///     .redirect_uri("http://ucl-mighealth-app/callback/")
///     .build();
/// let (url, ctx) = build_authorization_url(&config, true)?;
/// assert!(url.starts_with("https://id.example.org/realms/mighealth/protocol/openid-connect/auth?client_id=armt&state="));
/// assert!(url.contains(&ctx.nonce));
/// # Ok::<(), armt_auth::error::AuthError>(())
/// ```
pub fn build_authorization_url(
    config: &RealmConfig,
    is_login: bool,
) -> Result<(String, AuthorizationRequestContext), AuthError> {
    let action = if is_login { "auth" } else { "registrations" };
    let endpoint = config.openid_endpoint(action)?;
    let ctx = AuthorizationRequestContext::new(is_login);
    let url = with_query(
        &endpoint,
        &[
            ("client_id", config.client_id.as_str()),
            ("state", ctx.state.as_str()),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("response_mode", "query"),
            ("response_type", "code"),
            ("scope", "openid"),
            ("nonce", ctx.nonce.as_str()),
        ],
    );
    Ok((url, ctx))
}

/// Whether a navigation target is the configured redirect URI.
pub fn matches_redirect(navigation_url: &str, redirect_uri: &str) -> bool {
    encode_uri(navigation_url).starts_with(redirect_uri)
}

/// The one place callback parameters are checked against the request.
pub fn verify_callback(
    ctx: &AuthorizationRequestContext,
    params: &HashMap<String, String>,
    policy: CallbackVerification,
) -> Result<(), AuthError> {
    match policy {
        CallbackVerification::Disabled => Ok(()),
        CallbackVerification::EnforceState => match params.get("state") {
            Some(state) if *state == ctx.state => Ok(()),
            Some(_) => Err(AuthError::InvalidCallback("state mismatch".to_string())),
            None => Err(AuthError::InvalidCallback("missing state".to_string())),
        },
    }
}

enum CallbackOutcome {
    Matched(String),
    Cancelled,
}

/// Drives login/registration end to end and writes the result to the store.
pub struct AuthorizationFlowController {
    client: reqwest::Client,
    config: Arc<RealmConfig>,
    store: Arc<TokenStore>,
    agent: Arc<dyn UserAgent>,
    agent_options: AgentOptions,
    verification: CallbackVerification,
}

impl AuthorizationFlowController {
    pub fn new(
        client: reqwest::Client,
        config: Arc<RealmConfig>,
        store: Arc<TokenStore>,
        agent: Arc<dyn UserAgent>,
    ) -> Self {
        Self {
            client,
            config,
            store,
            agent,
            agent_options: AgentOptions::default(),
            verification: CallbackVerification::default(),
        }
    }

    pub fn with_agent_options(mut self, options: AgentOptions) -> Self {
        self.agent_options = options;
        self
    }

    pub fn with_callback_verification(mut self, policy: CallbackVerification) -> Self {
        self.verification = policy;
        self
    }

    pub fn config(&self) -> &RealmConfig {
        &self.config
    }

    pub fn build_authorization_url(
        &self,
        is_login: bool,
    ) -> Result<(String, AuthorizationRequestContext), AuthError> {
        build_authorization_url(&self.config, is_login)
    }

    /// Open the agent on `url` and wait for it to reach the redirect URI.
    ///
    /// Resolves with the authorization code, or [`AuthError::AuthCancelled`]
    /// if the agent is dismissed first. The event subscription is released
    /// exactly once either way.
    pub async fn launch_and_await_callback(
        &self,
        url: &str,
        ctx: &AuthorizationRequestContext,
    ) -> Result<String, AuthError> {
        let mut session = self.agent.open(url, &self.agent_options).await?;
        let mut events = match session.subscribe() {
            Ok(events) => events,
            Err(err) => {
                session.close().await;
                return Err(err);
            }
        };

        let outcome = loop {
            match events.recv().await {
                Some(AgentEvent::NavigationStarted(target)) => {
                    if matches_redirect(&target, &self.config.redirect_uri) {
                        break CallbackOutcome::Matched(target);
                    }
                    debug!("navigation did not reach redirect URI");
                }
                Some(AgentEvent::Closed) | None => break CallbackOutcome::Cancelled,
            }
        };
        session.unsubscribe();
        drop(events);

        match outcome {
            CallbackOutcome::Matched(callback) => {
                session.close().await;
                let mut params = parse_url_params_to_object(&callback);
                verify_callback(ctx, &params, self.verification)?;
                match params.remove("code").filter(|code| !code.is_empty()) {
                    Some(code) => Ok(code),
                    None => {
                        let reason = params
                            .remove("error")
                            .unwrap_or_else(|| "missing authorization code".to_string());
                        warn!(reason = %reason, "callback carried no authorization code");
                        Err(AuthError::InvalidCallback(reason))
                    }
                }
            }
            CallbackOutcome::Cancelled => {
                info!("authorization cancelled before redirect");
                Err(AuthError::AuthCancelled)
            }
        }
    }

    /// Exchange `code` at the token endpoint and store the resulting set.
    ///
    /// The store is only written on success.
    pub async fn exchange_code_for_tokens(&self, code: &str) -> Result<TokenSet, AuthError> {
        let config = &self.config;
        let url = config.token_url()?;
        let basic = config
            .confidential_secret()
            .map(|secret| format!("{}:{secret}", config.client_id));
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", config.client_id.as_str()),
            ("redirect_uri", config.redirect_uri.as_str()),
        ];

        let response = request_tokens(&self.client, &url, &form, basic.as_deref())
            .await
            .map_err(|err| {
                warn!(status = ?err.status(), "authorization code exchange failed");
                AuthError::AuthExchangeFailed(err.to_string())
            })?;
        let tokens = TokenSet::from_response(response, now_epoch_seconds());
        self.store.set(&tokens).await?;
        info!(expires_in = tokens.expires_in, "authorization code exchanged");
        Ok(tokens)
    }

    /// Build the URL, wait for the callback, exchange the code.
    ///
    /// Returns the set as read back from the store.
    pub async fn keycloak_login(&self, is_login: bool) -> Result<TokenSet, AuthError> {
        let (url, ctx) = self.build_authorization_url(is_login)?;
        debug!(is_login, "starting authorization flow");
        let code = self.launch_and_await_callback(&url, &ctx).await?;
        self.exchange_code_for_tokens(&code).await?;
        self.store.get().await?.ok_or(AuthError::NotAuthenticated)
    }
}
