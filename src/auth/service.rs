use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::info;

use super::agent::UserAgent;
use super::flow::{AuthorizationFlowController, CallbackVerification};
use super::refresh::TokenRefreshGuard;
use super::store::TokenStore;
use super::token::TokenSet;
use crate::config::{defaults, load_config, AuthConfig, AuthSettings};
use crate::error::AuthError;
use crate::http::build_client;
use crate::identity::IdentityClient;
use crate::storage::{KeyValueStore, StorageKey};

/// Stored token set plus its derived expiry.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthStatus {
    pub tokens: TokenSet,
    pub expires_at: Option<DateTime<Utc>>,
    pub expired: bool,
}

/// Service facade wiring store, guard, flow and identity client together.
///
/// All I/O decisions (printing, prompting, exit codes) belong to the caller.
/// `AuthService` only returns typed results and errors.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use armt_auth::auth::AuthService;
/// use armt_auth::config::AuthSettings;
/// use armt_auth::storage::FileStore;
/// # async fn demo(agent: Arc<dyn armt_auth::auth::UserAgent>) -> armt_auth::error::Result<()> {
/// let kv = Arc::new(FileStore::new_default());
/// let service = AuthService::initialize(&AuthSettings::from_env(), kv, agent).await?;
/// let _tokens = service.ensure_fresh().await?;
/// # Ok(())
/// # }
/// ```
pub struct AuthService {
    config: Arc<AuthConfig>,
    kv: Arc<dyn KeyValueStore>,
    store: Arc<TokenStore>,
    guard: Arc<TokenRefreshGuard>,
    flow: AuthorizationFlowController,
    identity: IdentityClient,
}

impl AuthService {
    /// Resolve configuration first, then build every component from it.
    pub async fn initialize(
        settings: &AuthSettings,
        kv: Arc<dyn KeyValueStore>,
        agent: Arc<dyn UserAgent>,
    ) -> Result<Self, AuthError> {
        let config = load_config(settings, kv.as_ref()).await?;
        let client = build_client(Duration::from_secs(defaults::HTTP_TIMEOUT_SECS))?;
        Ok(Self::new(config, kv, agent, client))
    }

    /// Build from an already resolved config.
    pub fn new(
        config: AuthConfig,
        kv: Arc<dyn KeyValueStore>,
        agent: Arc<dyn UserAgent>,
        client: reqwest::Client,
    ) -> Self {
        let config = Arc::new(config);
        let realm = Arc::new(config.realm.clone());
        let store = Arc::new(TokenStore::new(kv.clone()));
        let guard = Arc::new(TokenRefreshGuard::new(
            client.clone(),
            realm.clone(),
            store.clone(),
        ));
        let flow = AuthorizationFlowController::new(client.clone(), realm, store.clone(), agent);
        let identity = IdentityClient::new(client, config.clone(), guard.clone(), store.clone());
        Self {
            config,
            kv,
            store,
            guard,
            flow,
            identity,
        }
    }

    pub fn with_callback_verification(mut self, policy: CallbackVerification) -> Self {
        self.flow = self.flow.with_callback_verification(policy);
        self
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    pub fn flow(&self) -> &AuthorizationFlowController {
        &self.flow
    }

    pub fn identity(&self) -> &IdentityClient {
        &self.identity
    }

    /// Log in (`is_login`) or self-register through the user agent.
    pub async fn keycloak_login(&self, is_login: bool) -> Result<TokenSet, AuthError> {
        self.flow.keycloak_login(is_login).await
    }

    pub async fn ensure_fresh(&self) -> Result<TokenSet, AuthError> {
        self.guard.ensure_fresh().await
    }

    /// The stored token set, if any. Never touches the network.
    pub async fn status(&self) -> Result<Option<AuthStatus>, AuthError> {
        Ok(self.store.get().await?.map(|tokens| AuthStatus {
            expires_at: tokens.expires_at_utc(),
            expired: tokens.is_expired(),
            tokens,
        }))
    }

    /// Drop the stored token set. Succeeds when already logged out.
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.store.clear().await?;
        info!("stored tokens cleared");
        Ok(())
    }

    /// Persist a new deployment endpoint.
    ///
    /// Only the next [`AuthService::initialize`] picks it up; this instance
    /// keeps its resolved config.
    pub async fn set_base_uri(&self, uri: &str) -> Result<(), AuthError> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(AuthError::Configuration(
                "base URI must not be empty".to_string(),
            ));
        }
        self.kv
            .set(StorageKey::BaseUri.as_ref(), Value::String(uri.to_string()))
            .await?;
        info!(base_uri = %uri, "base URI saved");
        Ok(())
    }
}
