//! Configuration (layered: defaults > TOML file > env > stored base URI).
//!
//! Settings are resolved into an [`AuthConfig`] exactly once by
//! [`load_config`]; nothing downstream sees a partially built config.

pub mod defaults;
pub mod settings;

pub use settings::AuthSettings;

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::auth::url::encode_component;
use crate::error::AuthError;
use crate::identity::SourceRegistration;
use crate::storage::{KeyValueStore, StorageKey};

/// Identity-provider connection parameters.
///
/// # Example
/// ```
/// use armt_auth::config::{realm_url, RealmConfig};
///
/// let config = RealmConfig::builder()
///     .auth_server_url("https://id.example.org")
///     .realm("mighealth")
///     .client_id("armt")
///     .redirect_uri("http://ucl-mighealth-app/callback/")
///     .build();
/// assert_eq!(
///     realm_url(&config).as_deref(),
///     Some("https://id.example.org/realms/mighealth")
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(on(String, into))]
pub struct RealmConfig {
    pub auth_server_url: String,
    pub realm: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
}

impl RealmConfig {
    /// Client secret, if one is configured and non-empty.
    pub fn confidential_secret(&self) -> Option<&str> {
        self.client_secret
            .as_deref()
            .filter(|secret| !secret.is_empty())
    }

    /// Realm URL, or a configuration error when it cannot be derived.
    pub fn require_realm_url(&self) -> Result<String, AuthError> {
        realm_url(self).ok_or_else(|| {
            AuthError::Configuration("auth server URL is not configured".to_string())
        })
    }

    /// `{realm}/protocol/openid-connect/{endpoint}`.
    pub fn openid_endpoint(&self, endpoint: &str) -> Result<String, AuthError> {
        Ok(format!(
            "{}/protocol/openid-connect/{endpoint}",
            self.require_realm_url()?
        ))
    }

    pub fn token_url(&self) -> Result<String, AuthError> {
        self.openid_endpoint("token")
    }

    pub fn userinfo_url(&self) -> Result<String, AuthError> {
        self.openid_endpoint("userinfo")
    }
}

/// Derive `{auth_server_url}/realms/{realm}` with exactly one separator.
///
/// Returns `None` when no auth server URL is set; callers must treat that
/// as a precondition failure before starting any flow.
pub fn realm_url(config: &RealmConfig) -> Option<String> {
    let base = config.auth_server_url.trim();
    if base.is_empty() {
        return None;
    }
    Some(join_url(
        base,
        &format!("realms/{}", encode_component(&config.realm)),
    ))
}

/// Join `base` and `path` with exactly one `/` between them.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Management-portal side of the deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub subjects_path: String,
    pub meta_token_path: String,
    /// `producer:secret` for registration-token redemption.
    pub source_credentials: String,
    pub source_registration: SourceRegistration,
}

impl ApiConfig {
    /// `{base}/{subjects_path}/{sub}`.
    pub fn subject_url(&self, sub: &str) -> String {
        let subjects = join_url(&self.base_url, &self.subjects_path);
        join_url(&subjects, &encode_component(sub))
    }

    pub fn subject_sources_url(&self, sub: &str) -> String {
        join_url(&self.subject_url(sub), "sources")
    }

    /// `{base}/{meta_token_path}/{token}`.
    pub fn meta_token_url(&self, token: &str) -> String {
        let meta = join_url(&self.base_url, &self.meta_token_path);
        join_url(&meta, &encode_component(token))
    }
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub realm: RealmConfig,
    pub api: ApiConfig,
}

/// Resolve settings plus any stored base URI into an [`AuthConfig`].
///
/// A `BASE_URI` saved in the key-value store wins over the configured
/// endpoint, which in turn wins over the built-in default.
pub async fn load_config(
    settings: &AuthSettings,
    store: &dyn KeyValueStore,
) -> Result<AuthConfig, AuthError> {
    let stored = match store.get(StorageKey::BaseUri.as_ref()).await? {
        Some(serde_json::Value::String(uri)) if !uri.trim().is_empty() => Some(uri),
        Some(serde_json::Value::Null) | None => None,
        Some(serde_json::Value::String(_)) => None,
        Some(other) => {
            return Err(AuthError::Configuration(format!(
                "stored base URI is not a string: {other}"
            )));
        }
    };
    let endpoint = stored
        .or_else(|| settings.endpoint.clone())
        .unwrap_or_else(|| defaults::DEFAULT_ENDPOINT.to_string());
    let base_url = join_url(&endpoint, &settings.keycloak_path);
    tracing::debug!(base_url = %base_url, realm = %settings.realm, "resolved auth configuration");

    let realm = RealmConfig {
        auth_server_url: base_url.clone(),
        realm: settings.realm.clone(),
        client_id: settings.client_id.clone(),
        client_secret: settings.client_secret.clone(),
        redirect_uri: settings.redirect_uri.clone(),
    };
    if realm_url(&realm).is_none() {
        return Err(AuthError::Configuration(
            "auth server URL is not configured".to_string(),
        ));
    }

    Ok(AuthConfig {
        realm,
        api: ApiConfig {
            base_url,
            subjects_path: settings.subjects_path.clone(),
            meta_token_path: settings.meta_token_path.clone(),
            source_credentials: settings.source_credentials.clone(),
            source_registration: settings.source_registration.clone(),
        },
    })
}
