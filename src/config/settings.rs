//! User-facing settings: TOML file plus `ARMT_*` environment overrides.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::defaults;
use crate::error::AuthError;
use crate::identity::SourceRegistration;

/// Unresolved settings; see [`super::load_config`] for the final layer.
///
/// # Example
/// ```no_run
/// use armt_auth::config::AuthSettings;
///
/// let settings = AuthSettings::load_from_path("armt.toml")?.apply_env();
/// # Ok::<(), armt_auth::error::AuthError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Server root; the stored `BASE_URI` takes precedence when present.
    pub endpoint: Option<String>,
    pub keycloak_path: String,
    pub realm: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub subjects_path: String,
    pub meta_token_path: String,
    pub source_credentials: String,
    pub source_registration: SourceRegistration,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            keycloak_path: defaults::DEFAULT_KEYCLOAK_PATH.to_string(),
            realm: defaults::DEFAULT_REALM.to_string(),
            client_id: defaults::DEFAULT_CLIENT_ID.to_string(),
            client_secret: None,
            redirect_uri: defaults::DEFAULT_REDIRECT_URI.to_string(),
            subjects_path: defaults::DEFAULT_SUBJECTS_PATH.to_string(),
            meta_token_path: defaults::DEFAULT_META_TOKEN_PATH.to_string(),
            source_credentials: defaults::DEFAULT_SOURCE_CREDENTIALS.to_string(),
            source_registration: SourceRegistration::default(),
        }
    }
}

const ENV_MAPPINGS: [&str; 7] = [
    "ARMT_ENDPOINT",
    "ARMT_KEYCLOAK_PATH",
    "ARMT_REALM",
    "ARMT_CLIENT_ID",
    "ARMT_CLIENT_SECRET",
    "ARMT_REDIRECT_URI",
    "ARMT_SUBJECTS_PATH",
];

impl AuthSettings {
    /// Defaults overlaid with environment variables (and `.env`, if present).
    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    /// Overlay `ARMT_*` variables onto these settings.
    pub fn apply_env(mut self) -> Self {
        let _ = dotenvy::dotenv(); // .env is optional
        for var in ENV_MAPPINGS {
            let Ok(value) = std::env::var(var) else {
                continue;
            };
            match var {
                "ARMT_ENDPOINT" => self.endpoint = Some(value),
                "ARMT_KEYCLOAK_PATH" => self.keycloak_path = value,
                "ARMT_REALM" => self.realm = value,
                "ARMT_CLIENT_ID" => self.client_id = value,
                "ARMT_CLIENT_SECRET" => self.client_secret = Some(value),
                "ARMT_REDIRECT_URI" => self.redirect_uri = value,
                "ARMT_SUBJECTS_PATH" => self.subjects_path = value,
                _ => {}
            }
        }
        self
    }

    /// Parse settings from TOML; omitted keys keep their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, AuthError> {
        Ok(toml::from_str(raw)?)
    }

    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, AuthError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(raw) => Self::from_toml_str(&raw),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(AuthError::Configuration(format!(
                "failed to read {}: {err}",
                path.display()
            ))),
        }
    }

    /// `~/.armt/config.toml`.
    pub fn default_path() -> PathBuf {
        directories::UserDirs::new()
            .map(|dirs| dirs.home_dir().join(".armt"))
            .unwrap_or_else(|| PathBuf::from(".armt"))
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn toml_overrides_only_given_keys() {
        let settings = AuthSettings::from_toml_str(
            r#"
            endpoint = "https://id.example.org/"
            client_secret = "shh"

            [source_registration]
            sourceTypeModel = "custom-app"
            "#,
        )
        .unwrap();
        assert_eq!(settings.endpoint.as_deref(), Some("https://id.example.org/"));
        assert_eq!(settings.client_secret.as_deref(), Some("shh"));
        assert_eq!(settings.realm, "mighealth");
        assert_eq!(settings.client_id, "armt");
        assert_eq!(settings.source_registration.source_type_model, "custom-app");
        assert_eq!(settings.source_registration.source_type_producer, "RADAR");
    }

    #[test]
    fn malformed_toml_is_a_configuration_error() {
        let result = AuthSettings::from_toml_str("realm = [");
        assert!(matches!(result, Err(AuthError::Configuration(_))));
    }

    #[test]
    fn missing_file_returns_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = AuthSettings::load_from_path(dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings, AuthSettings::default());
    }

    #[test]
    fn load_from_path_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("armt.toml");
        fs::write(&path, "realm = \"other\"\n").unwrap();
        let settings = AuthSettings::load_from_path(&path).unwrap();
        assert_eq!(settings.realm, "other");
    }
}
