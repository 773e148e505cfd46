//! Built-in connection defaults for the aRMT deployment.

pub const DEFAULT_ENDPOINT: &str = "https://radar-cns-platform.rosalind.kcl.ac.uk/";
pub const DEFAULT_KEYCLOAK_PATH: &str = "auth/";
pub const DEFAULT_REALM: &str = "mighealth";
pub const DEFAULT_CLIENT_ID: &str = "armt";
pub const DEFAULT_REDIRECT_URI: &str = "http://ucl-mighealth-app/callback/";
pub const DEFAULT_SUBJECTS_PATH: &str = "managementportal/api/subjects/";
pub const DEFAULT_META_TOKEN_PATH: &str = "managementportal/api/meta-token/";

/// Shared `producer:secret` pair used to redeem registration tokens.
///
/// Baked into every install rather than issued per device; callers that can
/// provision a per-device secret should override it in settings.
pub const DEFAULT_SOURCE_CREDENTIALS: &str = "aRMT:secret";

pub const DEFAULT_SOURCE_TYPE_PRODUCER: &str = "RADAR";
pub const DEFAULT_SOURCE_TYPE_MODEL: &str = "aRMT-App";
pub const DEFAULT_SOURCE_TYPE_CATALOG_VERSION: &str = "1.4.3";

/// Fallback project name when userinfo carries none.
pub const DEFAULT_PROJECT: &str = "STAGING_PROJECT";

/// Seconds subtracted from local receipt time when stamping `issued_at`.
pub const ISSUED_AT_SKEW_SECS: f64 = 10.0;

/// Per-request timeout for every HTTP call.
pub const HTTP_TIMEOUT_SECS: u64 = 30;
