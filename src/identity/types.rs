//! Typed request and response bodies for identity and subject endpoints.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::defaults;

/// OIDC userinfo response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub sub: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    /// Account creation time, epoch milliseconds.
    #[serde(default, rename = "createdTimestamp")]
    pub created_timestamp: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserInfo {
    pub fn login(&self) -> Option<&str> {
        self.username
            .as_deref()
            .or(self.preferred_username.as_deref())
    }
}

/// Enrolled participant derived from userinfo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub participant_id: String,
    pub login: String,
    pub project: String,
    pub created_at: DateTime<Utc>,
}

impl Subject {
    /// Derive a subject, failing on missing login or creation time.
    ///
    /// A missing project falls back to [`defaults::DEFAULT_PROJECT`].
    pub fn from_user_info(info: &UserInfo) -> Result<Self, String> {
        let login = info
            .login()
            .ok_or_else(|| "userinfo has no username".to_string())?;
        let created_ms = info
            .created_timestamp
            .ok_or_else(|| "userinfo has no createdTimestamp".to_string())?;
        let created_at = Utc
            .timestamp_millis_opt(created_ms)
            .single()
            .ok_or_else(|| format!("createdTimestamp out of range: {created_ms}"))?;
        let project = info
            .project
            .clone()
            .filter(|project| !project.is_empty())
            .unwrap_or_else(|| defaults::DEFAULT_PROJECT.to_string());
        Ok(Self {
            participant_id: info.sub.clone(),
            login: login.to_string(),
            project,
            created_at,
        })
    }

    /// Calendar day (UTC) of enrolment; schedules are anchored to its midnight.
    pub fn enrolment_day(&self) -> NaiveDate {
        self.created_at.date_naive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRef {
    pub project_name: String,
    #[serde(default)]
    pub id: Option<i64>,
}

/// Subject record from the management portal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRecord {
    pub login: String,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub project: Option<ProjectRef>,
    #[serde(default)]
    pub sources: Vec<RegisteredSource>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Source-type payload posted when registering this device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceRegistration {
    pub source_type_producer: String,
    pub source_type_model: String,
    pub source_type_catalog_version: String,
}

impl Default for SourceRegistration {
    fn default() -> Self {
        Self {
            source_type_producer: defaults::DEFAULT_SOURCE_TYPE_PRODUCER.to_string(),
            source_type_model: defaults::DEFAULT_SOURCE_TYPE_MODEL.to_string(),
            source_type_catalog_version: defaults::DEFAULT_SOURCE_TYPE_CATALOG_VERSION
                .to_string(),
        }
    }
}

/// A source as returned after registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredSource {
    pub source_id: String,
    #[serde(default)]
    pub source_name: Option<String>,
    #[serde(default)]
    pub assigned: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Meta-token lookup result (QR-code enrolment).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaToken {
    pub refresh_token: String,
    pub base_url: String,
    #[serde(default)]
    pub privacy_policy_url: Option<String>,
}
