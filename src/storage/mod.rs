//! Key-value persistence consumed by the auth core.
//!
//! The app's generic storage layer is only ever used through `get`/`set`, so
//! that is all [`KeyValueStore`] asks for. Writing `null` erases a key.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use strum::{AsRefStr, Display, EnumString};

use crate::error::AuthError;

/// Logical keys owned by the auth core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum StorageKey {
    /// Server base URI chosen at enrolment; overrides the built-in endpoint.
    BaseUri,
    /// Serialized [`crate::auth::TokenSet`].
    OauthTokens,
}

/// Async key-value collaborator.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, AuthError>;
    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), AuthError>;
}
